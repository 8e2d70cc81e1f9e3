//! Command tree assembly.
//!
//! Each command file contributes one descriptor at the position given by its
//! path below the command root. Directories become placeholder nodes until an
//! own-index file (`index.js`) fills them in.

use std::path::Path;

use crate::types::{CommandDescriptor, CommandTree, OWN_INDEX_STEM};

impl CommandTree {
    /// Merge `descriptor` at `segments`, consuming the tree.
    pub fn merge(self, segments: &[String], descriptor: CommandDescriptor) -> Self {
        CommandTree {
            root: merge(self.root, segments, descriptor),
        }
    }
}

/// Merge `descriptor` into `node` at the position named by `segments`.
///
/// Every segment but the last names a directory. The last names the file:
/// an own-index file overlays `node` itself, any other file becomes a child
/// named after the descriptor.
pub fn merge(
    mut node: CommandDescriptor,
    segments: &[String],
    descriptor: CommandDescriptor,
) -> CommandDescriptor {
    let Some((current, rest)) = segments.split_first() else {
        return overlay(node, descriptor);
    };

    if !rest.is_empty() {
        match node
            .subcommands
            .iter()
            .position(|child| matches_directory(child, current))
        {
            Some(idx) => {
                let child = std::mem::take(&mut node.subcommands[idx]);
                node.subcommands[idx] = merge(child, rest, descriptor);
            }
            None => {
                let child = CommandDescriptor::placeholder(current.as_str());
                node.subcommands.push(merge(child, rest, descriptor));
            }
        }
        return node;
    }

    if is_own_index(current) {
        return overlay(node, descriptor);
    }

    match node
        .subcommands
        .iter()
        .position(|child| child.name == descriptor.name)
    {
        Some(idx) if node.subcommands[idx].is_placeholder() => {
            let existing = std::mem::take(&mut node.subcommands[idx]);
            node.subcommands[idx] = overlay(existing, descriptor);
        }
        Some(idx) => {
            let existing = node.subcommands[idx].clone();
            node.subcommands.push(overlay(existing, descriptor));
        }
        None => {
            let fresh = CommandDescriptor::placeholder(descriptor.name.as_str());
            node.subcommands.push(overlay(fresh, descriptor));
        }
    }
    node
}

fn matches_directory(child: &CommandDescriptor, segment: &str) -> bool {
    child.name == segment || child.index_directory() == Some(segment)
}

pub fn is_own_index(segment: &str) -> bool {
    Path::new(segment)
        .file_stem()
        .and_then(|stem| stem.to_str())
        == Some(OWN_INDEX_STEM)
        && Path::new(segment).extension().is_some()
}

/// Descriptor fields win where present; subcommands are concatenated.
fn overlay(mut node: CommandDescriptor, descriptor: CommandDescriptor) -> CommandDescriptor {
    let CommandDescriptor {
        name,
        description,
        alias,
        file_path,
        options,
        subcommands,
        requires_run_time,
        before_run,
        validate,
        show_help_when_no_args,
        deps,
    } = descriptor;

    node.name = name;
    node.description = description.or(node.description);
    node.alias = alias.or(node.alias);
    node.file_path = file_path.or(node.file_path);
    node.options = options.or(node.options);
    node.subcommands.extend(subcommands);
    node.requires_run_time = requires_run_time.or(node.requires_run_time);
    node.before_run = before_run.or(node.before_run);
    node.validate = validate.or(node.validate);
    node.show_help_when_no_args = show_help_when_no_args.or(node.show_help_when_no_args);
    node.deps = deps.or(node.deps);
    node
}
