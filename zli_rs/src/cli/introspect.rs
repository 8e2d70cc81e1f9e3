//! Read-only views of the discovered tree: the name map and declared deps.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::dispatch::reserved_long_names;
use crate::naming::{NamingError, argument_key, option_flag_string};
use crate::types::CommandTree;

/// `parent > name` for every command, followed by one `---->` line per
/// option with its flags and the key its value is passed under.
pub fn arg_name_map(tree: &CommandTree, fallback_name: &str) -> Result<String, NamingError> {
    let reserved: HashSet<&str> = reserved_long_names().collect();
    let mut out = String::new();
    for (trail, node) in tree.walk() {
        let name = match (trail.is_empty(), node.name.is_empty()) {
            (true, true) => fallback_name,
            (_, true) => continue,
            _ => node.name.as_str(),
        };
        match trail.last() {
            Some(parent) if !parent.is_empty() => out.push_str(&format!("{parent} > {name}\n")),
            Some(_) => out.push_str(&format!("{fallback_name} > {name}\n")),
            None => out.push_str(&format!("> {name}\n")),
        }

        let mut used = HashSet::from(["h".to_string()]);
        for option in node.options() {
            let long = option.name.long();
            if reserved.contains(long) {
                continue;
            }
            let flags = option_flag_string(option, &mut used)?;
            out.push_str(&format!("----> {flags} => {}\n", argument_key(long)));
        }
    }
    Ok(out)
}

/// One line per command file: its path relative to `root` and its `DEPS`.
pub fn deps_listing(root: &Path, entries: &[(PathBuf, Option<Vec<String>>)]) -> String {
    let mut out = String::new();
    for (file, deps) in entries {
        let shown = file.strip_prefix(root).unwrap_or(file);
        let deps = match deps {
            Some(deps) if !deps.is_empty() => deps.join(", "),
            Some(_) => "(empty)".to_string(),
            None => "(no dependencies declared)".to_string(),
        };
        out.push_str(&format!("{}: {deps}\n", shown.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandDescriptor, OptionSpec, OptionType};

    fn tree() -> CommandTree {
        let mut flag = OptionSpec::new("flag", OptionType::Boolean);
        flag.description = Some("toggle".into());
        let sub = CommandDescriptor {
            name: "sub".into(),
            options: Some(vec![flag, OptionSpec::new("dry-run", OptionType::Input)]),
            ..CommandDescriptor::default()
        };
        CommandTree {
            root: CommandDescriptor {
                name: "root".into(),
                options: Some(vec![OptionSpec::new("prod", OptionType::Boolean)]),
                subcommands: vec![sub],
                ..CommandDescriptor::default()
            },
        }
    }

    #[test]
    fn name_map_lists_commands_and_flags() {
        let map = arg_name_map(&tree(), "zli").expect("map");
        assert_eq!(
            map,
            "> root\nroot > sub\n----> -f, --flag => flag\n----> -d, --dry-run <dry-run> => dryRun\n"
        );
    }

    #[test]
    fn unnamed_root_uses_fallback() {
        let mut tree = tree();
        tree.root.name.clear();
        let map = arg_name_map(&tree, "zli").expect("map");
        assert!(map.starts_with("> zli\nzli > sub\n"));
    }

    #[test]
    fn deps_distinguish_missing_from_empty() {
        let root = Path::new("/c");
        let listing = deps_listing(
            root,
            &[
                (PathBuf::from("/c/a.js"), Some(vec!["git".into(), "jq".into()])),
                (PathBuf::from("/c/b.js"), Some(Vec::new())),
                (PathBuf::from("/c/sub/c.js"), None),
            ],
        );
        assert_eq!(
            listing,
            "a.js: git, jq\nb.js: (empty)\nsub/c.js: (no dependencies declared)\n"
        );
    }
}
