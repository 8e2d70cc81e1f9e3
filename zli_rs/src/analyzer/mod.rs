//! Discovery phase: command files → command tree.
//!
//! Each file is parsed once, its `OPTS` fragment and `DEPS` list are
//! extracted, and the fragment is evaluated into a [`CommandDescriptor`].
//! Files are processed one after another; the first failure aborts.

pub mod codegen;
pub mod errors;
pub mod evaluator;
pub mod extractor;
pub mod parser;
pub mod value;
pub mod walker;

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;

pub use errors::{
    CompileError, DiscoveryError, GenerationError, ParseError, TraversalCause, TraversalError,
    VisitError,
};
pub use value::Value;

use crate::context::Context;
use crate::fs_utils::{self, DiscoveryOptions};
use crate::types::{CommandDescriptor, CommandTree};

/// Extract and evaluate one command file. `None` when it declares no `OPTS`.
pub fn load_command_file(
    path: &Path,
    ctx: &Context,
) -> Result<Option<CommandDescriptor>, DiscoveryError> {
    let allocator = Allocator::default();
    let tree = parser::parse(&allocator, path).map_err(|err| {
        TraversalError::new(path, extractor::opts_context(path), TraversalCause::Parse(err))
    })?;

    let Some(fragment) = extractor::command_fragment(&allocator, &tree)? else {
        return Ok(None);
    };
    let deps = extractor::dependencies(&tree)?;
    let value = evaluator::evaluate(&fragment, ctx)?;

    let mut descriptor = descriptor_from_value(&value, path)
        .map_err(|err| err.with_generated(codegen::generate(&fragment).ok()))?;
    if deps.is_some() {
        descriptor.deps = deps;
    }
    Ok(Some(descriptor))
}

/// Shape-check an evaluated literal into a descriptor.
pub fn descriptor_from_value(value: &Value, path: &Path) -> Result<CommandDescriptor, CompileError> {
    serde_json::from_value(value.to_json()).map_err(|err| CompileError::new(path, err.to_string()))
}

/// Every command file under the configured command root, in merge order.
pub fn command_files(ctx: &Context) -> Result<Vec<PathBuf>, DiscoveryError> {
    let options = DiscoveryOptions::from_config(&ctx.config)?;
    let root = ctx.commands_root();
    fs_utils::command_files(&root, &options).map_err(|source| DiscoveryError::Io {
        path: root.clone(),
        source,
    })
}

/// Build the command tree from scratch.
pub fn discover(ctx: &Context) -> Result<CommandTree, DiscoveryError> {
    let root = ctx.commands_root();
    let files = command_files(ctx)?;
    tracing::debug!("discovering {} command file(s) under {}", files.len(), root.display());

    let mut tree = CommandTree::new();
    for file in files {
        let Some(descriptor) = load_command_file(&file, ctx)? else {
            tracing::debug!("{}: no OPTS export, skipping", file.display());
            continue;
        };
        tracing::debug!("{}: command `{}`", file.display(), descriptor.name);
        let segments = fs_utils::path_segments(&root, &file);
        tree = tree.merge(&segments, descriptor);
    }
    Ok(tree)
}

/// Declared `DEPS` of every command file, in discovery order.
pub fn collect_deps(ctx: &Context) -> Result<Vec<(PathBuf, Option<Vec<String>>)>, DiscoveryError> {
    command_files(ctx)?
        .into_iter()
        .map(|file| {
            let deps = extractor::extract_deps(&file)?;
            Ok((file, deps))
        })
        .collect()
}

/// Regenerated `OPTS` source of one file, if it declares any.
pub fn print_opts(path: &Path) -> Result<Option<String>, DiscoveryError> {
    let allocator = Allocator::default();
    let Some(fragment) = extractor::extract_command(&allocator, path)? else {
        return Ok(None);
    };
    Ok(Some(codegen::generate(&fragment)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZliConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, contents).expect("write");
    }

    fn context(temp: &TempDir) -> Context {
        Context::new(
            ZliConfig::anchored(temp.path()),
            temp.path().to_path_buf(),
        )
    }

    #[test]
    fn discovers_root_and_sub_commands() {
        let temp = TempDir::new().expect("temp dir");
        let commands = temp.path().join("zli_commands/commands");
        write(&commands, "index.js", "export const OPTS = { name: 'root', options: [] };\n");
        write(
            &commands,
            "sub/index.js",
            "export const OPTS = {\n  name: 'sub',\n  options: [{ name: 'flag', type: OPTION_TYPES.BOOLEAN }],\n};\nexport const DEPS = ['git'];\n",
        );
        write(&commands, "helpers/util.js", "export const helper = () => 1;\n");

        let tree = discover(&context(&temp)).expect("discover");
        assert_eq!(tree.root.name, "root");
        let names: Vec<_> = tree.subcommands().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sub"]);
        let sub = &tree.subcommands()[0];
        assert_eq!(sub.options()[0].name.long(), "flag");
        assert_eq!(sub.deps, Some(vec!["git".to_string()]));
        assert_eq!(sub.file_path.as_deref(), Some(commands.join("sub/index.js").as_path()));
    }

    #[test]
    fn malformed_file_aborts_discovery() {
        let temp = TempDir::new().expect("temp dir");
        let commands = temp.path().join("zli_commands/commands");
        write(&commands, "a.js", "export const OPTS = { name: 'a' };\n");
        write(&commands, "b.js", "export const OPTS = { name: 'b', \n");

        let err = discover(&context(&temp)).expect_err("syntax error");
        assert!(matches!(err, DiscoveryError::Traversal(_)));
        assert_eq!(err.path(), Some(commands.join("b.js").as_path()));
    }

    #[test]
    fn shape_violation_is_a_compile_error_with_source() {
        let temp = TempDir::new().expect("temp dir");
        let commands = temp.path().join("zli_commands/commands");
        write(&commands, "a.js", "export const OPTS = { description: 'no name' };\n");

        let err = discover(&context(&temp)).expect_err("missing name");
        let DiscoveryError::Compile(err) = err else {
            panic!("expected compile error");
        };
        assert!(err.message.contains("name"));
        assert!(err.generated.as_deref().is_some_and(|g| g.contains("no name")));
    }

    #[test]
    fn missing_root_is_reported() {
        let temp = TempDir::new().expect("temp dir");
        let err = discover(&context(&temp)).expect_err("no command root");
        assert!(matches!(err, DiscoveryError::Io { .. }));
    }

    #[test]
    fn deps_listing_distinguishes_absent() {
        let temp = TempDir::new().expect("temp dir");
        let commands = temp.path().join("zli_commands/commands");
        write(&commands, "a.js", "export const OPTS = { name: 'a' };\n");
        write(&commands, "b.js", "export const DEPS = [];\n");

        let deps = collect_deps(&context(&temp)).expect("deps");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].1, None);
        assert_eq!(deps[1].1, Some(vec![]));
    }

    #[test]
    fn print_opts_renders_fragment() {
        let temp = TempDir::new().expect("temp dir");
        write(temp.path(), "x.js", "export const OPTS = { name: 'x' };\n");
        let rendered = print_opts(&temp.path().join("x.js"))
            .expect("print")
            .expect("has OPTS");
        assert!(rendered.contains("name: \"x\""));
        assert!(rendered.contains("filePath"));
    }
}
