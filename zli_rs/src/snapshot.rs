//! Cache artifact for the assembled command tree.
//!
//! The cache is itself a module: `export default { ... };` holding the tree
//! as a literal. Loading it goes through the same parser and evaluator as
//! command files, so hooks survive the round trip as source text.

use std::fs;
use std::io;
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::ExportDefaultDeclaration;

use crate::analyzer::codegen::generate_value;
use crate::analyzer::errors::VisitError;
use crate::analyzer::evaluator::evaluate_expression;
use crate::analyzer::parser::parse_source;
use crate::analyzer::value::Value;
use crate::analyzer::walker::{NodePath, Visitor, traverse};
use crate::context::Context;
use crate::types::CommandTree;

/// Current cache format version, recorded in the header comment.
pub const CACHE_SCHEMA_VERSION: &str = "1";

fn header() -> String {
    format!(
        "// zli command cache (schema {CACHE_SCHEMA_VERSION}, zli {}).\n// Generated file; rebuild with `--write-cache`.",
        env!("CARGO_PKG_VERSION")
    )
}

fn invalid(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err.to_string())
}

/// Write `tree` to `path` as a generated module.
pub fn save(tree: &CommandTree, path: &Path) -> io::Result<()> {
    let json = serde_json::to_value(tree).map_err(invalid)?;
    let body = generate_value(&Value::from_json(&json));
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, format!("{}\nexport default {body};\n", header()))
}

struct DefaultExport<'c> {
    ctx: &'c Context,
}

impl<'a> Visitor<'a, Option<Value>> for DefaultExport<'_> {
    fn export_default_declaration(
        &mut self,
        path: &NodePath<'_, 'a, ExportDefaultDeclaration<'a>>,
        state: &mut Option<Value>,
    ) -> Result<(), VisitError> {
        let Some(expr) = path.node().declaration.as_expression() else {
            return Err(VisitError::new(
                "default export is not an expression",
                path.line(),
            ));
        };
        let tree = path.tree();
        let value = evaluate_expression(expr, tree.path(), tree.source_text(), self.ctx)
            .map_err(|err| VisitError::new(err.to_string(), path.line()))?;
        *state = Some(value);
        Ok(())
    }
}

/// Read a cache artifact back into a tree.
pub fn load(path: &Path, ctx: &Context) -> io::Result<CommandTree> {
    let content = fs::read_to_string(path)?;
    let allocator = Allocator::default();
    let tree = parse_source(&allocator, path, &content).map_err(invalid)?;
    let value = traverse(&tree, &mut DefaultExport { ctx }, None)
        .map_err(invalid)?
        .ok_or_else(|| invalid(format!("{} has no default export", path.display())))?;
    serde_json::from_value(value.to_json()).map_err(invalid)
}

/// Cached tree when present and readable; `None` means rediscover.
pub fn load_if_present(path: &Path, ctx: &Context) -> Option<CommandTree> {
    if !path.is_file() {
        return None;
    }
    match load(path, ctx) {
        Ok(tree) => {
            tracing::debug!("loaded command tree from {}", path.display());
            Some(tree)
        }
        Err(err) => {
            tracing::warn!(
                "ignoring unreadable cache {}: {err}; rediscovering",
                path.display()
            );
            None
        }
    }
}
