//! Option extraction: finds the exported `OPTS` object and `DEPS` array.
//!
//! Extraction never evaluates anything. The `OPTS` properties are deep-copied
//! into the caller's arena so the fragment outlives the walk; turning them
//! into plain data is the evaluator's job.

use std::path::{Path, PathBuf};

use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::{
    ArrayExpressionElement, Expression, ExportNamedDeclaration, ImportDeclaration,
    ObjectPropertyKind,
};

use super::errors::{TraversalCause, TraversalError, VisitError};
use super::parser::{SyntaxTree, parse};
use super::value::format_number;
use super::walker::{NodePath, Visitor, traverse};

/// Exported binding holding the command descriptor literal.
pub const OPTS_BINDING: &str = "OPTS";
/// Exported binding holding the dependency list.
pub const DEPS_BINDING: &str = "DEPS";

/// The `OPTS` literal of one file, still in syntax form.
///
/// `filePath` is not part of `properties`; it is injected after them when
/// the fragment is evaluated or regenerated.
pub struct CommandFragment<'a> {
    pub file_path: PathBuf,
    pub source_text: &'a str,
    pub properties: Vec<ObjectPropertyKind<'a>>,
}

impl<'a> CommandFragment<'a> {
    /// Source text covered by `span`-like offsets of a copied node.
    pub fn slice(&self, start: u32, end: u32) -> &'a str {
        self.source_text
            .get(start as usize..end as usize)
            .unwrap_or_default()
    }
}

struct CommandState<'a> {
    allocator: &'a Allocator,
    properties: Option<Vec<ObjectPropertyKind<'a>>>,
    imported_opts: Option<String>,
}

struct CommandVisitor;

impl<'a> Visitor<'a, CommandState<'a>> for CommandVisitor {
    fn export_named_declaration(
        &mut self,
        path: &NodePath<'_, 'a, ExportNamedDeclaration<'a>>,
        state: &mut CommandState<'a>,
    ) -> Result<(), VisitError> {
        if !path.has_binding(OPTS_BINDING) {
            return Ok(());
        }
        let Some(declarator) = path.declarator(OPTS_BINDING) else {
            return Ok(());
        };
        let Some(init) = &declarator.init else {
            return Err(VisitError::new(
                "OPTS is exported without an initializer",
                path.line(),
            ));
        };
        let Expression::ObjectExpression(object) = init.get_inner_expression() else {
            return Err(VisitError::new(
                "OPTS must be initialized with an object literal",
                path.line(),
            ));
        };

        let properties = state.properties.get_or_insert_with(Vec::new);
        properties.extend(
            object
                .properties
                .iter()
                .map(|property| property.clone_in(state.allocator)),
        );
        Ok(())
    }

    fn import_declaration(
        &mut self,
        path: &NodePath<'_, 'a, ImportDeclaration<'a>>,
        state: &mut CommandState<'a>,
    ) -> Result<(), VisitError> {
        if path.local_names().any(|name| name == OPTS_BINDING) {
            state.imported_opts = Some(path.source().to_string());
        }
        Ok(())
    }
}

pub(crate) fn opts_context(path: &Path) -> String {
    format!("could not extract OPTS from {}", path.display())
}

fn deps_context(path: &Path) -> String {
    format!("could not extract DEPS from {}", path.display())
}

/// Parse `path` and extract its `OPTS` fragment into `allocator`.
pub fn extract_command<'a>(
    allocator: &'a Allocator,
    path: &Path,
) -> Result<Option<CommandFragment<'a>>, TraversalError> {
    let tree = parse(allocator, path).map_err(|err| {
        TraversalError::new(path, opts_context(path), TraversalCause::Parse(err))
    })?;
    command_fragment(allocator, &tree)
}

/// Extract the `OPTS` fragment from an already parsed tree.
pub fn command_fragment<'a>(
    allocator: &'a Allocator,
    tree: &SyntaxTree<'a>,
) -> Result<Option<CommandFragment<'a>>, TraversalError> {
    let state = CommandState {
        allocator,
        properties: None,
        imported_opts: None,
    };
    let state = traverse(tree, &mut CommandVisitor, state).map_err(|err| {
        TraversalError::new(tree.path(), opts_context(tree.path()), TraversalCause::Visit(err))
    })?;

    if state.properties.is_none()
        && let Some(source) = &state.imported_opts
    {
        tracing::warn!(
            "{} imports OPTS from {source}; imported options are not followed",
            tree.path().display()
        );
    }

    Ok(state.properties.map(|properties| CommandFragment {
        file_path: tree.path().to_path_buf(),
        source_text: tree.source_text(),
        properties,
    }))
}

#[derive(Default)]
struct DepsState {
    deps: Option<Vec<String>>,
}

struct DepsVisitor;

impl<'a> Visitor<'a, DepsState> for DepsVisitor {
    fn export_named_declaration(
        &mut self,
        path: &NodePath<'_, 'a, ExportNamedDeclaration<'a>>,
        state: &mut DepsState,
    ) -> Result<(), VisitError> {
        if !path.has_binding(DEPS_BINDING) {
            return Ok(());
        }
        let Some(init) = path
            .declarator(DEPS_BINDING)
            .and_then(|declarator| declarator.init.as_ref())
        else {
            return Ok(());
        };
        let Expression::ArrayExpression(array) = init.get_inner_expression() else {
            tracing::debug!(
                "{}: DEPS is not an array literal, ignoring",
                path.tree().path().display()
            );
            return Ok(());
        };

        let mut deps = Vec::with_capacity(array.elements.len());
        for element in &array.elements {
            match literal_text(element) {
                Some(text) => deps.push(text),
                None => {
                    return Err(VisitError::new(
                        "DEPS entries must be string, number or boolean literals",
                        path.line(),
                    ));
                }
            }
        }
        state.deps = Some(deps);
        Ok(())
    }
}

fn literal_text(element: &ArrayExpressionElement<'_>) -> Option<String> {
    match element.as_expression()?.get_inner_expression() {
        Expression::StringLiteral(lit) => Some(lit.value.to_string()),
        Expression::NumericLiteral(lit) => Some(format_number(lit.value)),
        Expression::BooleanLiteral(lit) => Some(lit.value.to_string()),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => tpl
            .quasis
            .first()
            .and_then(|quasi| quasi.value.cooked.as_ref())
            .map(|cooked| cooked.to_string()),
        _ => None,
    }
}

/// Parse `path` and collect its `DEPS`. `None` means no dependencies declared.
pub fn extract_deps(path: &Path) -> Result<Option<Vec<String>>, TraversalError> {
    let allocator = Allocator::default();
    let tree = parse(&allocator, path).map_err(|err| {
        TraversalError::new(path, deps_context(path), TraversalCause::Parse(err))
    })?;
    dependencies(&tree)
}

/// Collect `DEPS` from an already parsed tree.
pub fn dependencies(tree: &SyntaxTree<'_>) -> Result<Option<Vec<String>>, TraversalError> {
    traverse(tree, &mut DepsVisitor, DepsState::default())
        .map(|state| state.deps)
        .map_err(|err| {
            TraversalError::new(tree.path(), deps_context(tree.path()), TraversalCause::Visit(err))
        })
}
