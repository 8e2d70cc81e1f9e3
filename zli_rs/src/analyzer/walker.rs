//! Tree walker: depth-first traversal with per-node-type callbacks.
//!
//! The walk follows OXC's document-order [`Visit`] traversal and tracks the
//! lexical scope stack so callbacks can ask whether a name is bound where the
//! node sits. Callbacks share one mutable state value; the first callback
//! failure stops all further callbacks and is returned from [`traverse`].

use std::cell::Cell;

use oxc_ast::ast::{
    BindingPattern, Declaration, ExportDefaultDeclaration, ExportNamedDeclaration,
    ImportDeclaration, VariableDeclarator,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::GetSpan;
use oxc_syntax::scope::{ScopeFlags, ScopeId};

use super::errors::VisitError;
use super::parser::SyntaxTree;

/// Callbacks keyed by node type. Unimplemented node types are skipped.
pub trait Visitor<'a, S> {
    fn export_named_declaration(
        &mut self,
        _path: &NodePath<'_, 'a, ExportNamedDeclaration<'a>>,
        _state: &mut S,
    ) -> Result<(), VisitError> {
        Ok(())
    }

    fn export_default_declaration(
        &mut self,
        _path: &NodePath<'_, 'a, ExportDefaultDeclaration<'a>>,
        _state: &mut S,
    ) -> Result<(), VisitError> {
        Ok(())
    }

    fn import_declaration(
        &mut self,
        _path: &NodePath<'_, 'a, ImportDeclaration<'a>>,
        _state: &mut S,
    ) -> Result<(), VisitError> {
        Ok(())
    }
}

/// The node being visited plus the queries a callback may make about it.
pub struct NodePath<'n, 'a, N> {
    node: &'n N,
    tree: &'n SyntaxTree<'a>,
    scope_id: ScopeId,
}

impl<'n, 'a, N: GetSpan> NodePath<'n, 'a, N> {
    pub fn node(&self) -> &'n N {
        self.node
    }

    pub fn tree(&self) -> &'n SyntaxTree<'a> {
        self.tree
    }

    /// Whether `name` resolves to a binding in this scope or any enclosing one.
    pub fn has_binding(&self, name: &str) -> bool {
        self.tree
            .scoping()
            .find_binding(self.scope_id, name.into())
            .is_some()
    }

    pub fn line(&self) -> usize {
        self.tree.line(self.node.span())
    }
}

impl<'n, 'a> NodePath<'n, 'a, ImportDeclaration<'a>> {
    /// Local names introduced by this import.
    pub fn local_names(&self) -> impl Iterator<Item = &'n str> {
        self.node
            .specifiers
            .iter()
            .flat_map(|specifiers| specifiers.iter())
            .map(|specifier| specifier.local().name.as_str())
    }

    pub fn source(&self) -> &'n str {
        self.node.source.value.as_str()
    }
}

impl<'n, 'a> NodePath<'n, 'a, ExportNamedDeclaration<'a>> {
    /// Declarators of `export const|let|var ...`; empty for other exports.
    pub fn declarations(&self) -> impl Iterator<Item = &'n VariableDeclarator<'a>> {
        let var = match &self.node.declaration {
            Some(Declaration::VariableDeclaration(var)) => Some(var),
            _ => None,
        };
        var.into_iter().flat_map(|var| var.declarations.iter())
    }

    /// The exported declarator binding exactly `name`.
    pub fn declarator(&self, name: &str) -> Option<&'n VariableDeclarator<'a>> {
        self.declarations().find(|decl| {
            matches!(&decl.id, BindingPattern::BindingIdentifier(id) if id.name.as_str() == name)
        })
    }
}

struct Walker<'w, 'a, S, V> {
    tree: &'w SyntaxTree<'a>,
    visitor: &'w mut V,
    state: &'w mut S,
    scopes: Vec<ScopeId>,
    error: Option<VisitError>,
}

impl<'w, 'a, S, V> Walker<'w, 'a, S, V> {
    fn current_scope(&self) -> ScopeId {
        self.scopes
            .last()
            .copied()
            .unwrap_or_else(|| self.tree.scoping().root_scope_id())
    }

    fn path<'n, N>(&self, node: &'n N) -> NodePath<'n, 'a, N>
    where
        'w: 'n,
    {
        NodePath {
            node,
            tree: self.tree,
            scope_id: self.current_scope(),
        }
    }
}

impl<'w, 'a, S, V: Visitor<'a, S>> Visit<'a> for Walker<'w, 'a, S, V> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        let id = scope_id.get().unwrap_or_else(|| self.current_scope());
        self.scopes.push(id);
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if self.error.is_none() {
            let path = self.path(it);
            if let Err(err) = self.visitor.export_named_declaration(&path, self.state) {
                self.error = Some(err);
            }
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        if self.error.is_none() {
            let path = self.path(it);
            if let Err(err) = self.visitor.export_default_declaration(&path, self.state) {
                self.error = Some(err);
            }
        }
        walk::walk_export_default_declaration(self, it);
    }

    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        if self.error.is_none() {
            let path = self.path(it);
            if let Err(err) = self.visitor.import_declaration(&path, self.state) {
                self.error = Some(err);
            }
        }
        walk::walk_import_declaration(self, it);
    }
}

/// Walk `tree` in document order, feeding `visitor` and threading `state`.
pub fn traverse<'a, S, V: Visitor<'a, S>>(
    tree: &SyntaxTree<'a>,
    visitor: &mut V,
    mut state: S,
) -> Result<S, VisitError> {
    let error = {
        let mut walker = Walker {
            tree,
            visitor,
            state: &mut state,
            scopes: Vec::new(),
            error: None,
        };
        walker.visit_program(tree.program());
        walker.error
    };
    match error {
        Some(err) => Err(err),
        None => Ok(state),
    }
}
