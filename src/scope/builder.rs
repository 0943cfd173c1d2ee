//! Declaration pre-pass
//!
//! Walks the syntax tree once before the rewrite and records every scope
//! and every name already declared in it: `var`, `let`, `const`, function
//! and class names, parameters, catch parameters, declared loop targets and
//! imports. `var` declarations land in the nearest function, class static
//! block or program scope regardless of where they appear, so a later declaration is still
//! visible from an earlier assignment.

use tree_sitter::Node;

use super::graph::{ScopeId, ScopeKind, ScopeTree};
use crate::pattern::Pattern;
use crate::syntax::{self, NodeKind, ParsedSource};

/// Build the scope tree for a parsed file
pub fn build_scope_tree(parsed: &ParsedSource<'_>) -> ScopeTree {
    let mut builder = ScopeBuilder {
        source: parsed.source(),
        tree: ScopeTree::new(),
    };

    let root = parsed.root();
    if let Some(offset) = first_statement(&root, true) {
        builder.tree.set_first_statement(ScopeId::root(), offset);
    }
    builder.visit_children(root, ScopeId::root());

    tracing::debug!(scopes = builder.tree.len(), "built scope tree");
    builder.tree
}

struct ScopeBuilder<'s> {
    source: &'s str,
    tree: ScopeTree,
}

impl ScopeBuilder<'_> {
    fn visit(&mut self, node: Node<'_>, scope: ScopeId) {
        let kind = NodeKind::of(&node);
        match kind {
            NodeKind::FunctionDeclaration
            | NodeKind::FunctionExpression
            | NodeKind::ArrowFunction
            | NodeKind::Method
            | NodeKind::StaticBlock => self.visit_function(node, kind, scope),

            NodeKind::ClassDeclaration | NodeKind::ClassExpression => {
                let name = node.child_by_field_name("name");
                if kind == NodeKind::ClassDeclaration {
                    self.declare_name(name, scope);
                }
                let class = self.open(&node, scope, ScopeKind::Class);
                if kind == NodeKind::ClassExpression {
                    self.declare_name(name, class);
                }
                self.visit_children(node, class);
            }

            NodeKind::StatementBlock => {
                // Function and catch bodies share the scope of their parent
                let shares_parent_scope = node.parent().is_some_and(|parent| {
                    let parent_kind = NodeKind::of(&parent);
                    parent_kind.is_function_like() || parent_kind == NodeKind::CatchClause
                });
                if shares_parent_scope {
                    self.visit_children(node, scope);
                } else {
                    let block = self.open(&node, scope, ScopeKind::Block);
                    if let Some(offset) = first_statement(&node, false) {
                        self.tree.set_first_statement(block, offset);
                    }
                    self.visit_children(node, block);
                }
            }

            NodeKind::ForStatement | NodeKind::LoopStatement | NodeKind::SwitchStatement => {
                let block = self.open(&node, scope, ScopeKind::Block);
                self.visit_children(node, block);
            }

            NodeKind::ForEachStatement => {
                let block = self.open(&node, scope, ScopeKind::Block);
                if let Some(declaration_kind) = node.child_by_field_name("kind") {
                    let target = if syntax::node_text(&declaration_kind, self.source) == "var" {
                        self.tree.var_scope(scope)
                    } else {
                        block
                    };
                    if let Some(left) = node.child_by_field_name("left") {
                        self.declare_pattern(left, target);
                    }
                }
                self.visit_children(node, block);
            }

            NodeKind::CatchClause => {
                let block = self.open(&node, scope, ScopeKind::Block);
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    self.declare_pattern(parameter, block);
                }
                self.visit_children(node, block);
            }

            NodeKind::VariableDeclaration | NodeKind::LexicalDeclaration => {
                let target = if kind == NodeKind::VariableDeclaration {
                    self.tree.var_scope(scope)
                } else {
                    scope
                };
                for declarator in syntax::named_children(&node) {
                    if NodeKind::of(&declarator) != NodeKind::VariableDeclarator {
                        continue;
                    }
                    if let Some(name) = declarator.child_by_field_name("name") {
                        self.declare_pattern(name, target);
                    }
                }
                self.visit_children(node, scope);
            }

            NodeKind::ImportStatement => self.declare_imports(node),

            NodeKind::Program
            | NodeKind::Identifier
            | NodeKind::PropertyIdentifier
            | NodeKind::ShorthandPatternIdentifier
            | NodeKind::ObjectPattern
            | NodeKind::ArrayPattern
            | NodeKind::PairPattern
            | NodeKind::RestPattern
            | NodeKind::DefaultPattern
            | NodeKind::Assignment
            | NodeKind::CompoundAssignment
            | NodeKind::Sequence
            | NodeKind::Parenthesized
            | NodeKind::ExpressionStatement
            | NodeKind::VariableDeclarator
            | NodeKind::FormalParameters
            | NodeKind::ImportSpecifier
            | NodeKind::String
            | NodeKind::Comment
            | NodeKind::HashBang
            | NodeKind::OpenParen
            | NodeKind::CloseParen
            | NodeKind::Other => self.visit_children(node, scope),
        }
    }

    fn visit_children(&mut self, node: Node<'_>, scope: ScopeId) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child, scope);
        }
    }

    fn visit_function(&mut self, node: Node<'_>, kind: NodeKind, scope: ScopeId) {
        // A method's key is evaluated in the enclosing scope
        let key = match kind {
            NodeKind::Method => node.child_by_field_name("name"),
            _ => None,
        };
        if let Some(key) = key {
            self.visit(key, scope);
        }

        let name = node.child_by_field_name("name");
        if kind == NodeKind::FunctionDeclaration {
            self.declare_name(name, scope);
        }

        let function_kind = match kind {
            NodeKind::StaticBlock => ScopeKind::StaticBlock,
            _ => ScopeKind::Function,
        };
        let function = self.open(&node, scope, function_kind);
        if kind == NodeKind::FunctionExpression {
            self.declare_name(name, function);
        }

        if let Some(parameter) = node.child_by_field_name("parameter") {
            self.declare_pattern(parameter, function);
        }
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for parameter in syntax::named_children(&parameters) {
                self.declare_pattern(parameter, function);
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            if NodeKind::of(&body) == NodeKind::StatementBlock {
                if let Some(offset) = first_statement(&body, true) {
                    self.tree.set_first_statement(function, offset);
                }
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            if key.is_some_and(|key| key.id() == child.id()) {
                continue;
            }
            self.visit(child, function);
        }
    }

    fn declare_imports(&mut self, node: Node<'_>) {
        let root = ScopeId::root();
        for clause in syntax::named_children(&node) {
            if clause.kind() != "import_clause" {
                continue;
            }
            for part in syntax::named_children(&clause) {
                match part.kind() {
                    "identifier" => self.declare_name(Some(part), root),
                    "namespace_import" => {
                        for name in syntax::named_children(&part) {
                            if NodeKind::of(&name) == NodeKind::Identifier {
                                self.declare_name(Some(name), root);
                            }
                        }
                    }
                    "named_imports" => {
                        for specifier in syntax::named_children(&part) {
                            if NodeKind::of(&specifier) != NodeKind::ImportSpecifier {
                                continue;
                            }
                            let local = specifier
                                .child_by_field_name("alias")
                                .or_else(|| specifier.child_by_field_name("name"));
                            self.declare_name(local, root);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn open(&mut self, node: &Node<'_>, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let scope = self.tree.add_scope(parent, kind);
        self.tree.bind_node(node.id(), scope);
        scope
    }

    fn declare_name(&mut self, name: Option<Node<'_>>, scope: ScopeId) {
        if let Some(name) = name {
            let text = syntax::node_text(&name, self.source);
            if !text.is_empty() {
                self.tree.add_declaration(scope, text);
            }
        }
    }

    fn declare_pattern(&mut self, node: Node<'_>, scope: ScopeId) {
        for identifier in Pattern::from_node(node, self.source).identifiers() {
            self.tree.add_declaration(scope, identifier.name.clone());
        }
    }
}

/// Offset of the first statement in a statement list. Comments and hashbang
/// lines never count; leading directives are skipped in function bodies and
/// at the top of the program.
fn first_statement(block: &Node<'_>, skip_directives: bool) -> Option<usize> {
    syntax::named_children(block)
        .into_iter()
        .find(|statement| match NodeKind::of(statement) {
            NodeKind::HashBang => false,
            NodeKind::ExpressionStatement => !(skip_directives && is_directive(statement)),
            _ => true,
        })
        .map(|statement| statement.start_byte())
}

/// `'use strict';` and other string-only expression statements
fn is_directive(statement: &Node<'_>) -> bool {
    match syntax::named_children(statement).as_slice() {
        [expression] => NodeKind::of(expression) == NodeKind::String,
        _ => false,
    }
}
