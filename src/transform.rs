//! Forward pass that adds declarations for implicit globals
//!
//! One depth-first walk over the syntax tree. At each node the handler for
//! its kind runs first (assignment, sequence, for-in/of, or a name
//! reference), then the node's scope is entered if it introduces one, then
//! its children are visited. Leaving a scope commits its ledger.
//!
//! ```text
//!   a = 1;            →  var a = 1;
//!   b(c = 2);         →  var c;
//!                        b(c = 2);
//!   for (k in o) {}   →  for (var k in o) {}
//! ```

use std::collections::HashSet;

use serde::Serialize;
use tree_sitter::Node;

use crate::commit::{self, CommitContext};
use crate::edit::{Edit, Editor, MapOptions, SourceMap};
use crate::ledger::LedgerStack;
use crate::pattern::{Identifier, Pattern};
use crate::scope::{build_scope_tree, ScopeTree};
use crate::syntax::{self, NodeKind, ParsedSource, Span};
use crate::{Error, Result};

/// What a transform declared
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Names declared by inserting the keyword at an assignment or loop
    pub inlined: Vec<String>,
    /// Names declared by a statement at the top of a scope
    pub hoisted: Vec<String>,
}

impl Stats {
    pub fn declared(&self) -> usize {
        self.inlined.len() + self.hoisted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared() == 0
    }
}

/// Source map naming for [`Transformer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Name of the generated file, recorded as the map's `file`
    pub file_name: Option<String>,
    /// Name of the input file, recorded in the map's `sources`
    pub source_name: String,
    pub include_source_content: bool,
}

impl Default for Options {
    fn default() -> Self {
        let map = MapOptions::default();
        Self {
            file_name: map.file,
            source_name: map.source,
            include_source_content: map.include_content,
        }
    }
}

impl Options {
    fn map_options(&self) -> MapOptions {
        MapOptions {
            file: self.file_name.clone(),
            source: self.source_name.clone(),
            include_content: self.include_source_content,
        }
    }
}

/// Rewritten code with its source map
#[derive(Debug, Clone)]
pub struct Transformed {
    pub code: String,
    pub map: SourceMap,
    pub stats: Stats,
}

impl Transformed {
    pub fn is_changed(&self) -> bool {
        !self.stats.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Transformer {
    options: Options,
}

impl Transformer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn transform(&self, source: &str) -> Result<Transformed> {
        let parsed = ParsedSource::parse(source)?;
        let scopes = build_scope_tree(&parsed);
        let mut editor = Editor::new(source);
        let stats = run(&parsed, &scopes, &mut editor)?;
        let (code, map) = editor.render_with_map(&self.options.map_options());
        Ok(Transformed { code, map, stats })
    }
}

/// Rewrite `source` with default options
pub fn add_variable_declarations(source: &str) -> Result<Transformed> {
    Transformer::default().transform(source)
}

/// Run the pass over an already parsed file, recording edits in `editor`
pub fn run<'s>(parsed: &ParsedSource<'s>, scopes: &ScopeTree, editor: &mut Editor<'s>) -> Result<Stats> {
    let mut traversal = Traversal::new(parsed, scopes);
    traversal.visit(parsed.root())?;
    let (edits, stats) = traversal.finish()?;
    editor.apply_all(edits)?;
    tracing::debug!(
        inlined = stats.inlined.len(),
        hoisted = stats.hoisted.len(),
        "transform finished"
    );
    Ok(stats)
}

struct Traversal<'a> {
    source: &'a str,
    ledgers: LedgerStack<'a>,
    context: CommitContext<'a>,
    /// Assignments already handled as part of a group
    seen: HashSet<usize>,
    edits: Vec<Edit>,
    stats: Stats,
}

impl<'a> Traversal<'a> {
    fn new(parsed: &'a ParsedSource<'_>, scopes: &'a ScopeTree) -> Self {
        Self {
            source: parsed.source(),
            ledgers: LedgerStack::new(scopes),
            context: CommitContext {
                source: parsed.source(),
                tokens: parsed.tokens(),
                scopes,
            },
            seen: HashSet::new(),
            edits: Vec::new(),
            stats: Stats::default(),
        }
    }

    fn visit(&mut self, node: Node<'_>) -> Result<()> {
        let kind = NodeKind::of(&node);
        match kind {
            NodeKind::Assignment => self.visit_assignment(node)?,
            NodeKind::Sequence => self.visit_sequence(node)?,
            NodeKind::ForEachStatement => self.visit_for_each(node)?,
            NodeKind::Identifier
            | NodeKind::PropertyIdentifier
            | NodeKind::ShorthandPatternIdentifier => self.observe(node)?,
            NodeKind::Program
            | NodeKind::FunctionDeclaration
            | NodeKind::FunctionExpression
            | NodeKind::ArrowFunction
            | NodeKind::Method
            | NodeKind::StaticBlock
            | NodeKind::ClassDeclaration
            | NodeKind::ClassExpression
            | NodeKind::StatementBlock
            | NodeKind::ForStatement
            | NodeKind::LoopStatement
            | NodeKind::SwitchStatement
            | NodeKind::CatchClause
            | NodeKind::ObjectPattern
            | NodeKind::ArrayPattern
            | NodeKind::PairPattern
            | NodeKind::RestPattern
            | NodeKind::DefaultPattern
            | NodeKind::CompoundAssignment
            | NodeKind::Parenthesized
            | NodeKind::ExpressionStatement
            | NodeKind::VariableDeclaration
            | NodeKind::LexicalDeclaration
            | NodeKind::VariableDeclarator
            | NodeKind::FormalParameters
            | NodeKind::ImportStatement
            | NodeKind::ImportSpecifier
            | NodeKind::String
            | NodeKind::Comment
            | NodeKind::HashBang
            | NodeKind::OpenParen
            | NodeKind::CloseParen
            | NodeKind::Other => {}
        }

        let scope = self.context.scopes.scope_for_node(node.id());
        if let Some(scope) = scope {
            self.ledgers.enter(scope)?;
        }

        // A method's key is evaluated in the enclosing scope
        let key = match kind {
            NodeKind::Method => node.child_by_field_name("name"),
            _ => None,
        };

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            if key.is_some_and(|key| key.id() == child.id()) {
                self.ledgers.suspend_for_key()?;
                self.visit(child)?;
                self.ledgers.resume_after_key()?;
            } else {
                self.visit(child)?;
            }
        }

        if scope.is_some() {
            self.commit_and_exit()?;
        }
        Ok(())
    }

    /// `a = 1`, `({ a } = o)`, and chains like `a = b = 1`
    fn visit_assignment(&mut self, node: Node<'_>) -> Result<()> {
        if !self.seen.insert(node.id()) {
            return Ok(());
        }
        let Some(left) = node.child_by_field_name("left") else {
            return Ok(());
        };

        let target = Pattern::from_node(left, self.source);
        if target.has_non_identifier_target() || !in_statement_context(&node) {
            for identifier in target.identifiers() {
                self.ledgers.add_binding(&identifier.name)?;
            }
            return Ok(());
        }

        let mut identifiers: Vec<Identifier> = target.identifiers().into_iter().cloned().collect();
        let declared = identifiers.len();
        if declared == 0 {
            return Ok(());
        }

        // The keyword only declares the head of a chain, but the whole chain
        // is inlined or hoisted together.
        let mut right = node.child_by_field_name("right");
        while let Some(next) = right.map(skip_parens) {
            if NodeKind::of(&next) != NodeKind::Assignment {
                break;
            }
            let Some(next_left) = next.child_by_field_name("left") else {
                break;
            };
            let next_target = Pattern::from_node(next_left, self.source);
            if next_target.has_non_identifier_target() {
                break;
            }
            identifiers.extend(next_target.identifiers().into_iter().cloned());
            self.seen.insert(next.id());
            right = next.child_by_field_name("right");
        }

        self.ledgers
            .add_inline_binding(Span::of(&node), &identifiers, declared, true)?;
        Ok(())
    }

    /// `i = 0, len = n` as a statement or `for` initializer
    fn visit_sequence(&mut self, node: Node<'_>) -> Result<()> {
        if !in_statement_context(&node) {
            return Ok(());
        }

        let mut elements = Vec::new();
        flatten_sequence(node, &mut elements);

        let mut identifiers: Vec<Identifier> = Vec::new();
        for element in &elements {
            if NodeKind::of(element) != NodeKind::Assignment {
                return Ok(());
            }
            let Some(left) = element.child_by_field_name("left") else {
                return Ok(());
            };
            let target = Pattern::from_node(left, self.source);
            let names = target.identifiers();
            if names.is_empty() || target.has_non_identifier_target() {
                return Ok(());
            }
            identifiers.extend(names.into_iter().cloned());
        }

        let declared = identifiers.len();
        self.ledgers
            .add_inline_binding(Span::of(&node), &identifiers, declared, true)?;
        for element in &elements {
            self.seen.insert(element.id());
        }
        Ok(())
    }

    /// `for (k in o)` and `for (item of list)` without a declaration
    fn visit_for_each(&mut self, node: Node<'_>) -> Result<()> {
        if node.child_by_field_name("kind").is_some() {
            return Ok(());
        }
        let Some(left) = node.child_by_field_name("left") else {
            return Ok(());
        };

        let target = Pattern::from_node(left, self.source);
        if target.has_non_identifier_target() {
            for identifier in target.identifiers() {
                self.ledgers.add_binding(&identifier.name)?;
            }
            return Ok(());
        }

        let identifiers: Vec<Identifier> = target.identifiers().into_iter().cloned().collect();
        let declared = identifiers.len();
        self.ledgers
            .add_inline_binding(Span::of(&left), &identifiers, declared, false)?;
        Ok(())
    }

    fn observe(&mut self, node: Node<'_>) -> Result<()> {
        let text = syntax::node_text(&node, self.source);
        let name = text.strip_prefix('#').unwrap_or(text);
        if name.is_empty() {
            return Ok(());
        }
        self.ledgers.observe_reference(name)
    }

    fn commit_and_exit(&mut self) -> Result<()> {
        let id = self.ledgers.current()?;
        let plan = commit::plan(&self.ledgers, id, &self.context)?;
        self.stats.inlined.extend(plan.inlined);
        self.stats.hoisted.extend(plan.hoisted);
        self.edits.extend(plan.edits);
        self.ledgers.exit()?;
        Ok(())
    }

    /// Commit the program ledger and hand back everything planned
    fn finish(mut self) -> Result<(Vec<Edit>, Stats)> {
        self.commit_and_exit()?;
        if !self.ledgers.is_empty() {
            return Err(Error::Invariant(format!(
                "{} scope ledgers still open after the traversal",
                self.ledgers.depth()
            )));
        }
        Ok((self.edits, self.stats))
    }
}

/// Whether a node is a whole expression statement or a `for` initializer,
/// ignoring wrapping parentheses
fn in_statement_context(node: &Node<'_>) -> bool {
    let mut child = *node;
    let mut parent = node.parent();
    while let Some(current) = parent {
        if NodeKind::of(&current) != NodeKind::Parenthesized {
            break;
        }
        child = current;
        parent = current.parent();
    }

    let Some(parent) = parent else {
        return false;
    };
    match NodeKind::of(&parent) {
        NodeKind::ExpressionStatement => match parent.parent() {
            Some(outer) if NodeKind::of(&outer) == NodeKind::ForStatement => {
                is_initializer(&outer, &parent)
            }
            _ => true,
        },
        NodeKind::ForStatement => is_initializer(&parent, &child),
        _ => false,
    }
}

fn is_initializer(for_statement: &Node<'_>, node: &Node<'_>) -> bool {
    for_statement
        .child_by_field_name("initializer")
        .is_some_and(|initializer| initializer.id() == node.id())
}

fn skip_parens(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while NodeKind::of(&current) == NodeKind::Parenthesized {
        match syntax::named_children(&current).as_slice() {
            [inner] => current = *inner,
            _ => break,
        }
    }
    current
}

fn flatten_sequence<'t>(node: Node<'t>, elements: &mut Vec<Node<'t>>) {
    for child in syntax::named_children(&node) {
        if NodeKind::of(&child) == NodeKind::Sequence {
            flatten_sequence(child, elements);
        } else {
            elements.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(source: &str) -> String {
        add_variable_declarations(source)
            .unwrap_or_else(|e| panic!("transform of {source:?} failed: {e}"))
            .code
    }

    #[test]
    fn test_statement_assignment_is_inlined() {
        assert_eq!(rewrite("a = 1;"), "var a = 1;");
    }

    #[test]
    fn test_nested_assignment_is_hoisted() {
        assert_eq!(rewrite("b(c = 2);"), "var c;\nb(c = 2);");
    }

    #[test]
    fn test_for_of_target_is_inlined() {
        assert_eq!(
            rewrite("for (item of list) { use(item); }"),
            "for (var item of list) { use(item); }"
        );
        assert_eq!(rewrite("for (key in object) {}"), "for (var key in object) {}");
    }

    #[test]
    fn test_declared_loop_is_untouched() {
        let source = "for (const item of list) { item; }";
        assert_eq!(rewrite(source), source);
    }

    #[test]
    fn test_wrapping_parens_are_removed() {
        assert_eq!(rewrite("(a) = 1;"), "var a = 1;");
        assert_eq!(rewrite("(a = 1);"), "var a = 1;");
        assert_eq!(rewrite("({a, b} = obj);"), "var {a, b} = obj;");
    }

    #[test]
    fn test_existing_binding_is_untouched() {
        assert_eq!(rewrite("let a; a = 1;"), "let a; a = 1;");
        assert_eq!(rewrite("a = 1; var a;"), "a = 1; var a;");
        assert_eq!(rewrite("function f(a) { a = 1; }"), "function f(a) { a = 1; }");
    }

    #[test]
    fn test_widening_forces_hoist() {
        assert_eq!(
            rewrite("function f() { { x = 1; } if (true) { x; } }"),
            "function f() { var x;\n{ x = 1; } if (true) { x; } }"
        );
        assert_eq!(
            rewrite("if (c) { x = 1; }\nuse(x);"),
            "var x;\nif (c) { x = 1; }\nuse(x);"
        );
    }

    #[test]
    fn test_chained_assignment() {
        assert_eq!(rewrite("a = b = 1;"), "var b;\nvar a = b = 1;");
        assert_eq!(rewrite("let b; a = b = 1;"), "var a;\nlet b; a = b = 1;");
        assert_eq!(rewrite("let a; a = b = 1;"), "var b;\nlet a; a = b = 1;");
        assert_eq!(rewrite("a = a = 1;"), "var a;\na = a = 1;");
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            rewrite("for (i = 0, len = list.length; i < len; i++) {}"),
            "for (var i = 0, len = list.length; i < len; i++) {}"
        );
        assert_eq!(rewrite("a = 1, b = 2;"), "var a = 1, b = 2;");
        assert_eq!(rewrite("a = 1, a = 2;"), "var a;\na = 1, a = 2;");
        assert_eq!(rewrite("a = 1, f();"), "var a;\na = 1, f();");
    }

    #[test]
    fn test_for_condition_is_not_a_statement() {
        assert_eq!(rewrite("for (; a = next();) {}"), "var a;\nfor (; a = next();) {}");
    }

    #[test]
    fn test_member_targets_are_left_alone() {
        assert_eq!(rewrite("a.b = 1;"), "a.b = 1;");
        assert_eq!(rewrite("[o.x, y] = pair;"), "var y;\n[o.x, y] = pair;");
    }

    #[test]
    fn test_compound_assignment_is_ignored() {
        assert_eq!(rewrite("a += 1;"), "a += 1;");
    }

    #[test]
    fn test_directives_stay_first() {
        assert_eq!(
            rewrite("'use strict';\nx = 1;\nf(y = 2);"),
            "'use strict';\nvar y;\nvar x = 1;\nf(y = 2);"
        );
    }

    #[test]
    fn test_indentation_is_copied() {
        assert_eq!(
            rewrite("function f() {\n  a = 1;\n  g(b = 2);\n}"),
            "function f() {\n  var b;\n  var a = 1;\n  g(b = 2);\n}"
        );
    }

    #[test]
    fn test_arrow_expression_body_hoists_outward() {
        assert_eq!(rewrite("run(() => value = 1);"), "var value;\nrun(() => value = 1);");
    }

    #[test]
    fn test_method_key_uses_enclosing_scope() {
        assert_eq!(
            rewrite("obj = { [key = 'name']() { return 1; } };"),
            "var key;\nvar obj = { [key = 'name']() { return 1; } };"
        );
    }

    #[test]
    fn test_hoisted_names_are_grouped_and_sorted() {
        assert_eq!(rewrite("f(b = 1, a = 2);"), "var a, b;\nf(b = 1, a = 2);");
        assert_eq!(
            rewrite("f(b = 1, A = 2, a = 3, _z = 4);"),
            "var _z, a, A, b;\nf(b = 1, A = 2, a = 3, _z = 4);"
        );
    }

    #[test]
    fn test_function_scopes_own_their_names() {
        assert_eq!(
            rewrite("function f() {\n  x = 1;\n}\nfunction g() {\n  x = 2;\n}"),
            "function f() {\n  var x = 1;\n}\nfunction g() {\n  var x = 2;\n}"
        );
    }

    #[test]
    fn test_syntax_errors_are_refused() {
        assert!(matches!(add_variable_declarations("a = ;"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_stats_and_map() {
        let transformed = Transformer::new(Options {
            file_name: Some("out.js".to_string()),
            source_name: "in.js".to_string(),
            include_source_content: false,
        })
        .transform("a = 1;\nf(b = 2);\n")
        .unwrap();

        assert!(transformed.is_changed());
        assert_eq!(transformed.stats.inlined, vec!["a"]);
        assert_eq!(transformed.stats.hoisted, vec!["b"]);
        assert_eq!(transformed.map.file.as_deref(), Some("out.js"));
        assert_eq!(transformed.map.sources, vec!["in.js".to_string()]);
    }

    #[test]
    fn test_static_block_does_not_own_names() {
        assert_eq!(
            rewrite("class A { static { x = 1; } }\nx;\n"),
            "var x;\nclass A { static { x = 1; } }\nx;\n"
        );
        assert_eq!(
            rewrite("class A { static { var x; x = 1; } }\n"),
            "class A { static { var x; x = 1; } }\n"
        );
    }

    #[test]
    fn test_unchanged_source() {
        let transformed = add_variable_declarations("const a = 1;\n").unwrap();
        assert!(!transformed.is_changed());
        assert_eq!(transformed.code, "const a = 1;\n");
    }
}
