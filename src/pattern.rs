//! Pattern Destructurer
//!
//! Flattens the target of an assignment or loop binding into the simple
//! names it binds, and reports whether any part of the target is something
//! other than a name (a property, a computed member, a call...). Such
//! targets can still get hoisted declarations for the names they do bind,
//! but never an inline `var`.
//!
//! ```text
//!   a = 1;                         // [a]
//!   ({ b, c } = {});               // [b, c]
//!   [d, e] = [];                   // [d, e]
//!   ({ f: g, h: [i, j] } = {});    // [g, i, j]
//!   [k.l, ...m] = [];              // [m], has a non-identifier target
//! ```

use crate::syntax::{self, NodeKind, Span};
use tree_sitter::Node;

/// A bound name and where it appears
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Target of an assignment, lowered from the syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Identifier(Identifier),
    /// Property values of an object pattern, in source order
    Object(Vec<Pattern>),
    /// Elements of an array pattern; `None` is an elision hole
    Array(Vec<Option<Pattern>>),
    Rest(Box<Pattern>),
    /// `x = default`; only the left side binds
    Default(Box<Pattern>),
    /// Member expressions and anything else that is not a binding target
    Unsupported(Span),
}

impl Pattern {
    /// Lower a target node. Parentheses around a target are transparent.
    pub fn from_node(node: Node<'_>, source: &str) -> Self {
        match NodeKind::of(&node) {
            NodeKind::Identifier | NodeKind::ShorthandPatternIdentifier => {
                Pattern::Identifier(Identifier::new(syntax::node_text(&node, source), Span::of(&node)))
            }
            NodeKind::ObjectPattern => Pattern::Object(
                syntax::named_children(&node)
                    .into_iter()
                    .map(|property| Pattern::from_node(property, source))
                    .collect(),
            ),
            NodeKind::ArrayPattern => Pattern::Array(
                syntax::named_children(&node)
                    .into_iter()
                    .map(|element| Some(Pattern::from_node(element, source)))
                    .collect(),
            ),
            NodeKind::PairPattern => match node.child_by_field_name("value") {
                Some(value) => Pattern::from_node(value, source),
                None => Pattern::Unsupported(Span::of(&node)),
            },
            NodeKind::RestPattern => match syntax::named_children(&node).first() {
                Some(argument) => Pattern::Rest(Box::new(Pattern::from_node(*argument, source))),
                None => Pattern::Unsupported(Span::of(&node)),
            },
            NodeKind::DefaultPattern => match node.child_by_field_name("left") {
                Some(left) => Pattern::Default(Box::new(Pattern::from_node(left, source))),
                None => Pattern::Unsupported(Span::of(&node)),
            },
            NodeKind::Parenthesized => match syntax::named_children(&node).as_slice() {
                [inner] => Pattern::from_node(*inner, source),
                _ => Pattern::Unsupported(Span::of(&node)),
            },
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
            | NodeKind::ForEachStatement
            | NodeKind::LoopStatement
            | NodeKind::SwitchStatement
            | NodeKind::CatchClause
            | NodeKind::PropertyIdentifier
            | NodeKind::Assignment
            | NodeKind::CompoundAssignment
            | NodeKind::Sequence
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
            | NodeKind::Other => Pattern::Unsupported(Span::of(&node)),
        }
    }

    /// Bound identifiers in left-to-right order, duplicates preserved
    pub fn identifiers(&self) -> Vec<&Identifier> {
        let mut found = Vec::new();
        self.collect_identifiers(&mut found);
        found
    }

    fn collect_identifiers<'p>(&'p self, found: &mut Vec<&'p Identifier>) {
        match self {
            Pattern::Identifier(identifier) => found.push(identifier),
            Pattern::Object(properties) => {
                for property in properties {
                    property.collect_identifiers(found);
                }
            }
            Pattern::Array(elements) => {
                for element in elements.iter().flatten() {
                    element.collect_identifiers(found);
                }
            }
            Pattern::Rest(argument) => argument.collect_identifiers(found),
            Pattern::Default(left) => left.collect_identifiers(found),
            Pattern::Unsupported(_) => {}
        }
    }

    pub fn names(&self) -> Vec<String> {
        names_of(self)
    }

    pub fn has_non_identifier_target(&self) -> bool {
        has_non_identifier_target(self)
    }
}

/// Names bound by a pattern, in textual order
pub fn names_of(pattern: &Pattern) -> Vec<String> {
    pattern
        .identifiers()
        .into_iter()
        .map(|identifier| identifier.name.clone())
        .collect()
}

/// Whether any part of the pattern assigns to something other than a name.
///
/// A rest element must bind a bare name to qualify for an inline
/// declaration, even though nested destructuring under a rest is legal.
pub fn has_non_identifier_target(pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Identifier(_) => false,
        Pattern::Object(properties) => properties.iter().any(has_non_identifier_target),
        Pattern::Array(elements) => elements.iter().flatten().any(has_non_identifier_target),
        Pattern::Rest(argument) => !matches!(argument.as_ref(), Pattern::Identifier(_)),
        Pattern::Default(left) => has_non_identifier_target(left),
        Pattern::Unsupported(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ParsedSource;

    fn ident(name: &str, start: usize) -> Pattern {
        Pattern::Identifier(Identifier::new(name, Span::new(start, start + name.len())))
    }

    /// Lower the left side of the first assignment in `source`
    fn lhs(source: &str) -> Pattern {
        let parsed = ParsedSource::parse(source).expect("source should parse");
        let mut stack = vec![parsed.root()];
        while let Some(node) = stack.pop() {
            if NodeKind::of(&node) == NodeKind::Assignment {
                let left = node.child_by_field_name("left").expect("assignment has a left side");
                return Pattern::from_node(left, source);
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        panic!("no assignment in {source}");
    }

    #[test]
    fn test_identifier() {
        let pattern = ident("a", 0);
        assert_eq!(names_of(&pattern), vec!["a"]);
        assert!(!has_non_identifier_target(&pattern));
    }

    #[test]
    fn test_nested_patterns_keep_order_and_duplicates() {
        let pattern = Pattern::Object(vec![
            ident("g", 5),
            Pattern::Array(vec![Some(ident("i", 12)), None, Some(ident("g", 18))]),
            Pattern::Rest(Box::new(ident("rest", 25))),
        ]);
        assert_eq!(names_of(&pattern), vec!["g", "i", "g", "rest"]);
        assert!(!has_non_identifier_target(&pattern));
    }

    #[test]
    fn test_default_ignores_right_side() {
        let pattern = Pattern::Default(Box::new(ident("x", 0)));
        assert_eq!(names_of(&pattern), vec!["x"]);
        assert!(!has_non_identifier_target(&pattern));
    }

    #[test]
    fn test_member_target_disqualifies() {
        let pattern = Pattern::Array(vec![
            Some(Pattern::Unsupported(Span::new(1, 4))),
            Some(Pattern::Rest(Box::new(ident("m", 9)))),
        ]);
        assert_eq!(names_of(&pattern), vec!["m"]);
        assert!(has_non_identifier_target(&pattern));
    }

    #[test]
    fn test_rest_of_pattern_disqualifies() {
        let pattern = Pattern::Array(vec![Some(Pattern::Rest(Box::new(Pattern::Array(vec![
            Some(ident("a", 5)),
        ]))))]);
        assert_eq!(names_of(&pattern), vec!["a"]);
        assert!(has_non_identifier_target(&pattern));
    }

    #[test]
    fn test_lowering_object_pattern() {
        let pattern = lhs("({ f: g, h: [i, j], k = 1, ...rest } = {});");
        assert_eq!(names_of(&pattern), vec!["g", "i", "j", "k", "rest"]);
        assert!(!has_non_identifier_target(&pattern));
    }

    #[test]
    fn test_lowering_member_targets() {
        let pattern = lhs("[k.l, ...m] = [];");
        assert_eq!(names_of(&pattern), vec!["m"]);
        assert!(has_non_identifier_target(&pattern));

        assert!(lhs("a.b = 1;").has_non_identifier_target());
        assert!(lhs("a[0] = 1;").names().is_empty());
    }

    #[test]
    fn test_lowering_parenthesized_identifier() {
        let pattern = lhs("(a) = 1;");
        assert_eq!(pattern, ident("a", 1));
    }
}
