//! Syntax layer
//!
//! Thin wrapper over the tree-sitter JavaScript grammar. The rest of the
//! crate only consumes byte spans, [`NodeKind`] classifications and the
//! flat token stream produced here.

pub mod kind;
pub mod parser;
pub mod tokens;

pub use kind::NodeKind;
pub use parser::ParsedSource;
pub use tokens::{Token, TokenKind};

use tree_sitter::Node;

/// Half-open byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covered by a syntax node
    pub fn of(node: &Node<'_>) -> Self {
        Self::new(node.start_byte(), node.end_byte())
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Source text of a node. Node boundaries always fall on char boundaries.
pub fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Named children of a node, without comments
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| NodeKind::of(child) != NodeKind::Comment)
        .collect()
}
