//! Flat token stream
//!
//! The leaves of the syntax tree in source order. Only parentheses matter
//! to the rewrite, so every other token collapses to [`TokenKind::Other`];
//! comments are kept as tokens so they break paren adjacency.

use super::{NodeKind, Span};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    Comment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self { kind, span: Span::new(start, end) }
    }
}

pub fn tokenize(root: Node<'_>) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        let kind = NodeKind::of(&node);
        let is_leaf = node.child_count() == 0 || kind == NodeKind::Comment;

        if is_leaf {
            let span = Span::of(&node);
            if !span.is_empty() {
                let token_kind = match kind {
                    NodeKind::OpenParen => TokenKind::OpenParen,
                    NodeKind::CloseParen => TokenKind::CloseParen,
                    NodeKind::Comment => TokenKind::Comment,
                    _ => TokenKind::Other,
                };
                tokens.push(Token { kind: token_kind, span });
            }
        } else if cursor.goto_first_child() {
            continue;
        }

        // Move to the next sibling, climbing until one exists
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return tokens;
            }
        }
    }
}

/// Index of the first token starting at or after `offset`
pub fn first_at_or_after(tokens: &[Token], offset: usize) -> usize {
    tokens.partition_point(|token| token.span.start < offset)
}
