//! Parsing JavaScript with tree-sitter

use crate::{Error, Result};
use super::tokens::{self, Token};
use tree_sitter::{Node, Parser, Tree};

/// Source text together with its syntax tree and token stream
pub struct ParsedSource<'s> {
    source: &'s str,
    tree: Tree,
    tokens: Vec<Token>,
}

impl<'s> ParsedSource<'s> {
    /// Parse a JavaScript (or JSX) source file.
    ///
    /// tree-sitter recovers from syntax errors, but rewriting a tree that
    /// contains error nodes could change what the program means, so any
    /// error is reported instead.
    pub fn parse(source: &'s str) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_javascript::LANGUAGE.into())?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Error::Parse("parser produced no tree".to_string()))?;

        if tree.root_node().has_error() {
            let location = first_error(tree.root_node())
                .map(|node| {
                    let position = node.start_position();
                    format!("{}:{}", position.row + 1, position.column + 1)
                })
                .unwrap_or_else(|| "unknown location".to_string());
            return Err(Error::Parse(format!("syntax error at {}", location)));
        }

        let tokens = tokens::tokenize(tree.root_node());
        tracing::trace!(bytes = source.len(), tokens = tokens.len(), "parsed source");

        Ok(Self { source, tree, tokens })
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Depth-first search for the first error or missing node
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
