//! Closed classification of the tree-sitter node kinds this crate consumes.
//!
//! Every traversal dispatches on [`NodeKind`] with exhaustive matches, so a
//! kind that needs handling cannot silently fall through a string compare.

use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Scope-introducing nodes
    Program,
    FunctionDeclaration,
    FunctionExpression,
    ArrowFunction,
    Method,
    StaticBlock,
    ClassDeclaration,
    ClassExpression,
    StatementBlock,
    ForStatement,
    /// `for (x in y)` and `for (x of y)` share one node kind
    ForEachStatement,
    /// `while` and `do ... while`
    LoopStatement,
    SwitchStatement,
    CatchClause,

    // Names
    Identifier,
    /// Property names, labels, shorthand properties and private names
    PropertyIdentifier,
    /// `a` in `({ a } = obj)`
    ShorthandPatternIdentifier,

    // Destructuring
    ObjectPattern,
    ArrayPattern,
    PairPattern,
    RestPattern,
    /// `x = 1` inside a pattern
    DefaultPattern,

    // Expressions and statements the rewrite looks at
    Assignment,
    CompoundAssignment,
    Sequence,
    Parenthesized,
    ExpressionStatement,
    VariableDeclaration,
    LexicalDeclaration,
    VariableDeclarator,
    FormalParameters,
    ImportStatement,
    ImportSpecifier,
    String,
    Comment,
    HashBang,

    // Tokens
    OpenParen,
    CloseParen,

    Other,
}

impl NodeKind {
    pub fn of(node: &Node<'_>) -> Self {
        Self::from_kind(node.kind())
    }

    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "program" => NodeKind::Program,
            "function_declaration" | "generator_function_declaration" => {
                NodeKind::FunctionDeclaration
            }
            "function_expression" | "function" | "generator_function" => {
                NodeKind::FunctionExpression
            }
            "arrow_function" => NodeKind::ArrowFunction,
            "method_definition" => NodeKind::Method,
            "class_static_block" => NodeKind::StaticBlock,
            "class_declaration" => NodeKind::ClassDeclaration,
            "class" => NodeKind::ClassExpression,
            "statement_block" => NodeKind::StatementBlock,
            "for_statement" => NodeKind::ForStatement,
            "for_in_statement" => NodeKind::ForEachStatement,
            "while_statement" | "do_statement" => NodeKind::LoopStatement,
            "switch_statement" => NodeKind::SwitchStatement,
            "catch_clause" => NodeKind::CatchClause,

            "identifier" => NodeKind::Identifier,
            "property_identifier"
            | "shorthand_property_identifier"
            | "statement_identifier"
            | "private_property_identifier" => NodeKind::PropertyIdentifier,
            "shorthand_property_identifier_pattern" => NodeKind::ShorthandPatternIdentifier,

            "object_pattern" => NodeKind::ObjectPattern,
            "array_pattern" => NodeKind::ArrayPattern,
            "pair_pattern" => NodeKind::PairPattern,
            "rest_pattern" => NodeKind::RestPattern,
            "assignment_pattern" | "object_assignment_pattern" => NodeKind::DefaultPattern,

            "assignment_expression" => NodeKind::Assignment,
            "augmented_assignment_expression" => NodeKind::CompoundAssignment,
            "sequence_expression" => NodeKind::Sequence,
            "parenthesized_expression" => NodeKind::Parenthesized,
            "expression_statement" => NodeKind::ExpressionStatement,
            "variable_declaration" => NodeKind::VariableDeclaration,
            "lexical_declaration" => NodeKind::LexicalDeclaration,
            "variable_declarator" => NodeKind::VariableDeclarator,
            "formal_parameters" => NodeKind::FormalParameters,
            "import_statement" => NodeKind::ImportStatement,
            "import_specifier" => NodeKind::ImportSpecifier,
            "string" => NodeKind::String,
            "comment" => NodeKind::Comment,
            "hash_bang_line" => NodeKind::HashBang,

            "(" => NodeKind::OpenParen,
            ")" => NodeKind::CloseParen,

            _ => NodeKind::Other,
        }
    }

    /// Functions, arrows, methods and static blocks: the scopes that own
    /// `var` declarations.
    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDeclaration
                | NodeKind::FunctionExpression
                | NodeKind::ArrowFunction
                | NodeKind::Method
                | NodeKind::StaticBlock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_kinds() {
        assert_eq!(NodeKind::from_kind("function_expression"), NodeKind::FunctionExpression);
        assert_eq!(NodeKind::from_kind("function"), NodeKind::FunctionExpression);
        assert!(NodeKind::from_kind("arrow_function").is_function_like());
        assert!(NodeKind::from_kind("class_static_block").is_function_like());
        assert!(!NodeKind::from_kind("statement_block").is_function_like());
    }

    #[test]
    fn test_compound_assignment_is_distinct() {
        assert_eq!(NodeKind::from_kind("assignment_expression"), NodeKind::Assignment);
        assert_eq!(
            NodeKind::from_kind("augmented_assignment_expression"),
            NodeKind::CompoundAssignment
        );
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(NodeKind::from_kind("jsx_element"), NodeKind::Other);
    }
}
