//! Lexical scopes
//!
//! A declaration pre-pass builds a [`ScopeTree`] for a parsed file; the
//! rewrite then consults it for names that are already declared.

pub mod builder;
pub mod graph;

pub use builder::build_scope_tree;
pub use graph::{ScopeId, ScopeKind, ScopeTree};
