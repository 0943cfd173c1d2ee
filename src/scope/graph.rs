//! Lexical scope tree
//!
//! The scope tree tracks:
//! - Scope hierarchy (parent links up to the program root)
//! - Names declared in each scope before the rewrite runs
//! - Which syntax node introduces each scope
//! - Where a declaration could be inserted at the top of each scope

use std::collections::{HashMap, HashSet};

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The program scope
    pub fn root() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// The kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Program (file) level scope
    Program,
    /// Function, arrow or method
    Function,
    /// Class static block, holds its own `var` declarations
    StaticBlock,
    /// Class body, holds the name of a class expression
    Class,
    /// Block scope (statement blocks, loops, switch, catch)
    Block,
}

impl ScopeKind {
    /// Program and function scopes own `var` declarations
    pub fn owns_bindings(self) -> bool {
        matches!(self, ScopeKind::Program | ScopeKind::Function)
    }

    /// Scopes that existing `var` declarations are attached to
    pub fn is_var_scope(self) -> bool {
        matches!(
            self,
            ScopeKind::Program | ScopeKind::Function | ScopeKind::StaticBlock
        )
    }
}

/// Scope tree for one parsed source file
#[derive(Debug, Default)]
pub struct ScopeTree {
    /// Next scope ID to assign
    next_id: u32,
    /// Scope hierarchy (child → parent)
    parents: HashMap<ScopeId, ScopeId>,
    /// Scope kind
    kinds: HashMap<ScopeId, ScopeKind>,
    /// Declared names per scope
    declarations: HashSet<(ScopeId, String)>,
    /// Syntax node id → scope it introduces
    nodes: HashMap<usize, ScopeId>,
    /// Byte offset of the first statement of a scope's body, when it has one
    first_statements: HashMap<ScopeId, usize>,
}

impl ScopeTree {
    /// Create a new scope tree with a root program scope
    pub fn new() -> Self {
        let mut tree = Self::default();
        tree.kinds.insert(ScopeId::root(), ScopeKind::Program);
        tree.next_id = 1;
        tree
    }

    /// Create a new child scope
    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        self.parents.insert(id, parent);
        self.kinds.insert(id, kind);
        id
    }

    /// Record that a syntax node introduces a scope
    pub fn bind_node(&mut self, node_id: usize, scope: ScopeId) {
        self.nodes.insert(node_id, scope);
    }

    /// The scope introduced by a syntax node, if it introduces one
    pub fn scope_for_node(&self, node_id: usize) -> Option<ScopeId> {
        self.nodes.get(&node_id).copied()
    }

    /// Add a declared name to a scope
    pub fn add_declaration(&mut self, scope: ScopeId, name: impl Into<String>) {
        self.declarations.insert((scope, name.into()));
    }

    pub fn set_first_statement(&mut self, scope: ScopeId, offset: usize) {
        self.first_statements.insert(scope, offset);
    }

    pub fn first_statement(&self, scope: ScopeId) -> Option<usize> {
        self.first_statements.get(&scope).copied()
    }

    /// Get the parent of a scope
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.parents.get(&scope).copied()
    }

    /// Get the kind of a scope
    pub fn kind(&self, scope: ScopeId) -> Option<ScopeKind> {
        self.kinds.get(&scope).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Whether a name is declared directly in a scope (not walking parents)
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> bool {
        self.declarations.contains(&(scope, name.to_string()))
    }

    /// Find the scope declaring a name, walking up the scope chain
    pub fn get_binding(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        self.scope_chain(scope)
            .into_iter()
            .find(|s| self.lookup_local(*s, name))
    }

    /// Get scope chain from a scope up to root
    pub fn scope_chain(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Nearest scope, starting at `scope` itself, that holds `var` declarations
    pub fn var_scope(&self, scope: ScopeId) -> ScopeId {
        self.scope_chain(scope)
            .into_iter()
            .find(|s| self.kind(*s).is_some_and(ScopeKind::is_var_scope))
            .unwrap_or_else(ScopeId::root)
    }

    /// Whether `ancestor` is `scope` or one of its parents
    pub fn is_ancestor(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        self.scope_chain(scope).contains(&ancestor)
    }

    /// Innermost scope containing both `a` and `b`
    pub fn lowest_common_ancestor(&self, a: ScopeId, b: ScopeId) -> ScopeId {
        let chain_of_b = self.scope_chain(b);
        self.scope_chain(a)
            .into_iter()
            .find(|s| chain_of_b.contains(s))
            .unwrap_or_else(ScopeId::root)
    }

    /// Offset where a declaration for `scope` should be inserted: the first
    /// statement of the nearest scope, walking outward, that has one.
    pub fn insertion_point(&self, scope: ScopeId) -> Option<usize> {
        self.scope_chain(scope)
            .into_iter()
            .find_map(|s| self.first_statement(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_hierarchy() {
        let mut tree = ScopeTree::new();

        let function_scope = tree.add_scope(ScopeId::root(), ScopeKind::Function);
        let block_scope = tree.add_scope(function_scope, ScopeKind::Block);

        assert_eq!(tree.parent(block_scope), Some(function_scope));
        assert_eq!(tree.parent(function_scope), Some(ScopeId::root()));
        assert_eq!(tree.parent(ScopeId::root()), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_declaration_lookup() {
        let mut tree = ScopeTree::new();

        let function_scope = tree.add_scope(ScopeId::root(), ScopeKind::Function);
        let block_scope = tree.add_scope(function_scope, ScopeKind::Block);

        tree.add_declaration(ScopeId::root(), "global_value");
        tree.add_declaration(function_scope, "local");

        assert!(tree.lookup_local(function_scope, "local"));
        assert!(!tree.lookup_local(function_scope, "global_value"));

        assert_eq!(tree.get_binding(block_scope, "local"), Some(function_scope));
        assert_eq!(tree.get_binding(block_scope, "global_value"), Some(ScopeId::root()));
        assert_eq!(tree.get_binding(ScopeId::root(), "local"), None);
    }

    #[test]
    fn test_scope_chain() {
        let mut tree = ScopeTree::new();

        let s1 = tree.add_scope(ScopeId::root(), ScopeKind::Class);
        let s2 = tree.add_scope(s1, ScopeKind::Function);
        let s3 = tree.add_scope(s2, ScopeKind::Block);

        let chain = tree.scope_chain(s3);
        assert_eq!(chain, vec![s3, s2, s1, ScopeId::root()]);
        assert_eq!(tree.var_scope(s3), s2);
        assert_eq!(tree.var_scope(s1), ScopeId::root());
    }

    #[test]
    fn test_lowest_common_ancestor() {
        let mut tree = ScopeTree::new();

        let f = tree.add_scope(ScopeId::root(), ScopeKind::Function);
        let left = tree.add_scope(f, ScopeKind::Block);
        let right = tree.add_scope(f, ScopeKind::Block);
        let nested = tree.add_scope(left, ScopeKind::Block);

        assert_eq!(tree.lowest_common_ancestor(nested, right), f);
        assert_eq!(tree.lowest_common_ancestor(left, nested), left);
        assert_eq!(tree.lowest_common_ancestor(f, f), f);
        assert!(tree.is_ancestor(f, nested));
        assert!(!tree.is_ancestor(right, nested));
    }

    #[test]
    fn test_insertion_point_walks_outward() {
        let mut tree = ScopeTree::new();
        tree.set_first_statement(ScopeId::root(), 0);

        let arrow = tree.add_scope(ScopeId::root(), ScopeKind::Function);
        let f = tree.add_scope(ScopeId::root(), ScopeKind::Function);
        tree.set_first_statement(f, 15);

        assert_eq!(tree.insertion_point(arrow), Some(0));
        assert_eq!(tree.insertion_point(f), Some(15));
    }

    #[test]
    fn test_static_block_holds_var_but_not_bindings() {
        let mut tree = ScopeTree::new();

        let class = tree.add_scope(ScopeId::root(), ScopeKind::Class);
        let static_block = tree.add_scope(class, ScopeKind::StaticBlock);
        let inner = tree.add_scope(static_block, ScopeKind::Block);

        assert_eq!(tree.var_scope(inner), static_block);
        assert!(!ScopeKind::StaticBlock.owns_bindings());
        assert!(ScopeKind::Function.is_var_scope());
        assert!(!ScopeKind::Block.is_var_scope());
    }

    #[test]
    fn test_node_binding() {
        let mut tree = ScopeTree::new();
        let block = tree.add_scope(ScopeId::root(), ScopeKind::Block);
        tree.bind_node(42, block);

        assert_eq!(tree.scope_for_node(42), Some(block));
        assert_eq!(tree.scope_for_node(7), None);
    }
}
