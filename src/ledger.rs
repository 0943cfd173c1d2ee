//! Scope Ledger
//!
//! One ledger per lexical scope entered during the rewrite, kept in an arena
//! and addressed by [`LedgerId`]. The ledgers that are live at any moment
//! form the path from the program root to the node being visited; that path
//! is the explicit stack inside [`LedgerStack`].
//!
//! Only program and function scopes own bindings. A block ledger forwards
//! ownership to its nearest owning ancestor, but its scope can still become
//! a binding's most specific scope.
//!
//! ```text
//!   function f() {          // owner of x
//!     { x = 1; }            // x proposed here, inline candidate
//!     if (c) { x; }         // x widened to f, candidate dropped
//!   }
//! ```

use std::collections::{HashMap, HashSet};

use crate::pattern::Identifier;
use crate::scope::{ScopeId, ScopeTree};
use crate::syntax::Span;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub usize);

/// A proposed declaration for one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Ledger that will emit the declaration
    pub owner: LedgerId,
    /// Scope of the site that proposed the binding
    pub original_scope: ScopeId,
    /// Innermost scope containing every site seen so far for this name
    pub most_specific_scope: ScopeId,
    /// Cleared for good the first time the binding widens
    pub in_original_position: bool,
}

impl Binding {
    fn new(name: impl Into<String>, owner: LedgerId, scope: ScopeId) -> Self {
        Self {
            name: name.into(),
            owner,
            original_scope: scope,
            most_specific_scope: scope,
            in_original_position: true,
        }
    }

    /// Widen to cover a site observed in `observed`. Returns whether the
    /// most specific scope moved.
    fn widen(&mut self, observed: ScopeId, scopes: &ScopeTree) -> bool {
        if scopes.is_ancestor(self.most_specific_scope, observed) {
            return false;
        }
        self.most_specific_scope = scopes.lowest_common_ancestor(self.most_specific_scope, observed);
        self.in_original_position = false;
        true
    }
}

/// A group of bindings that may be declared by inserting the keyword at one
/// site, all or nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineCandidate {
    /// Node the keyword goes in front of
    pub anchor: Span,
    pub bindings: Vec<BindingId>,
    /// How many leading bindings the keyword declares. The rest belong to
    /// the group for atomicity but still need a hoisted declaration.
    pub declared: usize,
    /// Identifier targets whose wrapping parentheses must go
    pub targets: Vec<Span>,
    /// Remove parentheses wrapping the anchor itself
    pub strip_parens: bool,
}

/// Outcome of looking a name up from a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Declared in the source; never redeclared
    Bound,
    /// Already proposed during this pass
    Claimed(BindingId),
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Active,
    /// Below a substituted ancestor while a method key is visited
    Suspended,
    Committed,
}

#[derive(Debug)]
pub struct Ledger {
    pub scope: ScopeId,
    pub parent: Option<LedgerId>,
    pub owns_bindings: bool,
    pub state: LedgerState,
    bindings: HashMap<String, BindingId>,
    /// Owned bindings in creation order
    pub order: Vec<BindingId>,
    pub candidates: Vec<InlineCandidate>,
}

impl Ledger {
    fn new(scope: ScopeId, parent: Option<LedgerId>, owns_bindings: bool) -> Self {
        Self {
            scope,
            parent,
            owns_bindings,
            state: LedgerState::Active,
            bindings: HashMap::new(),
            order: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn owned(&self, name: &str) -> Option<BindingId> {
        self.bindings.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    ledger: LedgerId,
    /// Pushed by the method key exception rather than by a scope entry
    substitute: bool,
}

/// Arena of ledgers plus the stack of the live ones
#[derive(Debug)]
pub struct LedgerStack<'s> {
    scopes: &'s ScopeTree,
    ledgers: Vec<Ledger>,
    bindings: Vec<Binding>,
    stack: Vec<Frame>,
}

impl<'s> LedgerStack<'s> {
    /// Create the stack with the program ledger already active
    pub fn new(scopes: &'s ScopeTree) -> Self {
        let root = Ledger::new(ScopeId::root(), None, true);
        Self {
            scopes,
            ledgers: vec![root],
            bindings: Vec::new(),
            stack: vec![Frame { ledger: LedgerId(0), substitute: false }],
        }
    }

    pub fn root() -> LedgerId {
        LedgerId(0)
    }

    pub fn scopes(&self) -> &'s ScopeTree {
        self.scopes
    }

    pub fn ledger(&self, id: LedgerId) -> &Ledger {
        &self.ledgers[id.0]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Ledger on top of the stack
    pub fn current(&self) -> Result<LedgerId> {
        self.stack
            .last()
            .map(|frame| frame.ledger)
            .ok_or_else(|| Error::Invariant("no active scope ledger".to_string()))
    }

    /// Push a ledger for a newly entered scope
    pub fn enter(&mut self, scope: ScopeId) -> Result<LedgerId> {
        let parent = self.current()?;
        let owns_bindings = self.scopes.kind(scope).is_some_and(|kind| kind.owns_bindings());
        let id = LedgerId(self.ledgers.len());
        self.ledgers.push(Ledger::new(scope, Some(parent), owns_bindings));
        self.stack.push(Frame { ledger: id, substitute: false });
        tracing::trace!(ledger = id.0, %scope, owns_bindings, "entered scope");
        Ok(id)
    }

    /// Pop the active ledger after it has been committed
    pub fn exit(&mut self) -> Result<LedgerId> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::Invariant("scope exit with no active ledger".to_string()))?;
        if frame.substitute {
            return Err(Error::Invariant(
                "scope exit while a method key is being visited".to_string(),
            ));
        }
        let ledger = &mut self.ledgers[frame.ledger.0];
        if ledger.state != LedgerState::Active {
            return Err(Error::Invariant(format!(
                "scope exit on a ledger in state {:?}",
                ledger.state
            )));
        }
        ledger.state = LedgerState::Committed;
        tracing::trace!(ledger = frame.ledger.0, "exited scope");
        Ok(frame.ledger)
    }

    /// Make the parent of the active ledger act as the top while a method
    /// key is visited
    pub fn suspend_for_key(&mut self) -> Result<()> {
        let current = self.current()?;
        let parent = self.ledgers[current.0].parent.ok_or_else(|| {
            Error::Invariant("method key visited without an enclosing ledger".to_string())
        })?;
        self.ledgers[current.0].state = LedgerState::Suspended;
        self.stack.push(Frame { ledger: parent, substitute: true });
        Ok(())
    }

    /// Undo [`suspend_for_key`](Self::suspend_for_key)
    pub fn resume_after_key(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(frame) if frame.substitute => {}
            _ => {
                return Err(Error::Invariant(
                    "method key finished without a substitute ledger".to_string(),
                ));
            }
        }
        let current = self.current()?;
        let ledger = &mut self.ledgers[current.0];
        if ledger.state != LedgerState::Suspended {
            return Err(Error::Invariant(format!(
                "resumed a ledger in state {:?}",
                ledger.state
            )));
        }
        ledger.state = LedgerState::Active;
        Ok(())
    }

    /// Look a name up from the active ledger: declarations in the source
    /// first, then claims made by this ledger and its ancestors.
    pub fn resolve(&self, name: &str) -> Result<Resolution> {
        let current = self.current()?;
        if self.scopes.get_binding(self.ledgers[current.0].scope, name).is_some() {
            return Ok(Resolution::Bound);
        }
        let mut ledger = Some(current);
        while let Some(id) = ledger {
            let record = &self.ledgers[id.0];
            if let Some(binding) = record.owned(name) {
                return Ok(Resolution::Claimed(binding));
            }
            ledger = record.parent;
        }
        Ok(Resolution::Free)
    }

    /// Nearest ledger, starting at `id`, that owns bindings
    pub fn owner_of(&self, id: LedgerId) -> Result<LedgerId> {
        let mut ledger = Some(id);
        while let Some(current) = ledger {
            let record = &self.ledgers[current.0];
            if record.owns_bindings {
                return Ok(current);
            }
            ledger = record.parent;
        }
        Err(Error::Invariant(format!(
            "ledger {} has no owning ancestor",
            id.0
        )))
    }

    /// Propose a hoisted declaration for `name` at the active scope
    pub fn add_binding(&mut self, name: &str) -> Result<()> {
        match self.resolve(name)? {
            Resolution::Free => {
                self.create_binding(name)?;
            }
            Resolution::Claimed(binding) => self.widen(binding)?,
            Resolution::Bound => {}
        }
        Ok(())
    }

    /// Propose declaring `identifiers` by inserting the keyword before
    /// `anchor`. The first `declared` identifiers are the ones the keyword
    /// declares. Returns whether a candidate was registered; otherwise every
    /// name went through [`add_binding`](Self::add_binding).
    pub fn add_inline_binding(
        &mut self,
        anchor: Span,
        identifiers: &[Identifier],
        declared: usize,
        strip_parens: bool,
    ) -> Result<bool> {
        if identifiers.is_empty() {
            return Ok(false);
        }

        let mut distinct = HashSet::new();
        let mut eligible = identifiers
            .iter()
            .all(|identifier| distinct.insert(identifier.name.as_str()));
        for identifier in identifiers {
            if !eligible {
                break;
            }
            eligible = self.resolve(&identifier.name)? == Resolution::Free;
        }

        if !eligible {
            for identifier in identifiers {
                self.add_binding(&identifier.name)?;
            }
            return Ok(false);
        }

        let mut bindings = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            bindings.push(self.create_binding(&identifier.name)?);
        }
        let declared = declared.min(identifiers.len());
        let candidate = InlineCandidate {
            anchor,
            bindings,
            declared,
            targets: identifiers[..declared].iter().map(|identifier| identifier.span).collect(),
            strip_parens,
        };

        let owner = self.owner_of(self.current()?)?;
        tracing::debug!(
            anchor = %candidate.anchor,
            names = ?identifiers.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            "inline candidate"
        );
        self.ledgers[owner.0].candidates.push(candidate);
        Ok(true)
    }

    /// Note a use of `name` at the active scope
    pub fn observe_reference(&mut self, name: &str) -> Result<()> {
        if let Resolution::Claimed(binding) = self.resolve(name)? {
            self.widen(binding)?;
        }
        Ok(())
    }

    fn create_binding(&mut self, name: &str) -> Result<BindingId> {
        let current = self.current()?;
        let owner = self.owner_of(current)?;
        if self.ledgers[owner.0].owned(name).is_some() {
            return Err(Error::Invariant(format!(
                "binding for `{}` already exists in ledger {}",
                name, owner.0
            )));
        }

        let scope = self.ledgers[current.0].scope;
        let id = BindingId(self.bindings.len());
        self.bindings.push(Binding::new(name, owner, scope));

        let ledger = &mut self.ledgers[owner.0];
        ledger.bindings.insert(name.to_string(), id);
        ledger.order.push(id);
        tracing::debug!(name, %scope, owner = owner.0, "new binding");
        Ok(id)
    }

    fn widen(&mut self, binding: BindingId) -> Result<()> {
        let observed = self.ledgers[self.current()?.0].scope;
        let record = &mut self.bindings[binding.0];
        if record.widen(observed, self.scopes) {
            tracing::debug!(
                name = %record.name,
                scope = %record.most_specific_scope,
                "widened binding"
            );
        }
        Ok(())
    }
}
