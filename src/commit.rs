//! Declaration Committer
//!
//! Turns the decisions recorded in one owning ledger into an ordered list of
//! edits once its scope has been fully visited. Nothing here looks at the
//! syntax tree: the inputs are the ledger, the token stream and the scope
//! tree's insertion points.
//!
//! Edit order matters for insertions that share an offset:
//! 1. parenthesis removals
//! 2. hoisted declarations, one per scope group
//! 3. keyword insertions for committed inline candidates
//!
//! so a hoisted group and an inline keyword at the same statement read
//! `var x;\nvar a = 1;`.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::edit::Edit;
use crate::ledger::{BindingId, LedgerId, LedgerStack};
use crate::scope::{ScopeId, ScopeTree};
use crate::syntax::tokens::{self, Token, TokenKind};
use crate::syntax::Span;
use crate::{Error, Result};

/// Keyword used for every inserted declaration
pub const DECLARATION_KEYWORD: &str = "var";

/// Read-only inputs the committer needs besides the ledger
#[derive(Debug, Clone, Copy)]
pub struct CommitContext<'a> {
    pub source: &'a str,
    pub tokens: &'a [Token],
    pub scopes: &'a ScopeTree,
}

/// Edits for one ledger, plus what they declare
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    pub edits: Vec<Edit>,
    /// Names declared by an inline keyword
    pub inlined: Vec<String>,
    /// Names declared by a hoisted statement
    pub hoisted: Vec<String>,
}

/// Plan the edits for a ledger's owned candidates and bindings
pub fn plan(ledgers: &LedgerStack<'_>, id: LedgerId, context: &CommitContext<'_>) -> Result<Plan> {
    let ledger = ledgers.ledger(id);
    let mut plan = Plan::default();
    let mut removals = Vec::new();
    let mut keywords = Vec::new();
    let mut declared: HashSet<BindingId> = HashSet::new();

    for candidate in &ledger.candidates {
        let intact = candidate
            .bindings
            .iter()
            .all(|binding| ledgers.binding(*binding).in_original_position);
        if !intact {
            tracing::debug!(anchor = %candidate.anchor, "inline candidate widened, hoisting instead");
            continue;
        }

        if candidate.strip_parens {
            removals.extend(paren_ranges(context.tokens, candidate.anchor));
        }
        for target in &candidate.targets {
            removals.extend(paren_ranges(context.tokens, *target));
        }
        keywords.push(Edit::insert(
            candidate.anchor.start,
            format!("{} ", DECLARATION_KEYWORD),
        ));
        for binding in candidate.bindings.iter().take(candidate.declared) {
            declared.insert(*binding);
            plan.inlined.push(ledgers.binding(*binding).name.clone());
        }
    }

    // Group the rest by final scope, in order of first creation
    let mut groups: Vec<(ScopeId, Vec<&str>)> = Vec::new();
    for binding_id in &ledger.order {
        if declared.contains(binding_id) {
            continue;
        }
        let binding = ledgers.binding(*binding_id);
        match groups
            .iter_mut()
            .find(|(scope, _)| *scope == binding.most_specific_scope)
        {
            Some((_, names)) => names.push(&binding.name),
            None => groups.push((binding.most_specific_scope, vec![&binding.name])),
        }
    }

    let mut hoisted = Vec::with_capacity(groups.len());
    for (scope, mut names) in groups {
        names.sort_by(|a, b| collate(a, b));
        let offset = context.scopes.insertion_point(scope).ok_or_else(|| {
            Error::Invariant(format!(
                "no statement to declare `{}` before in {}",
                names.join(", "),
                scope
            ))
        })?;
        tracing::debug!(%scope, offset, names = %names.join(", "), "hoisted declaration");
        hoisted.push(Edit::insert(offset, declaration_for_names(&names, context.source, offset)));
        plan.hoisted.extend(names.iter().map(|name| name.to_string()));
    }

    plan.edits.extend(removals.into_iter().map(Edit::Remove));
    plan.edits.extend(hoisted);
    plan.edits.extend(keywords);
    Ok(plan)
}

/// `var a, b;` followed by a newline and the indentation of the line the
/// declaration is inserted into
pub fn declaration_for_names(names: &[&str], source: &str, offset: usize) -> String {
    format!(
        "{} {};\n{}",
        DECLARATION_KEYWORD,
        names.join(", "),
        indent_at(source, offset)
    )
}

/// Dictionary order for identifiers: `_` then `$` then digits then letters,
/// letters compared case-insensitively with lowercase first on a tie
pub fn collate(a: &str, b: &str) -> Ordering {
    fn key(ch: char) -> (u8, char) {
        match ch {
            '_' => (0, ch),
            '$' => (1, ch),
            _ if ch.is_ascii_digit() => (2, ch),
            _ if ch.is_alphabetic() => (3, ch.to_lowercase().next().unwrap_or(ch)),
            _ => (4, ch),
        }
    }

    a.chars()
        .map(key)
        .cmp(b.chars().map(key))
        .then_with(|| a.chars().map(char::is_uppercase).cmp(b.chars().map(char::is_uppercase)))
        .then_with(|| a.cmp(b))
}

/// Leading spaces and tabs of the line containing `offset`
pub fn indent_at(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |index| index + 1);
    let line = &source[line_start..];
    let width = line
        .find(|ch: char| ch != ' ' && ch != '\t')
        .unwrap_or(line.len());
    &line[..width]
}

/// Balanced parentheses immediately wrapping `span`, as one range on each
/// side. Only as many layers as match on both sides are returned.
pub fn paren_ranges(tokens: &[Token], span: Span) -> Vec<Span> {
    let start = tokens::first_at_or_after(tokens, span.start);
    let end = tokens.partition_point(|token| token.span.end <= span.end);

    let opening = tokens[..start]
        .iter()
        .rev()
        .take_while(|token| token.kind == TokenKind::OpenParen)
        .count();
    let closing = tokens[end..]
        .iter()
        .take_while(|token| token.kind == TokenKind::CloseParen)
        .count();

    let layers = opening.min(closing);
    if layers == 0 {
        return Vec::new();
    }

    let open = &tokens[start - layers..start];
    let close = &tokens[end..end + layers];
    vec![
        Span::new(open[0].span.start, open[layers - 1].span.end),
        Span::new(close[0].span.start, close[layers - 1].span.end),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Identifier;
    use crate::scope::ScopeKind;
    use crate::syntax::ParsedSource;

    fn ident(name: &str, start: usize) -> Identifier {
        Identifier::new(name, Span::new(start, start + name.len()))
    }

    #[test]
    fn test_indent_at() {
        let source = "function f() {\n\t  x = 1;\n}";
        let offset = source.find("x =").unwrap();
        assert_eq!(indent_at(source, offset), "\t  ");
        assert_eq!(indent_at(source, 0), "");
    }

    #[test]
    fn test_declaration_text() {
        let source = "if (a) {\n    b(c = 1);\n}";
        let offset = source.find("b(").unwrap();
        assert_eq!(declaration_for_names(&["c", "d"], source, offset), "var c, d;\n    ");
    }

    #[test]
    fn test_paren_ranges() {
        let source = "((a)) = 1;";
        let parsed = ParsedSource::parse(source).unwrap();
        let ranges = paren_ranges(parsed.tokens(), Span::new(2, 3));
        assert_eq!(ranges, vec![Span::new(0, 2), Span::new(3, 5)]);

        // Nothing wraps the whole assignment
        assert!(paren_ranges(parsed.tokens(), Span::new(0, 9)).is_empty());
    }

    #[test]
    fn test_paren_ranges_keep_unbalanced_layers() {
        let source = "for ((i) = 0;;) {}";
        let parsed = ParsedSource::parse(source).unwrap();
        let i = source.find('i').unwrap();
        let ranges = paren_ranges(parsed.tokens(), Span::new(i, i + 1));
        assert_eq!(ranges, vec![Span::new(5, 6), Span::new(7, 8)]);
    }

    #[test]
    fn test_comments_break_adjacency() {
        let source = "(/* keep */ a) = 1;";
        let parsed = ParsedSource::parse(source).unwrap();
        let a = source.find(" a)").unwrap() + 1;
        assert!(paren_ranges(parsed.tokens(), Span::new(a, a + 1)).is_empty());
    }

    #[test]
    fn test_plan_orders_removals_hoists_keywords() {
        let source = "(a) = 1;";
        let parsed = ParsedSource::parse(source).unwrap();
        let mut scopes = ScopeTree::new();
        scopes.set_first_statement(ScopeId::root(), 0);

        let mut ledgers = LedgerStack::new(&scopes);
        ledgers
            .add_inline_binding(Span::new(0, 7), &[ident("a", 1)], 1, true)
            .unwrap();
        ledgers.add_binding("z").unwrap();

        let context = CommitContext {
            source,
            tokens: parsed.tokens(),
            scopes: &scopes,
        };
        let plan = plan(&ledgers, LedgerStack::root(), &context).unwrap();
        assert_eq!(
            plan.edits,
            vec![
                Edit::remove(0, 1),
                Edit::remove(2, 3),
                Edit::insert(0, "var z;\n"),
                Edit::insert(0, "var "),
            ]
        );
        assert_eq!(plan.inlined, vec!["a"]);
        assert_eq!(plan.hoisted, vec!["z"]);
    }

    #[test]
    fn test_widened_candidate_is_hoisted_with_its_group() {
        let mut scopes = ScopeTree::new();
        let block = scopes.add_scope(ScopeId::root(), ScopeKind::Block);
        let other = scopes.add_scope(ScopeId::root(), ScopeKind::Block);
        scopes.set_first_statement(ScopeId::root(), 0);
        scopes.set_first_statement(block, 2);

        let mut ledgers = LedgerStack::new(&scopes);
        ledgers.enter(block).unwrap();
        ledgers
            .add_inline_binding(Span::new(2, 11), &[ident("b", 2), ident("a", 6)], 2, true)
            .unwrap();
        ledgers.exit().unwrap();
        ledgers.enter(other).unwrap();
        ledgers.observe_reference("a").unwrap();
        ledgers.exit().unwrap();

        let source = "{ b = a = 1; } { a; }";
        let context = CommitContext {
            source,
            tokens: &[],
            scopes: &scopes,
        };
        let plan = plan(&ledgers, LedgerStack::root(), &context).unwrap();
        assert!(plan.inlined.is_empty());
        // b stays in its block, a moved to the program
        assert_eq!(
            plan.edits,
            vec![Edit::insert(2, "var b;\n"), Edit::insert(0, "var a;\n")]
        );
    }

    #[test]
    fn test_names_in_a_group_are_sorted() {
        let mut scopes = ScopeTree::new();
        scopes.set_first_statement(ScopeId::root(), 0);
        let mut ledgers = LedgerStack::new(&scopes);
        for name in ["zeta", "alpha", "Beta"] {
            ledgers.add_binding(name).unwrap();
        }
        let context = CommitContext {
            source: "",
            tokens: &[],
            scopes: &scopes,
        };
        let plan = plan(&ledgers, LedgerStack::root(), &context).unwrap();
        assert_eq!(plan.edits, vec![Edit::insert(0, "var alpha, Beta, zeta;\n")]);
    }

    #[test]
    fn test_collate() {
        let mut names = vec!["b", "A", "a", "_z", "$x", "x1", "x10", "x2", "B"];
        names.sort_by(|a, b| collate(a, b));
        assert_eq!(names, vec!["_z", "$x", "a", "A", "b", "B", "x1", "x10", "x2"]);
        assert_eq!(collate("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_missing_insertion_point_is_an_error() {
        let scopes = ScopeTree::new();
        let mut ledgers = LedgerStack::new(&scopes);
        ledgers.add_binding("x").unwrap();
        let context = CommitContext {
            source: "",
            tokens: &[],
            scopes: &scopes,
        };
        assert!(matches!(
            plan(&ledgers, LedgerStack::root(), &context),
            Err(Error::Invariant(_))
        ));
    }
}
