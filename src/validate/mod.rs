//! Semantic Validator.
//!
//! One [`Validator`] is threaded through one query *branch* (the clause run
//! between two `UNION`s, or a `CALL {...}` subquery body, or a `FOREACH`
//! body); [`validate`] is the entry point that splits the top-level query on
//! `UNION`, drives each branch, and checks cross-branch agreement.

pub mod clauses;
pub mod environment;
pub mod expressions;
pub mod visitor;

use crate::ast::*;
use crate::diag::{Diagnostic, Error, ErrorCtx};
use crate::registry::{ArithmeticFunctionRegistry, ProcedureRegistry};
use environment::{Environment, UnionAll};
use visitor::Strategy;

/// Per-branch validation state. Holds the mutable scope (`env`), the error
/// sink, and the read-only collaborators a clause or expression check might
/// need to consult.
pub struct Validator<'a> {
    pub env: Environment,
    pub ctx: ErrorCtx,
    pub procedures: &'a dyn ProcedureRegistry,
    pub functions: &'a dyn ArithmeticFunctionRegistry,
}

impl<'a> Validator<'a> {
    fn new(clause: ClauseKind, procedures: &'a dyn ProcedureRegistry, functions: &'a dyn ArithmeticFunctionRegistry) -> Self {
        Validator { env: Environment::new(clause), ctx: ErrorCtx::new(), procedures, functions }
    }

    /// Records the first error and tells the caller to unwind.
    pub fn fail(&mut self, error: Error, span: Option<crate::span::Span>) -> Strategy {
        self.ctx.set_error(error, span);
        Strategy::Break
    }

    /// Binds `name` if it is not already visible in the current scope,
    /// returning whether the binding is new (comprehensions/`reduce` must
    /// unbind only what they themselves introduced).
    pub fn bind_local(&mut self, name: &str, ty: IdentifierType) -> bool {
        if self.env.defined_identifiers.contains_key(name) {
            false
        } else {
            self.env.defined_identifiers.insert(name.to_string(), ty);
            true
        }
    }

    pub fn unbind_local(&mut self, name: &str) {
        self.env.defined_identifiers.remove(name);
    }
}

pub fn validate(
    query: &mut Query,
    procedures: &dyn ProcedureRegistry,
    functions: &dyn ArithmeticFunctionRegistry,
) -> Result<(), Diagnostic> {
    let branches = split_on_union(query);
    if branches.len() > 1 {
        if let Err(d) = check_union_agreement(query, &branches) {
            return Err(d);
        }
    }

    for range in &branches {
        let mut v = Validator::new(ClauseKind::Match, procedures, functions);
        if let Err(d) = validate_branch(&mut v, &mut query.clauses[range.clone()]) {
            return Err(d);
        }
    }
    Ok(())
}

/// Clause index ranges for each `UNION`-separated branch, in source order.
/// `UNION` clauses themselves are excluded from every range.
fn split_on_union(query: &Query) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, clause) in query.clauses.iter().enumerate() {
        if matches!(clause.data, ClauseData::Union(_)) {
            ranges.push(start..i);
            start = i + 1;
        }
    }
    ranges.push(start..query.clauses.len());
    ranges
}

fn check_union_agreement(query: &Query, branches: &[std::ops::Range<usize>]) -> Result<(), Diagnostic> {
    let mut columns: Option<Vec<String>> = None;
    for range in branches {
        let last = query.clauses[range.clone()].last();
        let Some(last) = last else {
            return Err(Diagnostic::new(Error::UnionMissingReturns, None));
        };
        let ClauseData::Return(proj) = &last.data else {
            return Err(Diagnostic::new(Error::UnionMissingReturns, Some(last.span)));
        };
        let names = projection_column_names(proj);
        match &columns {
            None => columns = Some(names),
            Some(expected) if expected != &names => {
                return Err(Diagnostic::new(Error::UnionMismatchedReturns, Some(last.span)));
            }
            _ => {}
        }
    }

    let mut seen = UnionAll::NotDefined;
    for clause in &query.clauses {
        if let ClauseData::Union(u) = &clause.data {
            let this = if u.all { UnionAll::All } else { UnionAll::Regular };
            match seen {
                UnionAll::NotDefined => seen = this,
                _ if seen == this => {}
                _ => return Err(Diagnostic::new(Error::UnionCombination, Some(clause.span))),
            }
        }
    }
    Ok(())
}

fn projection_column_names(proj: &ProjectionClause) -> Vec<String> {
    match &proj.items {
        ProjectionItems::Explicit(items) => items
            .iter()
            .map(|item| item.alias.clone().or_else(|| item.expr.as_plain_identifier().map(str::to_string)).unwrap_or_default())
            .collect(),
        ProjectionItems::Star => Vec::new(),
    }
}

fn validate_branch(v: &mut Validator, clauses: &mut [Clause]) -> Result<(), Diagnostic> {
    let mut since_update = false;
    let mut pending_optional_match = false;
    for clause in clauses.iter_mut() {
        let kind = clause.kind();

        if since_update
            && matches!(
                kind,
                ClauseKind::Match | ClauseKind::OptionalMatch | ClauseKind::Unwind | ClauseKind::Call | ClauseKind::CallSubquery
            )
        {
            v.fail(Error::MissingWith(kind), Some(clause.span));
            return Err(v.ctx.peek().cloned().unwrap());
        }
        if pending_optional_match && matches!(kind, ClauseKind::Match) {
            v.fail(Error::MissingWithAfterOptionalMatch, Some(clause.span));
            return Err(v.ctx.peek().cloned().unwrap());
        }

        if validate_clause(v, clause) == Strategy::Break {
            return Err(v.ctx.peek().cloned().unwrap());
        }

        match kind {
            ClauseKind::With => pending_optional_match = false,
            ClauseKind::OptionalMatch => pending_optional_match = true,
            _ => {}
        }
        since_update = clause.is_updating();
    }
    Ok(())
}

/// Dispatches one clause to its contract check. Used both by the top-level
/// branch driver and by `FOREACH`/`CALL {...}`, which recurse into their
/// own nested clause lists.
pub(crate) fn validate_clause(v: &mut Validator, clause: &mut Clause) -> Strategy {
    match &mut clause.data {
        ClauseData::Match(m) => clauses::validate_match(v, m),
        ClauseData::Create(c) => clauses::validate_create(v, c),
        ClauseData::Merge(m) => clauses::validate_merge(v, m),
        ClauseData::Set(s) => clauses::validate_set(v, s),
        ClauseData::Remove(r) => clauses::validate_remove(v, r),
        ClauseData::Delete(d) => clauses::validate_delete(v, d),
        ClauseData::With(p) => clauses::validate_projection(v, p, true),
        ClauseData::Return(p) => clauses::validate_projection(v, p, false),
        ClauseData::Unwind(u) => clauses::validate_unwind(v, u),
        ClauseData::Foreach(f) => clauses::validate_foreach(v, f),
        ClauseData::Call(c) => clauses::validate_call_procedure(v, c),
        ClauseData::CallSubquery(c) => clauses::validate_call_subquery(v, c),
        ClauseData::Union(_) => Strategy::Continue,
        ClauseData::Unsupported(u) => v.fail(Error::UnsupportedASTNodeType(u.name.clone()), Some(clause.span)),
    }
}
