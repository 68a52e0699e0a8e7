//! Coalesces two adjacent clauses of the same pattern-bearing kind into one.

use itertools::Itertools;

use crate::ast::{BinOp, Clause, ClauseData, Expression, Query};

/// Returns the rewritten query and whether anything changed.
pub fn run(query: Query) -> (Query, bool) {
    let before = query.clauses.len();
    let clauses: Vec<Clause> = query
        .clauses
        .into_iter()
        .coalesce(|a, b| try_merge(a, b))
        .collect();
    let changed = clauses.len() != before;
    (Query::new(clauses), changed)
}

fn try_merge(a: Clause, b: Clause) -> Result<Clause, (Clause, Clause)> {
    match (&a.data, &b.data) {
        (ClauseData::Match(ma), ClauseData::Match(mb)) if ma.optional == mb.optional => {
            let span = a.span.merge(&b.span);
            let id = a.id;
            let ClauseData::Match(mut ma) = a.data else { unreachable!() };
            let ClauseData::Match(mb) = b.data else { unreachable!() };
            ma.patterns.extend(mb.patterns);
            ma.predicate = and_predicates(ma.predicate, mb.predicate);
            Ok(Clause { id, span, data: ClauseData::Match(ma) })
        }
        (ClauseData::Create(_), ClauseData::Create(_)) => {
            let span = a.span.merge(&b.span);
            let id = a.id;
            let ClauseData::Create(mut ca) = a.data else { unreachable!() };
            let ClauseData::Create(cb) = b.data else { unreachable!() };
            ca.patterns.extend(cb.patterns);
            Ok(Clause { id, span, data: ClauseData::Create(ca) })
        }
        _ => Err((a, b)),
    }
}

fn and_predicates(a: Option<Expression>, b: Option<Expression>) -> Option<Expression> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let span = a.span().merge(&b.span());
            Some(Expression::BinaryOp { op: BinOp::And, lhs: Box::new(a), rhs: Box::new(b), span })
        }
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
