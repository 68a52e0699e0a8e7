//! AST Builder.
//!
//! Turns parser output into the query's first [`crate::handle::Ast`]:
//! builds the annotation-context collection, canonicalizes every pattern
//! element's alias (assigning `@anon_N` to anonymous nodes/relationships),
//! and wraps the result as the master handle. Rewriting and validation run
//! afterwards, in `crate::run`, each producing its own handle over the same
//! (shared, `Arc`-backed) annotation context.

use std::sync::Arc;

use crate::annotations::AnnotationContext;
use crate::ast::*;
use crate::diag::{Diagnostic, Error};
use crate::handle::Ast;
use crate::parser;

/// Parses `text` and builds the master AST handle; parsing and building run
/// back to back since this front-end has no use for an unannotated
/// intermediate form.
pub fn build(text: &str) -> Result<Ast, Diagnostic> {
    let parsed = parser::parse(text).map_err(|(error, span)| Diagnostic::new(error, span))?;
    let mut query = parsed.query;
    check_structure(&query).map_err(|(error, span)| Diagnostic::new(error, span))?;
    let annotations = AnnotationContext::new();
    annotate_query(&mut query, &annotations);
    Ok(Ast::new_master(query, Arc::from(text), Arc::new(annotations)))
}

/// Rebuilds a handle around a query body produced by the rewriter or
/// validator, reusing the same annotation context and source text so
/// caches and generated alias names stay stable across the pipeline.
pub fn rebuild(query: Query, source: Arc<str>, annotations: Arc<AnnotationContext>) -> Ast {
    Ast::new_master(query, source, annotations)
}

fn annotate_query(query: &mut Query, ctx: &AnnotationContext) {
    for clause in &mut query.clauses {
        annotate_clause(clause, ctx);
    }
}

fn annotate_clause(clause: &mut Clause, ctx: &AnnotationContext) {
    match &mut clause.data {
        ClauseData::Match(m) => {
            for p in &mut m.patterns {
                annotate_pattern(p, ctx);
            }
            if let Some(pred) = &mut m.predicate {
                annotate_expr(pred, ctx);
            }
        }
        ClauseData::Create(c) => {
            for p in &mut c.patterns {
                annotate_pattern(p, ctx);
            }
        }
        ClauseData::Merge(m) => {
            annotate_pattern(&mut m.pattern, ctx);
            for item in m.on_create.iter_mut().chain(m.on_match.iter_mut()) {
                annotate_set_item(item, ctx);
            }
        }
        ClauseData::Set(s) => {
            for item in &mut s.items {
                annotate_set_item(item, ctx);
            }
        }
        ClauseData::Remove(r) => {
            for item in &mut r.items {
                if let crate::ast::RemoveItem::Property(e) = item {
                    annotate_expr(e, ctx);
                }
            }
        }
        ClauseData::Delete(d) => {
            for e in &mut d.exprs {
                annotate_expr(e, ctx);
            }
        }
        ClauseData::With(p) | ClauseData::Return(p) => annotate_projection(p, ctx),
        ClauseData::Unwind(u) => annotate_expr(&mut u.expr, ctx),
        ClauseData::Foreach(f) => {
            annotate_expr(&mut f.list, ctx);
            for c in &mut f.body {
                annotate_clause(c, ctx);
            }
        }
        ClauseData::Call(c) => {
            for a in &mut c.args {
                annotate_expr(a, ctx);
            }
        }
        ClauseData::CallSubquery(c) => annotate_query(&mut c.inner, ctx),
        ClauseData::Union(_) | ClauseData::Unsupported(_) => {}
    }
}

fn annotate_set_item(item: &mut crate::ast::SetItem, ctx: &AnnotationContext) {
    match item {
        crate::ast::SetItem::Property { target, value } | crate::ast::SetItem::PropertyAppend { target, value } => {
            annotate_expr(target, ctx);
            annotate_expr(value, ctx);
        }
        crate::ast::SetItem::Labels { .. } => {}
    }
}

fn annotate_projection(p: &mut ProjectionClause, ctx: &AnnotationContext) {
    if let ProjectionItems::Explicit(items) = &mut p.items {
        for item in items {
            annotate_expr(&mut item.expr, ctx);
        }
    }
    if let Some(pred) = &mut p.predicate {
        annotate_expr(pred, ctx);
    }
    for o in &mut p.order_by {
        annotate_expr(&mut o.expr, ctx);
    }
    if let Some(s) = &mut p.skip {
        annotate_expr(s, ctx);
    }
    if let Some(l) = &mut p.limit {
        annotate_expr(l, ctx);
    }
}

/// Assigns the canonical alias of every node/relationship in `path`:
/// the user's own name if given, otherwise a fresh `@anon_N`.
fn annotate_pattern(path: &mut PatternPath, ctx: &AnnotationContext) {
    for node in &mut path.nodes {
        let alias = node.variable.clone().unwrap_or_else(|| ctx.next_anon_name());
        ctx.set_alias(node.id, alias);
        if let Some(props) = &mut node.properties {
            annotate_expr(props, ctx);
        }
    }
    for rel in &mut path.rels {
        let alias = rel.variable.clone().unwrap_or_else(|| ctx.next_anon_name());
        ctx.set_alias(rel.id, alias);
        if let Some(props) = &mut rel.properties {
            annotate_expr(props, ctx);
        }
    }
}

fn annotate_expr(expr: &mut Expression, ctx: &AnnotationContext) {
    match expr {
        Expression::Identifier { .. }
        | Expression::Parameter { .. }
        | Expression::IntLiteral(..)
        | Expression::FloatLiteral(..)
        | Expression::StringLiteral(..)
        | Expression::BoolLiteral(..)
        | Expression::Null(_)
        | Expression::Unsupported { .. } => {}
        Expression::ListLiteral(items, _) => items.iter_mut().for_each(|e| annotate_expr(e, ctx)),
        Expression::MapLiteral(entries, _) => entries.iter_mut().for_each(|(_, e)| annotate_expr(e, ctx)),
        Expression::Property { base, .. } => annotate_expr(base, ctx),
        Expression::Subscript { base, index, .. } => {
            annotate_expr(base, ctx);
            annotate_expr(index, ctx);
        }
        Expression::SliceSubscript { base, from, to, .. } => {
            annotate_expr(base, ctx);
            if let Some(f) = from {
                annotate_expr(f, ctx);
            }
            if let Some(t) = to {
                annotate_expr(t, ctx);
            }
        }
        Expression::FunctionCall { args, .. } => args.iter_mut().for_each(|e| annotate_expr(e, ctx)),
        Expression::BinaryOp { lhs, rhs, .. } => {
            annotate_expr(lhs, ctx);
            annotate_expr(rhs, ctx);
        }
        Expression::UnaryOp { operand, .. } => annotate_expr(operand, ctx),
        Expression::ListComprehension { list, predicate, eval, .. } => {
            annotate_expr(list, ctx);
            if let Some(p) = predicate {
                annotate_expr(p, ctx);
            }
            if let Some(e) = eval {
                annotate_expr(e, ctx);
            }
        }
        Expression::PatternComprehension { pattern, predicate, eval, .. } => {
            annotate_pattern(pattern, ctx);
            if let Some(p) = predicate {
                annotate_expr(p, ctx);
            }
            annotate_expr(eval, ctx);
        }
        Expression::Reduce { init, list, eval, .. } => {
            annotate_expr(init, ctx);
            annotate_expr(list, ctx);
            annotate_expr(eval, ctx);
        }
        Expression::CaseExpr { test, whens, default, .. } => {
            if let Some(t) = test {
                annotate_expr(t, ctx);
            }
            for (cond, result) in whens {
                annotate_expr(cond, ctx);
                annotate_expr(result, ctx);
            }
            if let Some(d) = default {
                annotate_expr(d, ctx);
            }
        }
        Expression::ShortestPathExpr { pattern, .. } => annotate_pattern(pattern, ctx),
    }
}

/// Parse-time structural checks the builder performs before annotation:
/// every query must end in `RETURN`, an updating clause, or `CALL`, and
/// nothing but `UNION` may follow a `RETURN`.
pub fn check_structure(query: &Query) -> Result<(), (Error, Option<crate::span::Span>)> {
    let Some(first) = query.clauses.first() else {
        return Err((Error::EmptyQuery, None));
    };
    if matches!(first.kind(), ClauseKind::Set | ClauseKind::Remove | ClauseKind::Union) {
        return Err((Error::QueryCannotBeginWith(first.kind()), Some(first.span)));
    }
    // `WITH */RETURN *` star-expands to whatever is already in scope; as
    // the first clause there is nothing yet, so this has to be rejected
    // here, before the rewriter erases the literal `*`.
    let starts_with_bare_star = matches!(
        &first.data,
        ClauseData::With(p) | ClauseData::Return(p) if matches!(p.items, ProjectionItems::Star)
    );
    if starts_with_bare_star {
        return Err((Error::QueryCannotBeginWith(first.kind()), Some(first.span)));
    }
    let mut seen_return = false;
    for clause in &query.clauses {
        if seen_return && !matches!(clause.kind(), ClauseKind::Union) {
            return Err((Error::UnexpectedClauseFollowingReturn, Some(clause.span)));
        }
        match clause.kind() {
            ClauseKind::Return => seen_return = true,
            ClauseKind::Union => seen_return = false,
            _ => {}
        }
    }
    let last = query.clauses.last().unwrap();
    let ok_last = matches!(last.kind(), ClauseKind::Return | ClauseKind::Call | ClauseKind::CallSubquery)
        || last.is_updating();
    if !ok_last {
        return Err((Error::InvalidLastClause, Some(last.span)));
    }
    Ok(())
}
