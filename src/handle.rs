//! The AST handle.
//!
//! `Ast` is a thin wrapper around `Arc<AstInner>`, getting safe shared
//! ownership "for free" from the `Arc` drop glue rather than custom
//! refcounting; `retain`/`release` are kept as named operations (matching
//! this crate's outward interface) but are implemented as `Clone`/`Drop`.

use std::sync::Arc;

use crate::annotations::{AnnotationContext, ReferenceMap};
use crate::ast::{Clause, ClauseData, ClauseKind, Expression, ProjectionClause, ProjectionItems, Query};
use crate::registry::is_builtin_aggregate_name;

#[derive(Debug)]
struct AstInner {
    body: Query,
    /// True if this handle's root was synthesized (a segment, or the
    /// result of rewriting) rather than borrowed unchanged from the
    /// original parse.
    synthesized: bool,
    segment_range: Option<(usize, usize)>,
    annotations: Arc<AnnotationContext>,
    source: Arc<str>,
    reference_map: Option<ReferenceMap>,
}

/// A shared, reference-counted handle onto a query body.
#[derive(Debug, Clone)]
pub struct Ast(Arc<AstInner>);

impl Ast {
    /// Constructs the master handle for a freshly built/rewritten/validated
    /// query. Called once at the end of the pipeline in `crate::run`.
    pub fn new_master(body: Query, source: Arc<str>, annotations: Arc<AnnotationContext>) -> Ast {
        Ast(Arc::new(AstInner {
            body,
            synthesized: false,
            segment_range: None,
            annotations,
            source,
            reference_map: None,
        }))
    }

    /// Builds a segment: a view over the half-open range `[start, end)` of
    /// `master`'s top-level clauses, reconstituted as an independent query.
    /// `include_boundary` optionally includes the clause at `end` when it
    /// is `WITH`/`RETURN`, so references crossing the segment boundary are
    /// preserved in the reference map without being part of the segment's
    /// own clause list.
    pub fn segment(master: &Ast, start: usize, end: usize, include_boundary: bool) -> Ast {
        let clauses: Vec<Clause> = master.0.body.clauses[start..end].to_vec();
        let mut reference_map = ReferenceMap::new();
        for clause in &clauses {
            crate::rewrite::references::collect_references(clause, &mut reference_map);
        }
        if include_boundary {
            if let Some(boundary) = master.0.body.clauses.get(end) {
                if matches!(boundary.kind(), ClauseKind::With | ClauseKind::Return) {
                    crate::rewrite::references::collect_references(boundary, &mut reference_map);
                }
            }
        }
        Ast(Arc::new(AstInner {
            body: Query::new(clauses),
            synthesized: true,
            segment_range: Some((start, end)),
            annotations: Arc::clone(&master.0.annotations),
            source: Arc::clone(&master.0.source),
            reference_map: Some(reference_map),
        }))
    }

    /// A shallow copy: a new handle sharing the same underlying data.
    /// Equivalent to `Clone::clone`.
    pub fn shallow_copy(&self) -> Ast {
        self.clone()
    }

    /// Increments the refcount by producing another owner of the same
    /// `Arc`.
    pub fn retain(&self) -> Ast {
        self.clone()
    }

    /// Decrements the refcount; consuming `self` lets Rust's `Drop` glue
    /// free the synthesized body (always) and the annotation collection /
    /// source text (only once the last handle sharing them is gone).
    pub fn release(self) {
        drop(self);
    }

    pub fn is_synthesized(&self) -> bool {
        self.0.synthesized
    }

    pub fn is_segment(&self) -> bool {
        self.0.segment_range.is_some()
    }

    pub fn segment_range(&self) -> Option<(usize, usize)> {
        self.0.segment_range
    }

    pub fn reference_map(&self) -> Option<&ReferenceMap> {
        self.0.reference_map.as_ref()
    }

    pub fn annotations(&self) -> &AnnotationContext {
        &self.0.annotations
    }

    /// A fresh `Arc` clone, for rebuilding a handle around a new body that
    /// should keep sharing this one's annotation context (see
    /// `crate::builder::rebuild`).
    pub fn annotations_arc(&self) -> Arc<AnnotationContext> {
        Arc::clone(&self.0.annotations)
    }

    pub fn source(&self) -> &str {
        &self.0.source
    }

    pub fn source_arc(&self) -> Arc<str> {
        Arc::clone(&self.0.source)
    }

    pub fn body(&self) -> &Query {
        &self.0.body
    }

    pub fn clause_count(&self) -> usize {
        self.0.body.clauses.len()
    }

    pub fn get_clause_by_index(&self, idx: usize) -> Option<&Clause> {
        self.0.body.clauses.get(idx)
    }

    pub fn get_clause_indices(&self, kind: ClauseKind) -> Vec<usize> {
        self.0
            .body
            .clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind() == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the `idx`-th clause of `kind` (0-based among clauses of that
    /// kind).
    pub fn get_clause(&self, kind: ClauseKind, idx: usize) -> Option<&Clause> {
        self.0.body.clauses.iter().filter(|c| c.kind() == kind).nth(idx)
    }

    /// A query is eager if it contains an update, an aggregation, or a
    /// returning subquery the rewriter left un-inlined.
    pub fn is_eager(&self) -> bool {
        self.0.body.clauses.iter().any(|c| {
            c.is_updating()
                || matches!(&c.data, crate::ast::ClauseData::Return(p) | crate::ast::ClauseData::With(p) if projection_has_aggregation(p))
        })
    }

    /// A query is read-only if it has no updating clause and calls no
    /// write-modifying procedure. Relies on the validator having resolved
    /// each `CALL`'s procedure metadata beforehand.
    pub fn read_only(&self) -> bool {
        self.0.body.clauses.iter().all(|c| match &c.data {
            crate::ast::ClauseData::Call(call) => call.resolved_read_only.unwrap_or(false),
            _ => !c.is_updating(),
        })
    }

    /// The display string for a pattern node/relationship: its alias (user-
    /// given, or the `@anon_N` the builder generated) if one was ever set,
    /// otherwise the verbatim source slice at `span`. Cached so repeated
    /// calls for the same node return the identical `String`.
    pub fn to_string(&self, node: crate::ast::NodeId, span: crate::span::Span) -> String {
        let source = Arc::clone(&self.0.source);
        self.0.annotations.to_string_cached(node, || match self.0.annotations.alias(node) {
            Some(alias) => alias,
            None => span.slice(&source).to_string(),
        })
    }

    /// Column names of the query's last `RETURN`, in projection order.
    pub fn build_return_column_names(&self) -> Vec<String> {
        self.0
            .body
            .clauses
            .iter()
            .rev()
            .find_map(|c| match &c.data {
                ClauseData::Return(p) => Some(projection_column_names(p)),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// `YIELD` column names of every `CALL` in the query, in clause order.
    pub fn build_call_column_names(&self) -> Vec<String> {
        self.0
            .body
            .clauses
            .iter()
            .filter_map(|c| match &c.data {
                ClauseData::Call(call) => call.yield_items.as_ref(),
                _ => None,
            })
            .flatten()
            .map(|item| item.alias.clone().unwrap_or_else(|| item.name.clone()))
            .collect()
    }

    /// Every alias (user-given or generated) assigned to a pattern element
    /// anywhere in the query, in the order the elements were built.
    pub fn collect_aliases(&self) -> Vec<String> {
        self.0.annotations.all_aliases()
    }
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

fn projection_has_aggregation(proj: &ProjectionClause) -> bool {
    let ProjectionItems::Explicit(items) = &proj.items else {
        return false;
    };
    items.iter().any(|item| expr_has_aggregation(&item.expr))
}

fn expr_has_aggregation(expr: &Expression) -> bool {
    match expr {
        Expression::FunctionCall { name, args, .. } => {
            is_builtin_aggregate_name(name) || args.iter().any(expr_has_aggregation)
        }
        Expression::BinaryOp { lhs, rhs, .. } => expr_has_aggregation(lhs) || expr_has_aggregation(rhs),
        Expression::UnaryOp { operand, .. } => expr_has_aggregation(operand),
        Expression::Property { base, .. } => expr_has_aggregation(base),
        Expression::Subscript { base, index, .. } => expr_has_aggregation(base) || expr_has_aggregation(index),
        Expression::SliceSubscript { base, from, to, .. } => {
            expr_has_aggregation(base)
                || from.as_deref().is_some_and(expr_has_aggregation)
                || to.as_deref().is_some_and(expr_has_aggregation)
        }
        Expression::ListLiteral(items, _) => items.iter().any(expr_has_aggregation),
        Expression::MapLiteral(entries, _) => entries.iter().any(|(_, e)| expr_has_aggregation(e)),
        Expression::CaseExpr { test, whens, default, .. } => {
            test.as_deref().is_some_and(expr_has_aggregation)
                || whens.iter().any(|(c, r)| expr_has_aggregation(c) || expr_has_aggregation(r))
                || default.as_deref().is_some_and(expr_has_aggregation)
        }
        _ => false,
    }
}
