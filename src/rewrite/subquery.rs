//! Inlines returning `CALL { ... }` subqueries.
//!
//! A subquery that ends in `RETURN` is spliced into the outer clause list:
//! the outer variables it reads are threaded in through an explicit `WITH`
//! import, its `RETURN` columns are `@`-aliased so they cannot collide with
//! outer-scope names while inlined, and a trailing `WITH` restores the
//! original column names for the rest of the query. This produces a
//! brand-new clause list rather than mutating the query in place.
//!
//! The leading `WITH` import-list legality check
//! (`CallSubqueryInvalidReferences`) is done here rather than in the
//! validator: once a subquery is inlined its clause-list boundary is gone,
//! so this is the only place that still knows "this `WITH` was a subquery
//! import list".

use crate::ast::*;
use crate::diag::{Error, ErrorCtx};
use crate::rewrite::references;

pub fn run(query: Query, ctx: &mut ErrorCtx) -> (Query, bool) {
    let mut changed = false;
    let mut out = Vec::with_capacity(query.clauses.len());
    for clause in query.clauses {
        if ctx.encountered_error() {
            out.push(clause);
            continue;
        }
        match clause.data {
            ClauseData::CallSubquery(sub) if ends_in_return(&sub.inner) => {
                if !check_import_list(&sub.inner, ctx) {
                    out.push(Clause { id: clause.id, span: clause.span, data: ClauseData::CallSubquery(sub) });
                    continue;
                }
                changed = true;
                out.extend(inline(clause.id, clause.span, sub.inner));
            }
            other => out.push(Clause { id: clause.id, span: clause.span, data: other }),
        }
    }
    (Query::new(out), changed)
}

/// Validates the subquery's leading `WITH`, if any, as an import list: no
/// `ORDER BY`/`SKIP`/`LIMIT`/predicate, and every non-identifier projection
/// must be a closed expression (no outer-scope reference) since nothing is
/// locally declared yet at that point.
pub(crate) fn check_import_list(inner: &Query, ctx: &mut ErrorCtx) -> bool {
    let Some(first) = inner.clauses.first() else { return true };
    let ClauseData::With(proj) = &first.data else { return true };
    if proj.predicate.is_some() || !proj.order_by.is_empty() || proj.skip.is_some() || proj.limit.is_some() {
        ctx.set_error(Error::CallSubqueryInvalidReferences, Some(first.span));
        return false;
    }
    if let ProjectionItems::Explicit(items) = &proj.items {
        for item in items {
            if item.expr.as_plain_identifier().is_none() && contains_identifier(&item.expr) {
                ctx.set_error(Error::CallSubqueryInvalidReferences, Some(item.span));
                return false;
            }
        }
    }
    true
}

fn contains_identifier(expr: &Expression) -> bool {
    let mut refs = crate::annotations::ReferenceMap::new();
    let dummy_clause = Clause {
        id: NodeId(u32::MAX),
        span: expr.span(),
        data: ClauseData::Return(ProjectionClause {
            distinct: false,
            items: ProjectionItems::Explicit(vec![ProjectionItem { expr: expr.clone(), alias: None, span: expr.span() }]),
            predicate: None,
            order_by: Vec::new(),
            skip: None,
            limit: None,
        }),
    };
    references::collect_references(&dummy_clause, &mut refs);
    !refs.is_empty()
}

fn ends_in_return(inner: &Query) -> bool {
    matches!(inner.clauses.last().map(|c| c.kind()), Some(ClauseKind::Return))
}

fn inline(_id: NodeId, span: crate::span::Span, mut inner: Query) -> Vec<Clause> {
    let mut imports = crate::annotations::ReferenceMap::new();
    for clause in &inner.clauses {
        references::collect_references(clause, &mut imports);
    }
    let declared = declared_names(&inner);
    let import_names: Vec<String> =
        imports.names().filter(|n| !declared.contains(&n.to_string())).map(str::to_string).collect();

    let mut result = Vec::new();
    if !import_names.is_empty() {
        let items = import_names
            .iter()
            .map(|name| ProjectionItem {
                expr: Expression::Identifier { id: NodeId(u32::MAX), name: name.clone(), span },
                alias: None,
                span,
            })
            .collect();
        result.push(Clause {
            id: NodeId(u32::MAX),
            span,
            data: ClauseData::With(ProjectionClause {
                distinct: false,
                items: ProjectionItems::Explicit(items),
                predicate: None,
                order_by: Vec::new(),
                skip: None,
                limit: None,
            }),
        });
    }

    let last_return = inner.clauses.pop().expect("ends_in_return checked this");
    let ClauseData::Return(mut proj) = last_return.data else { unreachable!() };
    result.extend(inner.clauses);

    let mut restore_items = Vec::new();
    if let ProjectionItems::Explicit(items) = &mut proj.items {
        for item in items.iter_mut() {
            let original = item.alias.clone().or_else(|| item.expr.as_plain_identifier().map(str::to_string));
            if let Some(original) = original {
                let aliased = format!("@sub_{original}");
                restore_items.push(ProjectionItem {
                    expr: Expression::Identifier { id: NodeId(u32::MAX), name: aliased.clone(), span },
                    alias: Some(original),
                    span,
                });
                item.alias = Some(aliased);
            }
        }
    }
    result.push(Clause { id: last_return.id, span: last_return.span, data: ClauseData::Return(proj) });

    if !restore_items.is_empty() {
        result.push(Clause {
            id: NodeId(u32::MAX),
            span,
            data: ClauseData::With(ProjectionClause {
                distinct: false,
                items: ProjectionItems::Explicit(restore_items),
                predicate: None,
                order_by: Vec::new(),
                skip: None,
                limit: None,
            }),
        });
    }
    result
}

/// Names a subquery body itself introduces (pattern aliases, `UNWIND`,
/// `FOREACH`), so the import list only carries genuinely outer names.
fn declared_names(inner: &Query) -> std::collections::HashSet<String> {
    let mut out = std::collections::HashSet::new();
    for clause in &inner.clauses {
        match &clause.data {
            ClauseData::Match(m) => m.patterns.iter().for_each(|p| record_pattern(p, &mut out)),
            ClauseData::Create(c) => c.patterns.iter().for_each(|p| record_pattern(p, &mut out)),
            ClauseData::Merge(m) => record_pattern(&m.pattern, &mut out),
            ClauseData::Unwind(u) => {
                out.insert(u.alias.clone());
            }
            ClauseData::With(p) | ClauseData::Return(p) => {
                if let ProjectionItems::Explicit(items) = &p.items {
                    for item in items {
                        if let Some(alias) = &item.alias {
                            out.insert(alias.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn record_pattern(path: &PatternPath, out: &mut std::collections::HashSet<String>) {
    for (name, _) in path.aliases() {
        out.insert(name.to_string());
    }
}
