//! Collects every identifier a clause mentions, for two consumers: the
//! segment boundary's reference map (`crate::handle::Ast::segment`) and the
//! returning-subquery rewrite's import-list computation.

use crate::annotations::ReferenceMap;
use crate::ast::*;

pub fn collect_references(clause: &Clause, out: &mut ReferenceMap) {
    match &clause.data {
        ClauseData::Match(m) => {
            for p in &m.patterns {
                collect_pattern(p, out);
            }
            if let Some(pred) = &m.predicate {
                collect_expr(pred, out);
            }
        }
        ClauseData::Create(c) => c.patterns.iter().for_each(|p| collect_pattern(p, out)),
        ClauseData::Merge(m) => {
            collect_pattern(&m.pattern, out);
            m.on_create.iter().chain(m.on_match.iter()).for_each(|i| collect_set_item(i, out));
        }
        ClauseData::Set(s) => s.items.iter().for_each(|i| collect_set_item(i, out)),
        ClauseData::Remove(r) => {
            for item in &r.items {
                match item {
                    RemoveItem::Property(e) => collect_expr(e, out),
                    RemoveItem::Labels { identifier, .. } => out.record(identifier),
                }
            }
        }
        ClauseData::Delete(d) => d.exprs.iter().for_each(|e| collect_expr(e, out)),
        ClauseData::With(p) | ClauseData::Return(p) => collect_projection(p, out),
        ClauseData::Unwind(u) => {
            collect_expr(&u.expr, out);
            out.record(&u.alias);
        }
        ClauseData::Foreach(f) => {
            collect_expr(&f.list, out);
            out.record(&f.variable);
            f.body.iter().for_each(|c| collect_references(c, out));
        }
        ClauseData::Call(c) => c.args.iter().for_each(|a| collect_expr(a, out)),
        ClauseData::CallSubquery(c) => c.inner.clauses.iter().for_each(|cl| collect_references(cl, out)),
        ClauseData::Union(_) | ClauseData::Unsupported(_) => {}
    }
}

fn collect_set_item(item: &SetItem, out: &mut ReferenceMap) {
    match item {
        SetItem::Property { target, value } | SetItem::PropertyAppend { target, value } => {
            collect_expr(target, out);
            collect_expr(value, out);
        }
        SetItem::Labels { identifier, .. } => out.record(identifier),
    }
}

fn collect_projection(p: &ProjectionClause, out: &mut ReferenceMap) {
    if let ProjectionItems::Explicit(items) = &p.items {
        for item in items {
            collect_expr(&item.expr, out);
        }
    }
    if let Some(pred) = &p.predicate {
        collect_expr(pred, out);
    }
    for o in &p.order_by {
        collect_expr(&o.expr, out);
    }
    if let Some(s) = &p.skip {
        collect_expr(s, out);
    }
    if let Some(l) = &p.limit {
        collect_expr(l, out);
    }
}

fn collect_pattern(path: &PatternPath, out: &mut ReferenceMap) {
    for (name, _) in path.aliases() {
        out.record(name);
    }
    for node in &path.nodes {
        if let Some(props) = &node.properties {
            collect_expr(props, out);
        }
    }
    for rel in &path.rels {
        if let Some(props) = &rel.properties {
            collect_expr(props, out);
        }
    }
}

fn collect_expr(expr: &Expression, out: &mut ReferenceMap) {
    match expr {
        Expression::Identifier { name, .. } => out.record(name),
        Expression::Parameter { .. }
        | Expression::IntLiteral(..)
        | Expression::FloatLiteral(..)
        | Expression::StringLiteral(..)
        | Expression::BoolLiteral(..)
        | Expression::Null(_)
        | Expression::Unsupported { .. } => {}
        Expression::ListLiteral(items, _) => items.iter().for_each(|e| collect_expr(e, out)),
        Expression::MapLiteral(entries, _) => entries.iter().for_each(|(_, e)| collect_expr(e, out)),
        Expression::Property { base, .. } => collect_expr(base, out),
        Expression::Subscript { base, index, .. } => {
            collect_expr(base, out);
            collect_expr(index, out);
        }
        Expression::SliceSubscript { base, from, to, .. } => {
            collect_expr(base, out);
            if let Some(f) = from {
                collect_expr(f, out);
            }
            if let Some(t) = to {
                collect_expr(t, out);
            }
        }
        Expression::FunctionCall { args, .. } => args.iter().for_each(|e| collect_expr(e, out)),
        Expression::BinaryOp { lhs, rhs, .. } => {
            collect_expr(lhs, out);
            collect_expr(rhs, out);
        }
        Expression::UnaryOp { operand, .. } => collect_expr(operand, out),
        Expression::ListComprehension { list, predicate, eval, .. } => {
            collect_expr(list, out);
            if let Some(p) = predicate {
                collect_expr(p, out);
            }
            if let Some(e) = eval {
                collect_expr(e, out);
            }
        }
        Expression::PatternComprehension { pattern, predicate, eval, .. } => {
            collect_pattern(pattern, out);
            if let Some(p) = predicate {
                collect_expr(p, out);
            }
            collect_expr(eval, out);
        }
        Expression::Reduce { init, list, eval, .. } => {
            collect_expr(init, out);
            collect_expr(list, out);
            collect_expr(eval, out);
        }
        Expression::CaseExpr { test, whens, default, .. } => {
            if let Some(t) = test {
                collect_expr(t, out);
            }
            for (cond, result) in whens {
                collect_expr(cond, out);
                collect_expr(result, out);
            }
            if let Some(d) = default {
                collect_expr(d, out);
            }
        }
        Expression::ShortestPathExpr { pattern, .. } => collect_pattern(pattern, out),
    }
}
