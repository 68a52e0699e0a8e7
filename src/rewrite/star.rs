//! Expands `WITH *` / `RETURN *` into an explicit list of the names in
//! scope at that point, so the validator never has to special-case `*`
//! when checking result-column rules.

use crate::ast::*;

pub fn run(query: Query) -> (Query, bool) {
    let mut scope: Vec<String> = Vec::new();
    let mut changed = false;
    let mut clauses = Vec::with_capacity(query.clauses.len());
    for clause in query.clauses {
        let rewritten = rewrite_clause(clause, &mut scope, &mut changed);
        clauses.push(rewritten);
    }
    (Query::new(clauses), changed)
}

fn rewrite_clause(mut clause: Clause, scope: &mut Vec<String>, changed: &mut bool) -> Clause {
    match &mut clause.data {
        ClauseData::Match(m) => m.patterns.iter().for_each(|p| declare(p, scope)),
        ClauseData::Create(c) => c.patterns.iter().for_each(|p| declare(p, scope)),
        ClauseData::Merge(m) => declare(&m.pattern, scope),
        ClauseData::Unwind(u) => declare_name(&u.alias, scope),
        ClauseData::Foreach(f) => {
            // `FOREACH`'s loop variable and its body's updates are scoped
            // to the clause itself; nothing leaks into the outer scope.
            let mut inner_scope = scope.clone();
            inner_scope.push(f.variable.clone());
            let mut inner_changed = false;
            f.body = std::mem::take(&mut f.body)
                .into_iter()
                .map(|c| rewrite_clause(c, &mut inner_scope, &mut inner_changed))
                .collect();
            *changed |= inner_changed;
        }
        ClauseData::Call(c) => {
            if let Some(items) = &c.yield_items {
                for item in items {
                    declare_name(item.alias.as_deref().unwrap_or(&item.name), scope);
                }
            }
        }
        ClauseData::With(p) | ClauseData::Return(p) => {
            if matches!(p.items, ProjectionItems::Star) {
                *changed = true;
                let items = scope
                    .iter()
                    .map(|name| ProjectionItem {
                        expr: Expression::Identifier { id: NodeId(u32::MAX), name: name.clone(), span: clause.span },
                        alias: None,
                        span: clause.span,
                    })
                    .collect();
                p.items = ProjectionItems::Explicit(items);
            }
            if let ClauseData::With(p) = &clause.data {
                // WITH replaces scope with exactly its own output columns.
                let mut next = Vec::new();
                if let ProjectionItems::Explicit(items) = &p.items {
                    for item in items {
                        let name = item.alias.clone().or_else(|| item.expr.as_plain_identifier().map(str::to_string));
                        if let Some(name) = name {
                            next.push(name);
                        }
                    }
                }
                *scope = next;
            }
        }
        ClauseData::CallSubquery(c) => {
            let mut inner_changed = false;
            c.inner.clauses = std::mem::take(&mut c.inner.clauses)
                .into_iter()
                .map(|cl| rewrite_clause(cl, &mut scope.clone(), &mut inner_changed))
                .collect();
            *changed |= inner_changed;
        }
        ClauseData::Union(_) => *scope = Vec::new(),
        ClauseData::Set(_) | ClauseData::Remove(_) | ClauseData::Delete(_) | ClauseData::Unsupported(_) => {}
    }
    clause
}

fn declare(path: &PatternPath, scope: &mut Vec<String>) {
    for (name, _) in path.aliases() {
        declare_name(name, scope);
    }
}

fn declare_name(name: &str, scope: &mut Vec<String>) {
    if !scope.iter().any(|n| n == name) {
        scope.push(name.to_string());
    }
}
