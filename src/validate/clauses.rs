//! Per-clause contract checks.

use std::collections::HashSet;

use crate::ast::*;
use crate::diag::Error;
use crate::registry::{Arity, ProcedureRegistry};
use crate::validate::environment::Environment;
use crate::validate::expressions::validate_expr;
use crate::validate::visitor::Strategy;
use crate::validate::Validator;

pub fn validate_match(v: &mut Validator, m: &MatchClause) -> Strategy {
    let mut new_in_clause = HashSet::new();
    for pattern in &m.patterns {
        if bind_pattern(v, pattern, &mut new_in_clause, false) == Strategy::Break {
            return Strategy::Break;
        }
        if check_shortest_path_pattern(v, pattern) == Strategy::Break {
            return Strategy::Break;
        }
    }
    if let Some(pred) = &m.predicate {
        return validate_expr(v, pred);
    }
    Strategy::Continue
}

fn check_shortest_path_pattern(v: &mut Validator, pattern: &PatternPath) -> Strategy {
    if matches!(pattern.kind, PathKind::Normal) {
        return Strategy::Continue;
    }
    let first_bound = pattern.nodes.first().and_then(|n| n.variable.as_deref()).map(|n| v.env.is_defined(n)).unwrap_or(false);
    let last_bound = pattern.nodes.last().and_then(|n| n.variable.as_deref()).map(|n| v.env.is_defined(n)).unwrap_or(false);
    if !first_bound || !last_bound {
        return v.fail(Error::ShortestPathBoundNodes, Some(pattern.span));
    }
    if matches!(pattern.kind, PathKind::AllShortestPaths) {
        for rel in &pattern.rels {
            if let Some(vl) = rel.var_length {
                if vl.min.unwrap_or(0) > 1 {
                    return v.fail(Error::AllShortestPathMinimalLength, Some(pattern.span));
                }
            }
        }
    }
    Strategy::Continue
}

/// Binds every alias in `pattern` into the current environment.
/// `redeclare_kind`, when set, rejects binding a name that already exists
/// anywhere in scope (used by `CREATE`); when `None` (used by `MATCH`), an
/// existing binding of a compatible type is a constraint reference, not an
/// error.
fn bind_pattern(
    v: &mut Validator,
    pattern: &PatternPath,
    new_in_clause: &mut HashSet<String>,
    reject_existing: bool,
) -> Strategy {
    for node in &pattern.nodes {
        if let Some(props) = &node.properties {
            if validate_expr(v, props) == Strategy::Break {
                return Strategy::Break;
            }
        }
    }
    for rel in &pattern.rels {
        if let Some(props) = &rel.properties {
            if validate_expr(v, props) == Strategy::Break {
                return Strategy::Break;
            }
        }
    }
    for (name, ty) in pattern.aliases() {
        if bind_one(v, name, ty, new_in_clause, reject_existing) == Strategy::Break {
            return Strategy::Break;
        }
    }
    Strategy::Continue
}

/// Binds a `MATCH`/`MERGE` pattern alias. An already-bound `NODE`/`EDGE` of
/// the same kind is a legal re-reference (matching against the existing
/// entity, the normal way a later `MATCH` extends an earlier one); an
/// already-bound name of the *other* kind, or one whose type is still
/// `Unspecified` (e.g. an `UNWIND` scalar), cannot suddenly become a graph
/// entity and is rejected as a redeclaration.
fn bind_one(
    v: &mut Validator,
    name: &str,
    ty: IdentifierType,
    new_in_clause: &mut HashSet<String>,
    reject_existing: bool,
) -> Strategy {
    if let Some(existing) = v.env.type_of(name) {
        if reject_existing {
            return v.fail(Error::Redeclare(existing, name.to_string(), v.env.clause), None);
        }
        if existing == IdentifierType::Unspecified {
            return v.fail(Error::VariableAlreadyDeclared(name.to_string()), None);
        }
        if existing != ty {
            return v.fail(Error::SameAliasNodeAndRelationship(name.to_string()), None);
        }
        Strategy::Continue
    } else if !new_in_clause.insert(name.to_string()) {
        v.fail(Error::SameAliasMultiplePatterns(name.to_string()), None)
    } else {
        v.env.defined_identifiers.insert(name.to_string(), ty);
        Strategy::Continue
    }
}

pub fn validate_create(v: &mut Validator, c: &CreateClause) -> Strategy {
    for pattern in &c.patterns {
        for rel in &pattern.rels {
            if rel.types.len() != 1 {
                return v.fail(Error::OneRelationshipType(ClauseKind::Create), Some(rel.span));
            }
            if matches!(rel.direction, Direction::Either) {
                return v.fail(Error::CreateDirectedRelationship, Some(rel.span));
            }
            if rel.var_length.is_some() {
                return v.fail(Error::VarLen(ClauseKind::Create), Some(rel.span));
            }
        }
    }
    // Sibling entities within the same CREATE cannot see each other's new
    // bindings while their own inline properties are evaluated; validate
    // every property expression first, under the pre-existing
    // environment, then bind all new aliases afterward.
    for pattern in &c.patterns {
        for node in &pattern.nodes {
            if let Some(props) = &node.properties {
                if validate_expr(v, props) == Strategy::Break {
                    return Strategy::Break;
                }
            }
        }
        for rel in &pattern.rels {
            if let Some(props) = &rel.properties {
                if validate_expr(v, props) == Strategy::Break {
                    return Strategy::Break;
                }
            }
        }
    }
    // A node that already exists in scope may be reused as an anchor point
    // for a new relationship (`MATCH (a) CREATE (a)-[:R]->(b)` is ordinary
    // graph extension); but a standalone node pattern with no attached
    // relationship creates nothing new, so reusing an existing name there is
    // a redeclaration, not an anchor. Relationship aliases are never
    // anchors: CREATE always makes a new relationship.
    let mut new_in_clause = HashSet::new();
    for pattern in &c.patterns {
        let is_anchor_candidate = !pattern.rels.is_empty();
        for node in &pattern.nodes {
            let Some(name) = &node.variable else { continue };
            match v.env.type_of(name) {
                Some(IdentifierType::Node) if is_anchor_candidate => continue,
                Some(existing) => return v.fail(Error::Redeclare(existing, name.clone(), ClauseKind::Create), Some(node.span)),
                None => {
                    if bind_one(v, name, IdentifierType::Node, &mut new_in_clause, false) == Strategy::Break {
                        return Strategy::Break;
                    }
                }
            }
        }
        for rel in &pattern.rels {
            let Some(name) = &rel.variable else { continue };
            if bind_one(v, name, IdentifierType::Edge, &mut new_in_clause, true) == Strategy::Break {
                return Strategy::Break;
            }
        }
    }
    Strategy::Continue
}

pub fn validate_merge(v: &mut Validator, m: &MergeClause) -> Strategy {
    for rel in &m.pattern.rels {
        if rel.variable.as_deref().map(|n| v.env.is_defined(n)).unwrap_or(false) {
            return v.fail(Error::VariableAlreadyDeclared(rel.variable.clone().unwrap()), Some(rel.span));
        }
        if rel.types.len() != 1 {
            return v.fail(Error::OneRelationshipType(ClauseKind::Merge), Some(rel.span));
        }
        if rel.var_length.is_some() {
            return v.fail(Error::VarLen(ClauseKind::Merge), Some(rel.span));
        }
        if let Some(props) = &rel.properties {
            if validate_expr(v, props) == Strategy::Break {
                return Strategy::Break;
            }
        }
    }
    for node in &m.pattern.nodes {
        let pre_existing = node.variable.as_deref().map(|n| v.env.is_defined(n)).unwrap_or(false);
        if pre_existing && (!node.labels.is_empty() || node.properties.is_some()) {
            return v.fail(Error::UnhandledTypeInlineProperties, Some(node.span));
        }
        if let Some(props) = &node.properties {
            if validate_expr(v, props) == Strategy::Break {
                return Strategy::Break;
            }
        }
    }
    let mut new_in_clause = HashSet::new();
    for (name, ty) in m.pattern.aliases() {
        if bind_one(v, name, ty, &mut new_in_clause, false) == Strategy::Break {
            return Strategy::Break;
        }
    }
    for item in m.on_create.iter().chain(m.on_match.iter()) {
        if validate_set_item(v, item) == Strategy::Break {
            return Strategy::Break;
        }
    }
    Strategy::Continue
}

pub fn validate_set(v: &mut Validator, s: &SetClause) -> Strategy {
    for item in &s.items {
        if validate_set_item(v, item) == Strategy::Break {
            return Strategy::Break;
        }
    }
    Strategy::Continue
}

fn validate_set_item(v: &mut Validator, item: &SetItem) -> Strategy {
    match item {
        SetItem::Property { target, value } | SetItem::PropertyAppend { target, value } => {
            if !matches!(target, Expression::Identifier { .. } | Expression::Property { .. }) {
                return v.fail(Error::SetLhsNonAlias, Some(target.span()));
            }
            if validate_expr(v, target) == Strategy::Break {
                return Strategy::Break;
            }
            validate_expr(v, value)
        }
        SetItem::Labels { identifier, span, .. } => {
            if !v.env.is_defined(identifier) {
                return v.fail(Error::NotDefined(identifier.clone()), Some(*span));
            }
            Strategy::Continue
        }
    }
}

pub fn validate_remove(v: &mut Validator, r: &RemoveClause) -> Strategy {
    for item in &r.items {
        match item {
            RemoveItem::Property(e) => {
                if !matches!(e, Expression::Property { .. }) {
                    return v.fail(Error::RemoveInvalidInput, Some(e.span()));
                }
                if validate_expr(v, e) == Strategy::Break {
                    return Strategy::Break;
                }
            }
            RemoveItem::Labels { identifier, span, .. } => {
                if !v.env.is_defined(identifier) {
                    return v.fail(Error::NotDefined(identifier.clone()), Some(*span));
                }
            }
        }
    }
    Strategy::Continue
}

pub fn validate_delete(v: &mut Validator, d: &DeleteClause) -> Strategy {
    for e in &d.exprs {
        if !matches!(e, Expression::Identifier { .. } | Expression::FunctionCall { .. } | Expression::Subscript { .. }) {
            return v.fail(Error::DeleteInvalidArguments, Some(e.span()));
        }
        if validate_expr(v, e) == Strategy::Break {
            return Strategy::Break;
        }
    }
    Strategy::Continue
}

pub fn validate_unwind(v: &mut Validator, u: &UnwindClause) -> Strategy {
    if validate_expr(v, &u.expr) == Strategy::Break {
        return Strategy::Break;
    }
    if v.env.is_defined(&u.alias) {
        return v.fail(Error::VariableAlreadyDeclared(u.alias.clone()), Some(u.alias_span));
    }
    v.env.defined_identifiers.insert(u.alias.clone(), IdentifierType::Unspecified);
    Strategy::Continue
}

pub fn validate_foreach(v: &mut Validator, f: &mut ForeachClause) -> Strategy {
    if validate_expr(v, &f.list) == Strategy::Break {
        return Strategy::Break;
    }
    if v.env.is_defined(&f.variable) {
        return v.fail(Error::VariableAlreadyDeclared(f.variable.clone()), Some(f.variable_span));
    }
    for clause in &f.body {
        if !clause.is_updating() {
            return v.fail(Error::ForeachInvalidBody, Some(clause.span));
        }
    }
    let outer = v.env.clone();
    v.env = Environment::new(v.env.clause);
    v.env.defined_identifiers = outer.defined_identifiers.clone();
    v.env.defined_identifiers.insert(f.variable.clone(), IdentifierType::Unspecified);
    let mut strategy = Strategy::Continue;
    for clause in &mut f.body {
        if crate::validate::validate_clause(v, clause) == Strategy::Break {
            strategy = Strategy::Break;
            break;
        }
    }
    // FOREACH leaves the parent environment unchanged on exit.
    v.env = outer;
    strategy
}

pub fn validate_call_procedure(v: &mut Validator, c: &mut CallClause) -> Strategy {
    let Some(signature) = v.procedures.lookup(&c.name) else {
        return v.fail(Error::ProcedureNotRegistered(c.name.clone()), Some(c.name_span));
    };
    let signature = signature.clone();
    if let Arity::Fixed(n) = signature.argc {
        if c.args.len() != n {
            return v.fail(Error::ProcedureInvalidArguments(c.name.clone()), Some(c.name_span));
        }
    }
    for arg in &c.args {
        if validate_expr(v, arg) == Strategy::Break {
            return Strategy::Break;
        }
    }
    c.resolved_read_only = Some(signature.is_read_only);
    if let Some(items) = &c.yield_items {
        let mut seen = HashSet::new();
        for item in items {
            if !signature.contains_output(&item.name) {
                return v.fail(Error::ProcedureInvalidOutput(c.name.clone(), item.name.clone()), Some(item.span));
            }
            let bound_name = item.alias.clone().unwrap_or_else(|| item.name.clone());
            if !seen.insert(bound_name.clone()) {
                return v.fail(Error::SameResultColumnName(bound_name), Some(item.span));
            }
            v.env.defined_identifiers.insert(bound_name, IdentifierType::Unspecified);
        }
    }
    Strategy::Continue
}

/// Non-returning `CALL {...}` subqueries are isolated scopes: they see
/// nothing from the outer query except whatever a leading `WITH` names
/// explicitly. That `WITH` is validated against the *outer* environment
/// (so it can actually reference outer variables) before the subquery's
/// own environment is seeded with just those names — mirroring what the
/// rewriter does for the returning case by inlining instead.
pub fn validate_call_subquery(v: &mut Validator, c: &mut CallSubqueryClause) -> Strategy {
    let outer = v.env.clone();
    let mut imported_names = outer.defined_identifiers.clone();
    imported_names.clear();
    let mut skip_first = false;

    let mut import_everything = false;
    let leading_with_star = matches!(
        c.inner.clauses.first().map(|cl| &cl.data),
        Some(ClauseData::With(p)) if matches!(p.items, ProjectionItems::Star)
    );
    let has_leading_with = matches!(c.inner.clauses.first().map(|cl| &cl.data), Some(ClauseData::With(_)));

    // `WITH *` still means "import the entire outer scope" even when star
    // expansion didn't already turn it into an explicit list (the common
    // case, since the rewriter recurses into subquery bodies too); no need
    // to enumerate outer's names for that.
    if leading_with_star {
        import_everything = true;
        skip_first = true;
    } else if has_leading_with {
        if !crate::rewrite::subquery::check_import_list(&c.inner, &mut v.ctx) {
            v.env = outer;
            return Strategy::Break;
        }
        let first = c.inner.clauses.first_mut().expect("has_leading_with checked this");
        if crate::validate::validate_clause(v, first) == Strategy::Break {
            v.env = outer;
            return Strategy::Break;
        }
        imported_names = v.env.defined_identifiers.clone();
        skip_first = true;
    }

    v.env = Environment::new(outer.clause);
    v.env.defined_identifiers = imported_names;
    v.env.ignore_identifiers = import_everything;
    let mut strategy = Strategy::Continue;
    for clause in c.inner.clauses.iter_mut().skip(if skip_first { 1 } else { 0 }) {
        if crate::validate::validate_clause(v, clause) == Strategy::Break {
            strategy = Strategy::Break;
            break;
        }
    }
    v.env = outer;
    strategy
}

pub fn validate_projection(v: &mut Validator, p: &ProjectionClause, is_with: bool) -> Strategy {
    let ProjectionItems::Explicit(items) = &p.items else {
        return v.fail(Error::StarExpansionDisabled, None);
    };
    let saved_clause = v.env.clause;
    v.env.clause = if is_with { ClauseKind::With } else { ClauseKind::Return };
    for item in items {
        if item.alias.is_none() && item.expr.as_plain_identifier().is_none() {
            v.env.clause = saved_clause;
            return v.fail(Error::WithProjectionMissingAlias, Some(item.span));
        }
        if validate_expr(v, &item.expr) == Strategy::Break {
            v.env.clause = saved_clause;
            return Strategy::Break;
        }
    }
    v.env.clause = saved_clause;

    let mut seen = HashSet::new();
    let mut next_env = Environment::new(v.env.clause);
    for item in items {
        let name = item.alias.clone().or_else(|| item.expr.as_plain_identifier().map(str::to_string)).unwrap();
        if !name.starts_with('@') && !seen.insert(name.clone()) {
            return v.fail(Error::SameResultColumnName(name), Some(item.span));
        }
        let ty = match &item.expr {
            Expression::Identifier { name, .. } => v.env.type_of(name).unwrap_or(IdentifierType::Unspecified),
            _ => IdentifierType::Unspecified,
        };
        next_env.defined_identifiers.insert(name, ty);
    }

    if is_with {
        v.env.defined_identifiers = next_env.defined_identifiers;
    }

    if let Some(pred) = &p.predicate {
        if validate_expr(v, pred) == Strategy::Break {
            return Strategy::Break;
        }
    }
    for o in &p.order_by {
        if validate_expr(v, &o.expr) == Strategy::Break {
            return Strategy::Break;
        }
    }
    if let Some(skip) = &p.skip {
        if !matches!(skip, Expression::IntLiteral(n, _) if *n >= 0) && !matches!(skip, Expression::Parameter { .. }) {
            return v.fail(Error::SkipMustBeNonNegative, Some(skip.span()));
        }
    }
    if let Some(limit) = &p.limit {
        if !matches!(limit, Expression::IntLiteral(n, _) if *n >= 0) && !matches!(limit, Expression::Parameter { .. }) {
            return v.fail(Error::LimitMustBeNonNegative, Some(limit.span()));
        }
    }
    Strategy::Continue
}
