//! Expression validation: comprehensions, `reduce`, function and procedure
//! calls. The dispatch is the match in [`validate_expr`] itself: Rust's
//! exhaustive enum match, one arm per `Expression` variant.

use crate::ast::{ClauseKind, Expression, IdentifierType};
use crate::diag::Error;
use crate::registry::ArithmeticFunctionRegistry;
use crate::validate::visitor::Strategy;
use crate::validate::Validator;

pub fn validate_expr(v: &mut Validator, expr: &Expression) -> Strategy {
    match expr {
        Expression::Identifier { name, span, .. } => {
            if v.env.is_defined(name) {
                Strategy::Continue
            } else {
                v.fail(Error::NotDefined(name.clone()), Some(*span))
            }
        }
        Expression::Parameter { .. }
        | Expression::IntLiteral(..)
        | Expression::FloatLiteral(..)
        | Expression::StringLiteral(..)
        | Expression::BoolLiteral(..)
        | Expression::Null(_) => Strategy::Continue,
        Expression::Unsupported { description, span } => {
            v.fail(Error::UnsupportedASTNodeType(description.clone()), Some(*span))
        }
        Expression::ListLiteral(items, _) => visit_all(v, items),
        Expression::MapLiteral(entries, _) => visit_all(v, entries.iter().map(|(_, e)| e)),
        Expression::Property { base, .. } => validate_expr(v, base),
        Expression::Subscript { base, index, .. } => {
            chain(validate_expr(v, base), || validate_expr(v, index))
        }
        Expression::SliceSubscript { base, from, to, .. } => {
            let mut strategy = validate_expr(v, base);
            if strategy != Strategy::Break {
                if let Some(from) = from {
                    strategy = validate_expr(v, from);
                }
            }
            if strategy != Strategy::Break {
                if let Some(to) = to {
                    strategy = validate_expr(v, to);
                }
            }
            strategy
        }
        Expression::FunctionCall { name, distinct, args, star, span, .. } => validate_call(v, name, *distinct, args, *star, *span),
        Expression::BinaryOp { lhs, rhs, .. } => chain(validate_expr(v, lhs), || validate_expr(v, rhs)),
        Expression::UnaryOp { operand, .. } => validate_expr(v, operand),
        Expression::ListComprehension { variable, list, predicate, eval, .. } => {
            let mut strategy = validate_expr(v, list);
            if strategy == Strategy::Break {
                return strategy;
            }
            let introduced = v.bind_local(variable, IdentifierType::Unspecified);
            if let Some(p) = predicate {
                strategy = validate_expr(v, p);
            }
            if strategy != Strategy::Break {
                if let Some(e) = eval {
                    strategy = validate_expr(v, e);
                }
            }
            if introduced {
                v.unbind_local(variable);
            }
            if strategy == Strategy::Break {
                Strategy::Break
            } else {
                Strategy::Continue
            }
        }
        Expression::PatternComprehension { variable, pattern, predicate, eval, .. } => {
            let mut introduced = Vec::new();
            for (name, ty) in pattern.aliases() {
                if v.bind_local(name, ty) {
                    introduced.push(name.to_string());
                }
            }
            if let Some(var) = variable {
                if v.bind_local(var, IdentifierType::Unspecified) {
                    introduced.push(var.clone());
                }
            }
            let mut strategy = Strategy::Continue;
            if let Some(p) = predicate {
                strategy = validate_expr(v, p);
            }
            if strategy != Strategy::Break {
                strategy = validate_expr(v, eval);
            }
            for name in introduced {
                v.unbind_local(&name);
            }
            if strategy == Strategy::Break {
                Strategy::Break
            } else {
                Strategy::Continue
            }
        }
        Expression::Reduce { accumulator, init, variable, list, eval, .. } => {
            let mut strategy = validate_expr(v, init);
            if strategy != Strategy::Break {
                strategy = validate_expr(v, list);
            }
            if strategy == Strategy::Break {
                return Strategy::Break;
            }
            let acc_introduced = v.bind_local(accumulator, IdentifierType::Unspecified);
            let var_introduced = v.bind_local(variable, IdentifierType::Unspecified);
            let saved_clause = v.env.clause;
            // Aggregation is illegal inside `reduce`'s eval regardless of
            // the enclosing clause.
            v.env.clause = ClauseKind::Unsupported;
            strategy = validate_expr(v, eval);
            v.env.clause = saved_clause;
            if acc_introduced {
                v.unbind_local(accumulator);
            }
            if var_introduced {
                v.unbind_local(variable);
            }
            if strategy == Strategy::Break {
                Strategy::Break
            } else {
                Strategy::Continue
            }
        }
        Expression::CaseExpr { test, whens, default, .. } => {
            let mut strategy = Strategy::Continue;
            if let Some(t) = test {
                strategy = validate_expr(v, t);
            }
            for (cond, result) in whens {
                if strategy == Strategy::Break {
                    break;
                }
                strategy = validate_expr(v, cond);
                if strategy != Strategy::Break {
                    strategy = validate_expr(v, result);
                }
            }
            if strategy != Strategy::Break {
                if let Some(d) = default {
                    strategy = validate_expr(v, d);
                }
            }
            strategy
        }
        // `shortestPath`/`allShortestPaths` are only legal as a whole MATCH
        // pattern (`PatternPath::kind`); reaching this arm means the parser
        // saw one nested inside an ordinary expression position.
        Expression::ShortestPathExpr { single, span, .. } => {
            let error = if *single { Error::ShortestPathSupport } else { Error::AllShortestPathSupport };
            v.fail(error, Some(*span))
        }
    }
}

fn chain(first: Strategy, next: impl FnOnce() -> Strategy) -> Strategy {
    if first == Strategy::Break {
        Strategy::Break
    } else {
        next()
    }
}

fn visit_all<'a>(v: &mut Validator, exprs: impl IntoIterator<Item = &'a Expression>) -> Strategy {
    for e in exprs {
        if validate_expr(v, e) == Strategy::Break {
            return Strategy::Break;
        }
    }
    Strategy::Continue
}

fn validate_call(v: &mut Validator, name: &str, distinct: bool, args: &[Expression], star: bool, span: crate::span::Span) -> Strategy {
    if star {
        if args.len() != 0 {
            return v.fail(Error::InvalidUsageOfStarParameter, Some(span));
        }
        if !name.eq_ignore_ascii_case("count") {
            return v.fail(Error::InvalidUsageOfStarParameter, Some(span));
        }
        if distinct {
            return v.fail(Error::InvalidUsageOfDistinctStar, Some(span));
        }
        return Strategy::Continue;
    }
    if !v.functions.exists(name) {
        return v.fail(Error::UnknownFunction(name.to_string()), Some(span));
    }
    if v.functions.is_aggregate(name) && !matches!(v.env.clause, ClauseKind::With | ClauseKind::Return) {
        return v.fail(Error::InvalidUseOfAggregation, Some(span));
    }
    visit_all(v, args)
}
