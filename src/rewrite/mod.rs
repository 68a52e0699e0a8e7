//! AST Rewriter: three canonicalizing passes run to a fixpoint.
//!
//! Each pass is a plain `Query -> (Query, bool)` function — immutable,
//! new-root-returning. `crate::run` drives the fixpoint loop and hands the
//! final body to the validator.

pub mod coalesce;
pub mod references;
pub mod star;
pub mod subquery;

use crate::ast::Query;
use crate::diag::ErrorCtx;

/// Upper bound on fixpoint iterations: one rewritten query can at most
/// introduce as many new clauses as it had to begin with times the number
/// of passes, so this comfortably exceeds any real query while still
/// catching a pass that (incorrectly) never reaches a fixpoint.
const DEFAULT_MAX_ITERATIONS: usize = 64;

/// Which passes run and how many fixpoint iterations are allowed, mirroring
/// `FrontendOptions`'s `expand_star`/`coalesce`/`max_rewrite_passes` knobs.
/// Inlining illegal-subquery-reference checking always runs: it is not an
/// optional rewrite, it is where that error is raised (see `subquery`).
#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions {
    pub run_coalesce: bool,
    pub run_star: bool,
    pub max_passes: usize,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions { run_coalesce: true, run_star: true, max_passes: DEFAULT_MAX_ITERATIONS }
    }
}

pub fn rewrite(mut query: Query, ctx: &mut ErrorCtx, opts: &RewriteOptions) -> Query {
    for _ in 0..opts.max_passes {
        if ctx.encountered_error() {
            break;
        }
        let mut changed = false;

        if opts.run_coalesce {
            let (q, c) = coalesce::run(query);
            query = q;
            changed |= c;
        }

        let (q, c) = subquery::run(query, ctx);
        query = q;
        changed |= c;

        if ctx.encountered_error() {
            break;
        }

        if opts.run_star {
            let (q, c) = star::run(query);
            query = q;
            changed |= c;
        }

        if !changed {
            break;
        }
    }
    query
}
