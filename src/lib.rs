//! Parser, AST rewriter and semantic validator for a Cypher-like graph
//! query language.
//!
//! [`run`] is the single pipeline entry point: Lexical Parser → AST
//! Builder → AST Rewriter → Semantic Validator → rebuilt [`Ast`] handle.
//! Everything below `ast`/`parser`/`lexer` is private plumbing; callers
//! only see the handle, the options struct, and the error type.

pub mod annotations;
pub mod ast;
pub mod builder;
pub mod diag;
#[cfg(feature = "dot")]
pub mod export;
pub mod handle;
pub mod intern;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod registry;
pub mod rewrite;
pub mod span;
pub mod validate;

use std::time::Instant;

pub use diag::{Diagnostic, Error};
pub use handle::Ast;
pub use registry::{ArithmeticFunctionRegistry, BuiltinFunctionRegistry, BuiltinProcedureRegistry, ProcedureRegistry};
pub use rewrite::RewriteOptions;

use diag::ErrorCtx;

/// The knobs that genuinely change front-end behavior, plus forward-facing
/// planner tunables this crate accepts but never enforces.
#[derive(Debug, Clone)]
pub struct FrontendOptions {
    /// Stop after `build`; skip rewriting and validation entirely.
    pub parse_only: bool,
    /// Run the `star` rewrite pass (`WITH */RETURN *` expansion).
    pub expand_star: bool,
    /// Run the `coalesce` rewrite pass (adjacent MATCH/CREATE merging).
    pub coalesce: bool,
    /// Upper bound on rewrite fixpoint iterations.
    pub max_rewrite_passes: usize,
    /// Log pass boundary timings at `debug` level.
    pub timing: bool,

    /// Accepted for forward-compatibility with a query planner; this
    /// front-end does not enforce any of the following.
    pub query_timeout_ms: Option<u64>,
    pub result_set_cap: Option<usize>,
    pub memory_capacity_bytes: Option<usize>,
    pub thread_pool_size: Option<usize>,
    pub cache_size: Option<usize>,
}

impl Default for FrontendOptions {
    fn default() -> Self {
        let rewrite_defaults = RewriteOptions::default();
        FrontendOptions {
            parse_only: false,
            expand_star: rewrite_defaults.run_star,
            coalesce: rewrite_defaults.run_coalesce,
            max_rewrite_passes: rewrite_defaults.max_passes,
            timing: false,
            query_timeout_ms: None,
            result_set_cap: None,
            memory_capacity_bytes: None,
            thread_pool_size: None,
            cache_size: None,
        }
    }
}

impl FrontendOptions {
    fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions { run_coalesce: self.coalesce, run_star: self.expand_star, max_passes: self.max_rewrite_passes }
    }
}

/// Runs the full pipeline over `text` with default procedure/function
/// registries and default options.
pub fn run(text: &str) -> Result<Ast, Diagnostic> {
    run_with(text, &FrontendOptions::default(), &BuiltinProcedureRegistry::new(), &BuiltinFunctionRegistry)
}

/// Runs the full pipeline with caller-supplied options and registries.
pub fn run_with(
    text: &str,
    opts: &FrontendOptions,
    procedures: &dyn ProcedureRegistry,
    functions: &dyn ArithmeticFunctionRegistry,
) -> Result<Ast, Diagnostic> {
    let started = opts.timing.then(Instant::now);

    log::debug!("build: parsing and annotating {} bytes", text.len());
    let master = builder::build(text)?;
    if let Some(t0) = started {
        log::debug!("build: done in {:?}", t0.elapsed());
    }
    if opts.parse_only {
        return Ok(master);
    }

    let source = master.source_arc();
    let annotations = master.annotations_arc();
    let mut query = master.body().clone();

    let mut ctx = ErrorCtx::new();
    log::debug!("rewrite: starting fixpoint");
    query = rewrite::rewrite(query, &mut ctx, &opts.rewrite_options());
    if let Some(diag) = ctx.take() {
        return Err(diag);
    }
    if let Some(t0) = started {
        log::debug!("rewrite: done in {:?}", t0.elapsed());
    }

    log::debug!("validate: checking scoping and clause contracts");
    if let Err(diag) = validate::validate(&mut query, procedures, functions) {
        return Err(diag);
    }
    if let Some(t0) = started {
        log::debug!("validate: done in {:?}", t0.elapsed());
    }

    Ok(builder::rebuild(query, source, annotations))
}
