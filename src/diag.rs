//! Error taxonomy and diagnostic rendering.
//!
//! Parsing, building and validating are the only stages that can fail, so
//! every failure collapses into one `Error` enum, rendered through
//! `annotate-snippets` as a source slice, a line/column, and a caret
//! pointing at the offending span.

use std::fmt;

use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};
use thiserror::Error;

use crate::ast::{ClauseKind, IdentifierType};
use crate::span::Span;

/// The complete error taxonomy for the front-end: lexer/parser failures,
/// structural rejections, and every semantic validation failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    // --- Parse ---
    #[error("parser error: {0}")]
    ParserError(String),
    #[error("query is empty")]
    EmptyQuery,
    #[error("query contains multiple statements")]
    MultipleStatements,
    #[error("unsupported query type")]
    UnsupportedQueryType,
    #[error("invalid constraint command")]
    InvalidConstraintCommand,

    // --- Structure ---
    #[error("invalid last clause: a query must end in RETURN, an updating clause, or CALL")]
    InvalidLastClause,
    #[error("only UNION is allowed to follow RETURN")]
    UnexpectedClauseFollowingReturn,
    #[error("query cannot begin with {0:?}")]
    QueryCannotBeginWith(ClauseKind),
    #[error("a WITH clause is required before {0:?}")]
    MissingWith(ClauseKind),
    #[error("a WITH clause is required after OPTIONAL MATCH before a non-optional MATCH")]
    MissingWithAfterOptionalMatch,
    #[error("`*` in WITH/RETURN requires star expansion to run before validation")]
    StarExpansionDisabled,

    // --- Patterns ---
    #[error("{0:?} relations must declare exactly one type")]
    OneRelationshipType(ClauseKind),
    #[error("only directed relationships may be created")]
    CreateDirectedRelationship,
    #[error("{0:?} does not support variable-length relationships")]
    VarLen(ClauseKind),
    #[error("invalid variable-length range")]
    VarLenInvalidRange,
    #[error("inline properties are not supported on this pattern element")]
    UnhandledTypeInlineProperties,
    #[error("shortestPath requires both endpoints to already be bound")]
    ShortestPathBoundNodes,
    #[error("allShortestPaths requires a minimum length of at least 1")]
    AllShortestPathMinimalLength,
    #[error("allShortestPaths is not supported in this position")]
    AllShortestPathSupport,
    #[error("shortestPath is not supported in this position")]
    ShortestPathSupport,

    // --- Scoping ---
    #[error("identifier `{0}` is not defined")]
    NotDefined(String),
    #[error("variable `{0}` already declared")]
    VariableAlreadyDeclared(String),
    #[error("variable `{0}` already declared in an outer scope")]
    VariableAlreadyDeclaredInOuterScope(String),
    #[error("`{0}` is used both as a node and as a relationship alias")]
    SameAliasNodeAndRelationship(String),
    #[error("`{0}` is bound by more than one pattern in the same clause")]
    SameAliasMultiplePatterns(String),
    #[error("cannot redeclare {1} `{0}` in {2:?}")]
    Redeclare(IdentifierType, String, ClauseKind),
    #[error("WITH projections require an explicit alias")]
    WithProjectionMissingAlias,
    #[error("duplicate result column name `{0}`")]
    SameResultColumnName(String),

    // --- Procedures / functions ---
    #[error("procedure `{0}` is not registered")]
    ProcedureNotRegistered(String),
    #[error("procedure `{0}` invoked with the wrong number of arguments")]
    ProcedureInvalidArguments(String),
    #[error("procedure `{0}` has no output `{1}`")]
    ProcedureInvalidOutput(String, String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("aggregation functions are only allowed in WITH/RETURN")]
    InvalidUseOfAggregation,
    #[error("`*` may only be used as the sole argument of COUNT")]
    InvalidUsageOfStarParameter,
    #[error("DISTINCT * is never legal")]
    InvalidUsageOfDistinctStar,

    // --- Unions / subqueries ---
    #[error("every branch of a UNION must have a RETURN clause")]
    UnionMissingReturns,
    #[error("every branch of a UNION must return the same column names in the same order")]
    UnionMismatchedReturns,
    #[error("UNION and UNION ALL cannot be mixed within one query")]
    UnionCombination,
    #[error("CALL {{...}} may only import plain identifiers from the outer scope")]
    CallSubqueryInvalidReferences,

    // --- Miscellaneous ---
    #[error("LIMIT must be a non-negative integer")]
    LimitMustBeNonNegative,
    #[error("SKIP must be a non-negative integer")]
    SkipMustBeNonNegative,
    #[error("DELETE arguments must be identifiers, function calls, or subscripts")]
    DeleteInvalidArguments,
    #[error("REMOVE target must be `identifier.property` or a label")]
    RemoveInvalidInput,
    #[error("the left-hand side of SET must be a plain identifier")]
    SetLhsNonAlias,
    #[error("reduce() requires an eval expression")]
    MissingEvalExpInReduce,
    #[error("FOREACH body may only contain updating clauses")]
    ForeachInvalidBody,

    // --- Unsupported AST ---
    #[error("unsupported construct: {0}")]
    UnsupportedASTNodeType(String),
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
}

/// A rendered diagnostic: the error plus enough context to print a caret.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub error: Error,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(error: Error, span: Option<Span>) -> Self {
        Diagnostic { error, span }
    }

    /// Render the diagnostic against the original query text using
    /// `annotate-snippets`.
    pub fn render(&self, query_text: &str) -> String {
        let message = self.error.to_string();
        let Some(span) = self.span else {
            return message;
        };
        let (context, caret_offset) = span.context(query_text, 40);
        let snippet = Snippet {
            title: Some(Annotation {
                label: Some(&message),
                id: None,
                annotation_type: AnnotationType::Error,
            }),
            footer: vec![],
            slices: vec![Slice {
                source: context,
                line_start: span.line as usize,
                origin: None,
                fold: false,
                annotations: vec![SourceAnnotation {
                    label: "here",
                    annotation_type: AnnotationType::Error,
                    range: (caret_offset, caret_offset + span.len.max(1)),
                }],
            }],
            opt: FormatOptions { color: false, ..Default::default() },
        };
        DisplayList::from(snippet).to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} at {}", self.error, span),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Explicit error context threaded through parse/build/validate. Recording
/// an error is idempotent: only the first one recorded is kept.
#[derive(Debug, Default)]
pub struct ErrorCtx {
    error: Option<Diagnostic>,
}

impl ErrorCtx {
    pub fn new() -> Self {
        ErrorCtx::default()
    }

    pub fn set_error(&mut self, error: Error, span: Option<Span>) {
        if self.error.is_none() {
            self.error = Some(Diagnostic::new(error, span));
        }
    }

    pub fn encountered_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take(self) -> Option<Diagnostic> {
        self.error
    }

    pub fn peek(&self) -> Option<&Diagnostic> {
        self.error.as_ref()
    }
}
