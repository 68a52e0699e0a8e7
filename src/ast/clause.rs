//! Top-level clauses.

use super::expr::Expression;
use super::pattern::PatternPath;
use super::query::Query;
use super::NodeId;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Match,
    OptionalMatch,
    Create,
    Merge,
    Set,
    Remove,
    Delete,
    With,
    Return,
    Unwind,
    Foreach,
    Call,
    CallSubquery,
    Union,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub id: NodeId,
    pub span: Span,
    pub data: ClauseData,
}

impl Clause {
    pub fn kind(&self) -> ClauseKind {
        match &self.data {
            ClauseData::Match(m) if m.optional => ClauseKind::OptionalMatch,
            ClauseData::Match(_) => ClauseKind::Match,
            ClauseData::Create(_) => ClauseKind::Create,
            ClauseData::Merge(_) => ClauseKind::Merge,
            ClauseData::Set(_) => ClauseKind::Set,
            ClauseData::Remove(_) => ClauseKind::Remove,
            ClauseData::Delete(_) => ClauseKind::Delete,
            ClauseData::With(_) => ClauseKind::With,
            ClauseData::Return(_) => ClauseKind::Return,
            ClauseData::Unwind(_) => ClauseKind::Unwind,
            ClauseData::Foreach(_) => ClauseKind::Foreach,
            ClauseData::Call(_) => ClauseKind::Call,
            ClauseData::CallSubquery(_) => ClauseKind::CallSubquery,
            ClauseData::Union(_) => ClauseKind::Union,
            ClauseData::Unsupported(_) => ClauseKind::Unsupported,
        }
    }

    pub fn is_updating(&self) -> bool {
        matches!(
            self.data,
            ClauseData::Create(_)
                | ClauseData::Merge(_)
                | ClauseData::Set(_)
                | ClauseData::Remove(_)
                | ClauseData::Delete(_)
                | ClauseData::Foreach(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseData {
    Match(MatchClause),
    Create(CreateClause),
    Merge(MergeClause),
    Set(SetClause),
    Remove(RemoveClause),
    Delete(DeleteClause),
    With(ProjectionClause),
    Return(ProjectionClause),
    Unwind(UnwindClause),
    Foreach(ForeachClause),
    Call(CallClause),
    CallSubquery(CallSubqueryClause),
    Union(UnionClause),
    Unsupported(UnsupportedClause),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub optional: bool,
    pub patterns: Vec<PatternPath>,
    pub predicate: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateClause {
    pub patterns: Vec<PatternPath>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    Property { target: Expression, value: Expression },
    PropertyAppend { target: Expression, value: Expression },
    Labels { identifier: String, labels: Vec<String>, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub items: Vec<SetItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    Property(Expression),
    Labels { identifier: String, labels: Vec<String>, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveClause {
    pub items: Vec<RemoveItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    pub pattern: PatternPath,
    pub on_create: Vec<SetItem>,
    pub on_match: Vec<SetItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub detach: bool,
    pub exprs: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expr: Expression,
    pub alias: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionItems {
    Star,
    Explicit(Vec<ProjectionItem>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expression,
    pub direction: SortDirection,
}

/// Shared by `WITH` and `RETURN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionClause {
    pub distinct: bool,
    pub items: ProjectionItems,
    pub predicate: Option<Expression>,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwindClause {
    pub expr: Expression,
    pub alias: String,
    pub alias_span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachClause {
    pub variable: String,
    pub variable_span: Span,
    pub list: Expression,
    pub body: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldItem {
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallClause {
    pub name: String,
    pub name_span: Span,
    pub args: Vec<Expression>,
    pub yield_items: Option<Vec<YieldItem>>,
    /// Filled in by the validator once the procedure registry resolves
    /// `name`; `None` if resolution never happened (e.g. an earlier error
    /// stopped validation first).
    pub resolved_read_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSubqueryClause {
    pub inner: Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionClause {
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedClause {
    pub name: String,
}
