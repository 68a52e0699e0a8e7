//! Expression nodes.

use super::pattern::PatternPath;
use super::NodeId;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Xor,
    In,
    StartsWith,
    EndsWith,
    Contains,
    Regex,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Not,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier { id: NodeId, name: String, span: Span },
    Parameter { name: String, span: Span },
    IntLiteral(i64, Span),
    FloatLiteral(f64, Span),
    StringLiteral(String, Span),
    BoolLiteral(bool, Span),
    Null(Span),
    ListLiteral(Vec<Expression>, Span),
    MapLiteral(Vec<(String, Expression)>, Span),
    Property { base: Box<Expression>, key: String, span: Span },
    Subscript { base: Box<Expression>, index: Box<Expression>, span: Span },
    SliceSubscript { base: Box<Expression>, from: Option<Box<Expression>>, to: Option<Box<Expression>>, span: Span },
    FunctionCall { id: NodeId, name: String, distinct: bool, args: Vec<Expression>, star: bool, span: Span },
    BinaryOp { op: BinOp, lhs: Box<Expression>, rhs: Box<Expression>, span: Span },
    UnaryOp { op: UnaryOpKind, operand: Box<Expression>, span: Span },
    ListComprehension {
        id: NodeId,
        variable: String,
        list: Box<Expression>,
        predicate: Option<Box<Expression>>,
        eval: Option<Box<Expression>>,
        span: Span,
    },
    PatternComprehension {
        id: NodeId,
        variable: Option<String>,
        pattern: Box<PatternPath>,
        predicate: Option<Box<Expression>>,
        eval: Box<Expression>,
        span: Span,
    },
    Reduce {
        id: NodeId,
        accumulator: String,
        init: Box<Expression>,
        variable: String,
        list: Box<Expression>,
        eval: Box<Expression>,
        span: Span,
    },
    CaseExpr {
        test: Option<Box<Expression>>,
        whens: Vec<(Expression, Expression)>,
        default: Option<Box<Expression>>,
        span: Span,
    },
    /// `shortestPath(...)` / `allShortestPaths(...)` used as an expression
    /// (e.g. inside a `WHERE` predicate) rather than as a whole pattern.
    ShortestPathExpr { single: bool, pattern: Box<PatternPath>, span: Span },
    /// A construct the parser recognized but the validator always rejects
    /// (map-projections `n{.*}`, the `=~` regex operator, subscript
    /// assignment).
    Unsupported { description: String, span: Span },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier { span, .. }
            | Expression::Parameter { span, .. }
            | Expression::IntLiteral(_, span)
            | Expression::FloatLiteral(_, span)
            | Expression::StringLiteral(_, span)
            | Expression::BoolLiteral(_, span)
            | Expression::Null(span)
            | Expression::ListLiteral(_, span)
            | Expression::MapLiteral(_, span)
            | Expression::Property { span, .. }
            | Expression::Subscript { span, .. }
            | Expression::SliceSubscript { span, .. }
            | Expression::FunctionCall { span, .. }
            | Expression::BinaryOp { span, .. }
            | Expression::UnaryOp { span, .. }
            | Expression::ListComprehension { span, .. }
            | Expression::PatternComprehension { span, .. }
            | Expression::Reduce { span, .. }
            | Expression::CaseExpr { span, .. }
            | Expression::ShortestPathExpr { span, .. }
            | Expression::Unsupported { span, .. } => *span,
        }
    }

    /// True for the bare `identifier` shape DELETE/SET require.
    pub fn as_plain_identifier(&self) -> Option<&str> {
        match self {
            Expression::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }
}
