//! Graph pattern nodes: node/relationship patterns and paths.

use super::expr::Expression;
use super::NodeId;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,   // <-[...]-
    Right,  // -[...]->
    Either, // -[...]-
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarLength {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub id: NodeId,
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub id: NodeId,
    pub variable: Option<String>,
    pub types: Vec<String>,
    pub direction: Direction,
    pub properties: Option<Expression>,
    pub var_length: Option<VarLength>,
    pub span: Span,
}

/// The kind of whole-path wrapper around a chain of node/relationship
/// patterns: an ordinary path, or a `shortestPath`/`allShortestPaths` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Normal,
    ShortestPath,
    AllShortestPaths,
}

/// One `(a)-[r]->(b)` chain, optionally named (`p = ...`) and optionally
/// wrapped in `shortestPath`/`allShortestPaths`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternPath {
    pub variable: Option<String>,
    pub kind: PathKind,
    pub nodes: Vec<NodePattern>,
    pub rels: Vec<RelPattern>,
    pub span: Span,
}

impl PatternPath {
    /// All node/relationship aliases introduced by this path, in
    /// declaration order, paired with their type.
    pub fn aliases(&self) -> Vec<(&str, super::IdentifierType)> {
        let mut out = Vec::new();
        for n in &self.nodes {
            if let Some(name) = &n.variable {
                out.push((name.as_str(), super::IdentifierType::Node));
            }
        }
        for r in &self.rels {
            if let Some(name) = &r.variable {
                out.push((name.as_str(), super::IdentifierType::Edge));
            }
        }
        out
    }
}
