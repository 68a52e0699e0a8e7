//! The validation environment.

use fnv::FnvHashMap;

use crate::ast::{ClauseKind, IdentifierType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionAll {
    NotDefined,
    Regular,
    All,
}

/// Mutable state threaded through one query scope's validation. A fresh
/// `Environment` is created on entering a scope (top-level query, `CALL
/// {...}` subquery, `UNION` branch, non-star `WITH`, `FOREACH` body) and
/// discarded on leaving it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub defined_identifiers: FnvHashMap<String, IdentifierType>,
    pub clause: ClauseKind,
    pub union_all: UnionAll,
    pub ignore_identifiers: bool,
}

impl Environment {
    pub fn new(clause: ClauseKind) -> Self {
        Environment {
            defined_identifiers: FnvHashMap::default(),
            clause,
            union_all: UnionAll::NotDefined,
            ignore_identifiers: false,
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.ignore_identifiers || self.defined_identifiers.contains_key(name)
    }

    pub fn type_of(&self, name: &str) -> Option<IdentifierType> {
        self.defined_identifiers.get(name).copied()
    }
}
