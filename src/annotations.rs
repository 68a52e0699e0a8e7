//! The annotation-context collection.
//!
//! One `AnnotationContext` is built once by [`crate::builder::build`] and
//! shared (via `Arc`) read-only by the master handle and every segment
//! derived from it.

use std::cell::{Cell, RefCell};

use fnv::FnvHashMap;

use crate::ast::NodeId;
use crate::intern::Interner;

/// A name → "was it referenced" set, used to compute the import list for
/// rewritten returning subqueries and to decide which names a segment
/// boundary must keep alive.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    order: Vec<String>,
    seen: FnvHashMap<String, ()>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        ReferenceMap::default()
    }

    pub fn record(&mut self, name: &str) {
        if !self.seen.contains_key(name) {
            self.seen.insert(name.to_string(), ());
            self.order.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Shared, per-query side table keyed by [`NodeId`] instead of raw node
/// pointers (see DESIGN.md). Holds:
///
/// - the interner backing every identifier in the AST,
/// - the canonical alias of each pattern element (user-given, or a
///   generated `@anon_N`),
/// - a `to_string` cache so repeated calls return the same string.
#[derive(Debug)]
pub struct AnnotationContext {
    interner: RefCell<Interner>,
    anon_counter: Cell<u32>,
    alias_of: RefCell<FnvHashMap<NodeId, String>>,
    to_string_cache: RefCell<FnvHashMap<NodeId, String>>,
}

impl AnnotationContext {
    pub fn new() -> Self {
        AnnotationContext {
            interner: RefCell::new(Interner::new()),
            anon_counter: Cell::new(0),
            alias_of: RefCell::new(FnvHashMap::default()),
            to_string_cache: RefCell::new(FnvHashMap::default()),
        }
    }

    /// Interns `text`, returning a stable `Symbol`. Exposed so the builder
    /// and validator can canonicalize identifier spellings without
    /// allocating a fresh `String` per comparison.
    pub fn intern(&self, text: &str) -> crate::intern::Symbol {
        self.interner.borrow_mut().intern(text)
    }

    /// Allocates the next `@anon_N` name. Monotonic for the collection's
    /// lifetime.
    pub fn next_anon_name(&self) -> String {
        let n = self.anon_counter.get();
        self.anon_counter.set(n + 1);
        format!("@anon_{n}")
    }

    pub fn set_alias(&self, node: NodeId, name: impl Into<String>) {
        self.alias_of.borrow_mut().insert(node, name.into());
    }

    pub fn alias(&self, node: NodeId) -> Option<String> {
        self.alias_of.borrow().get(&node).cloned()
    }

    /// Every alias assigned so far (user-given or generated), in the order
    /// their owning nodes were built.
    pub fn all_aliases(&self) -> Vec<String> {
        let map = self.alias_of.borrow();
        let mut entries: Vec<(NodeId, String)> = map.iter().map(|(id, name)| (*id, name.clone())).collect();
        entries.sort_by_key(|(id, _)| id.0);
        entries.into_iter().map(|(_, name)| name).collect()
    }

    /// Returns (and caches) the display string for `node`, computing it
    /// with `compute` on first access only.
    pub fn to_string_cached(&self, node: NodeId, compute: impl FnOnce() -> String) -> String {
        if let Some(cached) = self.to_string_cache.borrow().get(&node) {
            return cached.clone();
        }
        let value = compute();
        self.to_string_cache.borrow_mut().insert(node, value.clone());
        value
    }
}

impl Default for AnnotationContext {
    fn default() -> Self {
        AnnotationContext::new()
    }
}
