//! Memoized equivalences between game states.
//!
//! Once the engine has proven a state [`Success`](crate::Terminal::Success),
//! every later occurrence of the same state can be closed by a reduction to the
//! node that proved it, regardless of the branch it occurs in.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::{FxHasher, FxHashSet};

use crate::game::GameState;
use crate::prooftree::NodeId;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Position in the insertion history of an [`EquivalenceCache`],
/// see [`rollback()`](EquivalenceCache::rollback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// Map from game states to the node that first proved them bisimilar.
///
/// A cache belongs to exactly one run of the engine.
/// Keys are compared by exact equality of both markings, in order:
/// `(a, b)` and `(b, a)` are different entries.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceCache {
    entries: FxIndexMap<GameState, NodeId>,
    reused: FxHashSet<NodeId>,
}

impl EquivalenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node that proved `state`, if it has been proven already.
    #[inline]
    pub fn lookup(&self, state: &GameState) -> Option<NodeId> {
        self.entries.get(state).copied()
    }

    /// Record that `node` proved `state`.
    ///
    /// The first node to prove a state is kept.
    /// Returns `false` if the state was already present.
    pub fn insert(&mut self, state: GameState, node: NodeId) -> bool {
        if self.entries.contains_key(&state) {
            return false;
        }
        self.entries.insert(state, node);
        true
    }

    /// Mark the entry proven by `node` as referenced by a reduction.
    pub fn reused(&mut self, node: NodeId) {
        self.reused.insert(node);
    }

    #[inline]
    pub fn is_reused(&self, node: NodeId) -> bool {
        self.reused.contains(&node)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current end of the insertion history.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.entries.len())
    }

    /// Forget every entry inserted after `checkpoint`.
    ///
    /// Used when a node fails: states proven inside its subtree may have relied
    /// on the node itself being bisimilar.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.entries.len() {
            return;
        }
        for (_, node) in self.entries.drain(checkpoint.0 ..) {
            self.reused.remove(&node);
        }
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item=(&GameState, NodeId)> {
        self.entries.iter().map(|(state, &node)| (state, node))
    }

    /// Entries that were referenced by at least one reduction, in insertion order.
    pub fn basis(&self) -> impl Iterator<Item=(&GameState, NodeId)> {
        self.iter().filter(|(_, node)| self.reused.contains(node))
    }
}
