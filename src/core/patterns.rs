// no_std support
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(not(feature = "std"))]
use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::symbols::SymbolId;

/// Membership of `child` at `position` inside the derived symbol `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PatternEdge {
    pub child: SymbolId,
    pub parent: SymbolId,
    pub position: u32,
    pub count: u32,
}

/// Position-labeled child/parent graph. Same layout as the transition index:
/// one record vector plus index maps into it.
#[derive(Debug, Clone, Default)]
pub struct PatternIndex {
    edges: Vec<PatternEdge>,
    by_key: HashMap<(SymbolId, SymbolId, u32), usize>,
    by_child: HashMap<SymbolId, Vec<usize>>,
    by_parent: HashMap<SymbolId, Vec<usize>>,
}

impl PatternIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, child: SymbolId, parent: SymbolId, position: u32) -> u32 {
        if let Some(&idx) = self.by_key.get(&(child, parent, position)) {
            let e = &mut self.edges[idx];
            e.count = e.count.saturating_add(1);
            return e.count;
        }
        self.insert(PatternEdge {
            child,
            parent,
            position,
            count: 1,
        });
        1
    }

    fn insert(&mut self, e: PatternEdge) {
        let idx = self.edges.len();
        self.by_key.insert((e.child, e.parent, e.position), idx);
        self.by_child.entry(e.child).or_default().push(idx);
        self.by_parent.entry(e.parent).or_default().push(idx);
        self.edges.push(e);
    }

    pub fn get(&self, child: SymbolId, parent: SymbolId, position: u32) -> Option<&PatternEdge> {
        self.by_key
            .get(&(child, parent, position))
            .map(|&idx| &self.edges[idx])
    }

    pub fn by_child(&self, child: SymbolId) -> impl Iterator<Item = &PatternEdge> + '_ {
        self.by_child
            .get(&child)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn by_parent(&self, parent: SymbolId) -> impl Iterator<Item = &PatternEdge> + '_ {
        self.by_parent
            .get(&parent)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    /// Score a parent would get if every one of its positions matched: the sum
    /// of all edge counts naming it as parent.
    pub fn ideal_score(&self, parent: SymbolId) -> u64 {
        self.by_parent(parent).map(|e| e.count as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// See [`crate::transitions::TransitionIndex::decay_and_prune`].
    pub fn decay_and_prune(&mut self, retention: f64, prune_below: u32) -> usize {
        let retention = retention.clamp(0.0, 1.0);
        let before = self.edges.len();
        let kept: Vec<PatternEdge> = self
            .edges
            .drain(..)
            .filter_map(|mut e| {
                e.count = (e.count as f64 * retention) as u32;
                (e.count >= prune_below.max(1)).then_some(e)
            })
            .collect();

        self.by_key.clear();
        self.by_child.clear();
        self.by_parent.clear();
        for e in kept {
            self.insert(e);
        }
        before - self.edges.len()
    }
}
