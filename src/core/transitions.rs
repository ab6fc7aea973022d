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

/// Learned precedence: `to` was activated `distance` steps after `from`,
/// `count` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transition {
    pub from: SymbolId,
    pub to: SymbolId,
    pub distance: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitionStats {
    pub transitions: usize,
    pub sources: usize,
    pub targets: usize,
    pub total_count: u64,
}

/// Distance-labeled association graph between symbols.
///
/// Records live in one vector; the hash maps hold indices into it, so lookups
/// by key, by source and by target never scan the full record list.
#[derive(Debug, Clone, Default)]
pub struct TransitionIndex {
    records: Vec<Transition>,
    by_key: HashMap<(SymbolId, SymbolId, u32), usize>,
    by_from: HashMap<SymbolId, Vec<usize>>,
    by_to: HashMap<SymbolId, Vec<usize>>,
}

impl TransitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more observation of `from -> to` at `distance`. Returns the
    /// updated count.
    pub fn record(&mut self, from: SymbolId, to: SymbolId, distance: u32) -> u32 {
        if let Some(&idx) = self.by_key.get(&(from, to, distance)) {
            let t = &mut self.records[idx];
            t.count = t.count.saturating_add(1);
            return t.count;
        }
        self.insert(Transition {
            from,
            to,
            distance,
            count: 1,
        });
        1
    }

    fn insert(&mut self, t: Transition) {
        let idx = self.records.len();
        self.by_key.insert((t.from, t.to, t.distance), idx);
        self.by_from.entry(t.from).or_default().push(idx);
        self.by_to.entry(t.to).or_default().push(idx);
        self.records.push(t);
    }

    pub fn get(&self, from: SymbolId, to: SymbolId, distance: u32) -> Option<&Transition> {
        self.by_key
            .get(&(from, to, distance))
            .map(|&idx| &self.records[idx])
    }

    /// Count for an exact key, 0 when never observed.
    pub fn count(&self, from: SymbolId, to: SymbolId, distance: u32) -> u32 {
        self.get(from, to, distance).map(|t| t.count).unwrap_or(0)
    }

    /// All associations leaving `from` at exactly `distance`, in insertion order.
    pub fn query(&self, from: SymbolId, distance: u32) -> impl Iterator<Item = &Transition> + '_ {
        self.outgoing(from).filter(move |t| t.distance == distance)
    }

    pub fn outgoing(&self, from: SymbolId) -> impl Iterator<Item = &Transition> + '_ {
        self.by_from
            .get(&from)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.records[idx])
    }

    pub fn incoming(&self, to: SymbolId) -> impl Iterator<Item = &Transition> + '_ {
        self.by_to
            .get(&to)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> TransitionStats {
        TransitionStats {
            transitions: self.records.len(),
            sources: self.by_from.len(),
            targets: self.by_to.len(),
            total_count: self.records.iter().map(|t| t.count as u64).sum(),
        }
    }

    /// Scale every count by `retention` (floored) and drop records that fall
    /// below `prune_below`. Survivors keep their relative order. Returns the
    /// number of removed records.
    pub fn decay_and_prune(&mut self, retention: f64, prune_below: u32) -> usize {
        let retention = retention.clamp(0.0, 1.0);
        let before = self.records.len();
        let kept: Vec<Transition> = self
            .records
            .drain(..)
            .filter_map(|mut t| {
                t.count = (t.count as f64 * retention) as u32;
                (t.count >= prune_below.max(1)).then_some(t)
            })
            .collect();

        self.by_key.clear();
        self.by_from.clear();
        self.by_to.clear();
        for t in kept {
            self.insert(t);
        }
        before - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_observation_counts_up() {
        let mut idx = TransitionIndex::new();
        for n in 1..=5 {
            assert_eq!(idx.record(1, 2, 1), n);
        }
        assert_eq!(idx.count(1, 2, 1), 5);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn key_includes_distance() {
        let mut idx = TransitionIndex::new();
        idx.record(1, 2, 1);
        idx.record(1, 2, 2);
        idx.record(1, 2, 2);

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.count(1, 2, 1), 1);
        assert_eq!(idx.count(1, 2, 2), 2);
        assert_eq!(idx.count(2, 1, 1), 0);
    }

    #[test]
    fn query_filters_by_source_and_distance() {
        let mut idx = TransitionIndex::new();
        idx.record(1, 2, 1);
        idx.record(1, 3, 1);
        idx.record(1, 4, 2);
        idx.record(5, 2, 1);

        let at_one: Vec<SymbolId> = idx.query(1, 1).map(|t| t.to).collect();
        assert_eq!(at_one, vec![2, 3]);
        let at_two: Vec<SymbolId> = idx.query(1, 2).map(|t| t.to).collect();
        assert_eq!(at_two, vec![4]);
        assert_eq!(idx.query(9, 1).count(), 0);
    }

    #[test]
    fn incoming_uses_target_index() {
        let mut idx = TransitionIndex::new();
        idx.record(1, 2, 1);
        idx.record(5, 2, 3);
        idx.record(1, 3, 1);

        let mut sources: Vec<SymbolId> = idx.incoming(2).map(|t| t.from).collect();
        sources.sort_unstable();
        assert_eq!(sources, vec![1, 5]);

        let stats = idx.stats();
        assert_eq!(stats.transitions, 3);
        assert_eq!(stats.sources, 2);
        assert_eq!(stats.targets, 2);
        assert_eq!(stats.total_count, 3);
    }

    #[test]
    fn decay_prunes_weak_records_and_keeps_indexes_consistent() {
        let mut idx = TransitionIndex::new();
        for _ in 0..10 {
            idx.record(1, 2, 1);
        }
        idx.record(1, 3, 1);
        idx.record(4, 2, 1);

        let removed = idx.decay_and_prune(0.5, 2);
        assert_eq!(removed, 2);
        assert_eq!(idx.count(1, 2, 1), 5);
        assert!(idx.get(1, 3, 1).is_none());
        assert_eq!(idx.incoming(2).count(), 1);
        assert_eq!(idx.outgoing(4).count(), 0);

        // Indexes point at the compacted records.
        assert_eq!(idx.record(1, 2, 1), 6);
        assert_eq!(idx.record(4, 2, 1), 1);
    }
}
