// no_std support
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
use std::collections::VecDeque;

#[cfg(not(feature = "std"))]
use alloc::collections::VecDeque;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::symbols::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContextEntry {
    pub symbol: SymbolId,
    /// Already absorbed into a promoted pattern at this level.
    pub elevated: bool,
}

/// Bounded recent-activation history, one window per abstraction level.
/// Position 0 is always the newest entry.
#[derive(Debug, Clone)]
pub struct ContextWindows {
    size: usize,
    levels: Vec<VecDeque<ContextEntry>>,
}

impl ContextWindows {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            levels: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Prepend `symbol` at `level`, creating the level if needed and evicting
    /// the oldest entry beyond the window size.
    pub fn push(&mut self, level: usize, symbol: SymbolId) {
        while self.levels.len() <= level {
            self.levels.push(VecDeque::with_capacity(self.size + 1));
        }
        let window = &mut self.levels[level];
        window.push_front(ContextEntry {
            symbol,
            elevated: false,
        });
        window.truncate(self.size);
    }

    /// Entries at `level`, newest first. Empty for levels never reached.
    pub fn get(&self, level: usize) -> impl Iterator<Item = &ContextEntry> + '_ {
        self.levels.get(level).into_iter().flatten()
    }

    pub fn entry(&self, level: usize, position: usize) -> Option<&ContextEntry> {
        self.levels.get(level)?.get(position)
    }

    pub fn len(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, VecDeque::len)
    }

    /// Number of levels that have received at least one activation.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Flag entries `0..upto` at `level` as consumed by an elevation.
    pub fn mark_elevated(&mut self, level: usize, upto: usize) {
        if let Some(window) = self.levels.get_mut(level) {
            for entry in window.iter_mut().take(upto) {
                entry.elevated = true;
            }
        }
    }
}
