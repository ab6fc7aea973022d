use crate::substrate::{Brain, Diagnostics};
use crate::symbols::SymbolId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A read-only snapshot of what the brain currently holds.
///
/// Observers cannot mutate the brain. Snapshotting allocates names for every
/// context entry, so it is meant for debugging and reporting, not the
/// activation loop.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrainSnapshot {
    pub diagnostics: Diagnostics,
    /// One entry per level, newest first.
    pub levels: Vec<LevelSnapshot>,
    /// Derived symbols in creation order.
    pub patterns: Vec<PatternSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSnapshot {
    pub level: usize,
    pub context: Vec<ContextSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContextSnapshot {
    pub symbol: String,
    pub elevated: bool,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PatternSnapshot {
    pub id: SymbolId,
    pub name: String,
    /// Sum of pattern-edge counts naming this symbol as parent.
    pub strength: u64,
    /// Strongest learned successors at distance 1, as `(name, count)`.
    pub followed_by: Vec<(String, u32)>,
}

pub struct BrainAdapter<'a> {
    brain: &'a Brain,
}

impl<'a> BrainAdapter<'a> {
    pub fn new(brain: &'a Brain) -> Self {
        Self { brain }
    }

    pub fn snapshot(&self) -> BrainSnapshot {
        let ctx = self.brain.context();
        let levels = (0..ctx.depth())
            .map(|level| LevelSnapshot {
                level,
                context: ctx
                    .get(level)
                    .map(|e| ContextSnapshot {
                        symbol: self.name(e.symbol),
                        elevated: e.elevated,
                    })
                    .collect(),
            })
            .collect();

        let patterns = self
            .brain
            .symbols()
            .iter()
            .filter(|s| s.is_derived())
            .map(|s| PatternSnapshot {
                id: s.id,
                name: s.name.clone(),
                strength: self.brain.patterns().ideal_score(s.id),
                followed_by: self.top_successors(s.id, 3),
            })
            .collect();

        BrainSnapshot {
            diagnostics: self.brain.diagnostics(),
            levels,
            patterns,
        }
    }

    fn top_successors(&self, id: SymbolId, top_n: usize) -> Vec<(String, u32)> {
        let mut out: Vec<(SymbolId, u32)> = self
            .brain
            .transitions()
            .query(id, 1)
            .map(|t| (t.to, t.count))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out.truncate(top_n);
        out.into_iter().map(|(to, count)| (self.name(to), count)).collect()
    }

    fn name(&self, id: SymbolId) -> String {
        self.brain.symbol_name(id).unwrap_or("?").to_string()
    }
}
