// no_std support
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
use std::collections::BTreeMap;

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::context::ContextWindows;
use crate::patterns::PatternIndex;
use crate::symbols::{SymbolId, SymbolTable};
use crate::transitions::TransitionIndex;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BrainConfig {
    /// Minimum association count before it is trusted, both for prediction
    /// and for pattern detection.
    pub learning_rate: u32,

    /// Window length per abstraction level. Also sets the distance weight
    /// step (`1 / context_size`).
    pub context_size: usize,

    /// Multiplier applied to a higher level's prediction when it is merged
    /// into the level below. Level `L` receives `factor * (L + 1)`.
    pub level_weight_factor: f64,

    /// A known parent pattern is reused only when its match score reaches this
    /// fraction of its ideal score. Range (0, 1].
    pub pattern_fit_ratio: f64,

    /// Hard cap on abstraction depth. Activations that would elevate past it
    /// simply stop elevating.
    pub max_levels: usize,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 2,
            context_size: 10,
            level_weight_factor: 1.0,
            pattern_fit_ratio: 0.8,
            max_levels: 32,
        }
    }
}

impl BrainConfig {
    pub const MIN_CONTEXT: usize = 2;
    pub const MAX_CONTEXT: usize = 1024;

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.learning_rate == 0 {
            return Err("learning_rate must be >= 1");
        }
        if self.context_size < Self::MIN_CONTEXT {
            return Err("context_size must be >= 2");
        }
        if self.context_size > Self::MAX_CONTEXT {
            return Err("context_size too large");
        }
        if !self.level_weight_factor.is_finite() || self.level_weight_factor < 0.0 {
            return Err("level_weight_factor must be finite and >= 0");
        }
        if !(self.pattern_fit_ratio > 0.0 && self.pattern_fit_ratio <= 1.0) {
            return Err("pattern_fit_ratio must be in (0, 1]");
        }
        if self.max_levels == 0 {
            return Err("max_levels must be >= 1");
        }
        Ok(())
    }

    pub fn with_learning_rate(mut self, rate: u32) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn with_context_size(mut self, size: usize) -> Self {
        self.context_size = size;
        self
    }

    pub fn with_level_weight_factor(mut self, factor: f64) -> Self {
        self.level_weight_factor = factor;
        self
    }

    pub fn with_pattern_fit_ratio(mut self, ratio: f64) -> Self {
        self.pattern_fit_ratio = ratio;
        self
    }

    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels;
        self
    }

    /// Linear decay from `1 + step` at distance 0 down to a floor of `step`,
    /// where `step = 1 / context_size`. Never reaches zero.
    #[inline]
    pub fn weight(&self, distance: u32) -> f64 {
        let step = 1.0 / self.context_size.max(1) as f64;
        (1.0 + step - distance as f64 * step).max(step)
    }
}

/// Candidate next symbols with their accumulated scores, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Prediction {
    scores: BTreeMap<SymbolId, f64>,
}

impl Prediction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: SymbolId, score: f64) {
        *self.scores.entry(symbol).or_insert(0.0) += score;
    }

    /// Add every score of `other`, multiplied by `scale`.
    pub fn merge_scaled(&mut self, other: &Prediction, scale: f64) {
        for (&symbol, &score) in &other.scores {
            self.add(symbol, score * scale);
        }
    }

    pub fn score(&self, symbol: SymbolId) -> Option<f64> {
        self.scores.get(&symbol).copied()
    }

    /// Highest-scoring symbol; ties go to the lowest id.
    pub fn best(&self) -> Option<(SymbolId, f64)> {
        let mut best: Option<(SymbolId, f64)> = None;
        for (&symbol, &score) in &self.scores {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((symbol, score));
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, f64)> + '_ {
        self.scores.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    pub symbol_count: usize,
    pub base_symbols: usize,
    pub derived_symbols: usize,
    pub transition_count: usize,
    pub pattern_edge_count: usize,
    pub levels: usize,
    /// Context pushes across all levels.
    pub activations: u64,
    pub elevations: u64,
    /// Elevations skipped because `max_levels` was reached.
    pub depth_cap_hits: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SleepReport {
    pub transitions_pruned: usize,
    pub pattern_edges_pruned: usize,
}

/// Hierarchical sequence learner.
///
/// Every activation updates the model and returns its prediction for the next
/// symbol at the activated level, including votes from any levels above it
/// that the activation reached through elevation.
#[derive(Debug, Clone)]
pub struct Brain {
    cfg: BrainConfig,
    symbols: SymbolTable,
    transitions: TransitionIndex,
    patterns: PatternIndex,
    context: ContextWindows,

    activations: u64,
    elevations: u64,
    depth_cap_hits: u64,
}

impl Brain {
    pub fn new(cfg: BrainConfig) -> Self {
        let context = ContextWindows::new(cfg.context_size);
        Self {
            cfg,
            symbols: SymbolTable::new(),
            transitions: TransitionIndex::new(),
            patterns: PatternIndex::new(),
            context,
            activations: 0,
            elevations: 0,
            depth_cap_hits: 0,
        }
    }

    pub fn config(&self) -> &BrainConfig {
        &self.cfg
    }

    /// Register a base (leaf) symbol.
    pub fn define_symbol(&mut self, name: &str) -> SymbolId {
        self.symbols.create(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn transitions(&self) -> &TransitionIndex {
        &self.transitions
    }

    pub fn patterns(&self) -> &PatternIndex {
        &self.patterns
    }

    pub fn context(&self) -> &ContextWindows {
        &self.context
    }

    pub fn symbol_name(&self, id: SymbolId) -> Option<&str> {
        self.symbols.name(id)
    }

    pub fn base_of(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbols.base_of(id)
    }

    /// Activate `symbol` at level 0.
    pub fn activate(&mut self, symbol: SymbolId) -> Option<Prediction> {
        self.activate_at(symbol, 0)
    }

    /// Activate `symbol` at `level` and return the merged prediction, or
    /// `None` while that level's window holds fewer than two entries.
    ///
    /// Elevation is driven as a loop over increasing levels. Each level's own
    /// prediction is kept on a stack and the merge runs top-down afterwards, so
    /// deep hierarchies never grow the call stack.
    pub fn activate_at(&mut self, symbol: SymbolId, level: usize) -> Option<Prediction> {
        let mut frames: Vec<(usize, Prediction)> = Vec::new();
        let mut symbol = symbol;
        let mut level = level;

        loop {
            self.context.push(level, symbol);
            self.activations += 1;
            if self.context.len(level) < 2 {
                break;
            }

            self.learn(level, symbol);
            frames.push((level, self.predict(level)));

            if level + 1 >= self.cfg.max_levels {
                if self.pattern_break(level) > 1 {
                    self.depth_cap_hits += 1;
                }
                break;
            }

            match self.elevate(level) {
                Some(parent) => {
                    symbol = parent;
                    level += 1;
                }
                None => break,
            }
        }

        let mut upper: Option<Prediction> = None;
        while let Some((lvl, mut prediction)) = frames.pop() {
            if let Some(above) = upper.take() {
                prediction.merge_scaled(&above, self.cfg.level_weight_factor * (lvl + 1) as f64);
            }
            upper = Some(prediction);
        }
        upper
    }

    // Every older entry learns that `symbol` followed it at its distance.
    fn learn(&mut self, level: usize, symbol: SymbolId) {
        for (i, entry) in self.context.get(level).enumerate().skip(1) {
            self.transitions.record(entry.symbol, symbol, i as u32);
        }
    }

    fn predict(&self, level: usize) -> Prediction {
        let mut prediction = Prediction::new();
        for (i, entry) in self.context.get(level).enumerate() {
            let distance = i as u32 + 1;
            let weight = self.cfg.weight(distance);
            for t in self.transitions.query(entry.symbol, distance) {
                if t.count < self.cfg.learning_rate {
                    continue;
                }
                prediction.add(t.to, t.count as f64 * weight);
            }
        }
        prediction
    }

    fn is_pattern(&self, older: SymbolId, newer: SymbolId) -> bool {
        self.transitions.count(older, newer, 1) >= self.cfg.learning_rate
    }

    /// Length of the leading run of unconsumed entries where each older entry
    /// reliably precedes its newer neighbour.
    fn pattern_break(&self, level: usize) -> usize {
        let len = self.context.len(level);
        for p in 1..len {
            let (Some(newer), Some(older)) =
                (self.context.entry(level, p - 1), self.context.entry(level, p))
            else {
                return p;
            };
            if newer.elevated || older.elevated || !self.is_pattern(older.symbol, newer.symbol) {
                return p;
            }
        }
        len
    }

    /// Promote the leading run at `level` to a parent symbol and return it.
    fn elevate(&mut self, level: usize) -> Option<SymbolId> {
        let run = self.pattern_break(level);
        if run <= 1 {
            return None;
        }

        self.context.mark_elevated(level, run);
        let mut detected: Vec<SymbolId> = self.context.get(level).take(run).map(|e| e.symbol).collect();
        detected.reverse();

        let parent = match self.resolve_parent(&detected) {
            Some(parent) => parent,
            None => self.symbols.create_pattern(detected.clone()),
        };
        for (position, &child) in detected.iter().enumerate() {
            self.patterns.record(child, parent, position as u32);
        }
        self.elevations += 1;
        Some(parent)
    }

    /// Best existing parent for `detected`, if any scores at least
    /// `pattern_fit_ratio` of its ideal score.
    fn resolve_parent(&self, detected: &[SymbolId]) -> Option<SymbolId> {
        let mut scores: BTreeMap<SymbolId, f64> = BTreeMap::new();
        for (p, &child) in detected.iter().enumerate() {
            let p = p as u32;
            for edge in self.patterns.by_child(child) {
                if edge.position != p {
                    continue;
                }
                let weight = self.cfg.weight(edge.position.abs_diff(p));
                *scores.entry(edge.parent).or_insert(0.0) += edge.count as f64 * weight;
            }
        }

        let mut best: Option<(SymbolId, f64)> = None;
        for (parent, score) in scores {
            let ideal = self.patterns.ideal_score(parent) as f64;
            if score < self.cfg.pattern_fit_ratio * ideal {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((parent, score));
            }
        }
        best.map(|(parent, _)| parent)
    }

    /// Opt-in maintenance pass: scale every association and pattern-edge count
    /// by `retention` and drop those below `prune_below`. Symbols and context
    /// windows are left untouched.
    pub fn sleep(&mut self, retention: f64, prune_below: u32) -> SleepReport {
        SleepReport {
            transitions_pruned: self.transitions.decay_and_prune(retention, prune_below),
            pattern_edges_pruned: self.patterns.decay_and_prune(retention, prune_below),
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let derived = self.symbols.derived_count();
        Diagnostics {
            symbol_count: self.symbols.len(),
            base_symbols: self.symbols.len() - derived,
            derived_symbols: derived,
            transition_count: self.transitions.len(),
            pattern_edge_count: self.patterns.len(),
            levels: self.context.depth(),
            activations: self.activations,
            elevations: self.elevations,
            depth_cap_hits: self.depth_cap_hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brain_with(names: &[&str]) -> (Brain, Vec<SymbolId>) {
        let mut brain = Brain::new(BrainConfig::default());
        let ids = names.iter().map(|n| brain.define_symbol(n)).collect();
        (brain, ids)
    }

    #[test]
    fn config_defaults_validate() {
        let cfg = BrainConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.learning_rate, 2);
        assert_eq!(cfg.context_size, 10);
        assert!(cfg.clone().with_learning_rate(0).validate().is_err());
        assert!(cfg.clone().with_context_size(1).validate().is_err());
        assert!(cfg.clone().with_pattern_fit_ratio(0.0).validate().is_err());
        assert!(cfg.clone().with_level_weight_factor(f64::NAN).validate().is_err());
        assert!(cfg.with_max_levels(0).validate().is_err());
    }

    #[test]
    fn weight_decays_linearly_to_floor() {
        let cfg = BrainConfig::default();
        assert!((cfg.weight(1) - 1.0).abs() < 1e-12);
        assert!((cfg.weight(5) - 0.6).abs() < 1e-12);
        assert!((cfg.weight(10) - 0.1).abs() < 1e-12);
        assert!((cfg.weight(40) - 0.1).abs() < 1e-12);
        assert!(cfg.weight(3) > cfg.weight(4));
    }

    #[test]
    fn prediction_merge_and_best() {
        let mut low = Prediction::new();
        low.add(3, 1.0);
        low.add(5, 2.0);
        let mut high = Prediction::new();
        high.add(3, 1.0);
        high.add(9, 0.5);

        low.merge_scaled(&high, 2.0);
        assert_eq!(low.score(3), Some(3.0));
        assert_eq!(low.score(9), Some(1.0));
        assert_eq!(low.best(), Some((3, 3.0)));

        let mut tie = Prediction::new();
        tie.add(8, 1.0);
        tie.add(2, 1.0);
        assert_eq!(tie.best(), Some((2, 1.0)));
        assert_eq!(Prediction::new().best(), None);
    }

    #[test]
    fn single_entry_window_has_no_prediction() {
        let (mut brain, ids) = brain_with(&["a"]);
        assert!(brain.activate(ids[0]).is_none());
        assert!(brain.activate(ids[0]).is_some());
    }

    #[test]
    fn learning_records_every_distance_in_window() {
        let (mut brain, ids) = brain_with(&["a", "b", "c"]);
        for &id in &ids {
            brain.activate(id);
        }
        let t = brain.transitions();
        assert_eq!(t.count(ids[0], ids[1], 1), 1);
        assert_eq!(t.count(ids[1], ids[2], 1), 1);
        assert_eq!(t.count(ids[0], ids[2], 2), 1);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn weak_associations_are_not_trusted() {
        let (mut brain, ids) = brain_with(&["a", "b"]);
        brain.activate(ids[0]);
        let p = brain.activate(ids[1]).unwrap();
        // a -> b seen once, below the default learning rate of 2.
        assert!(p.is_empty());
    }

    #[test]
    fn repeated_symbol_predicts_itself() {
        let (mut brain, ids) = brain_with(&["up"]);
        let up = ids[0];
        brain.activate(up);
        brain.activate(up);
        let p = brain.activate(up).unwrap();
        assert_eq!(p.best().map(|(s, _)| s), Some(up));
        // up -> up at distance 1 has count 2, weight 1.0.
        assert!((p.score(up).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn window_bound_holds_at_every_level() {
        let (mut brain, ids) = brain_with(&["a", "b", "c"]);
        for i in 0..500 {
            brain.activate(ids[i % 3]);
            for level in 0..brain.context().depth() {
                assert!(brain.context().len(level) <= brain.config().context_size);
            }
        }
    }

    #[test]
    fn elevation_promotes_a_reliable_run() {
        let (mut brain, ids) = brain_with(&["up"]);
        let up = ids[0];
        for _ in 0..3 {
            brain.activate(up);
        }

        let d = brain.diagnostics();
        assert_eq!(d.elevations, 1);
        assert_eq!(d.derived_symbols, 1);
        assert_eq!(d.levels, 2);

        let parent = brain.context().entry(1, 0).unwrap().symbol;
        let sym = brain.symbols().get(parent).unwrap();
        assert_eq!(sym.pattern.as_deref(), Some(&[up, up, up][..]));
        assert_eq!(sym.name, "[up,up,up]");
        assert_eq!(brain.base_of(parent), Some(up));

        // One edge per position of the new pattern.
        for position in 0..3 {
            assert_eq!(brain.patterns().get(up, parent, position).map(|e| e.count), Some(1));
        }
        assert!(brain.context().get(0).all(|e| e.elevated));
    }

    #[test]
    fn consumed_entries_are_not_elevated_twice() {
        let (mut brain, ids) = brain_with(&["up"]);
        let up = ids[0];
        for _ in 0..4 {
            brain.activate(up);
        }
        // The fourth entry's neighbour was already consumed by the first
        // elevation, so no second pattern forms yet.
        assert_eq!(brain.diagnostics().elevations, 1);

        brain.activate(up);
        let d = brain.diagnostics();
        assert_eq!(d.elevations, 2);
        let flags: Vec<bool> = brain.context().get(0).map(|e| e.elevated).collect();
        assert_eq!(flags, vec![true, true, true, true, true]);
    }

    fn run_alternating(
        cfg: BrainConfig,
        pairs: usize,
    ) -> (Brain, SymbolId, SymbolId, Option<Prediction>) {
        let mut brain = Brain::new(cfg);
        let a = brain.define_symbol("a");
        let b = brain.define_symbol("b");
        let mut last = None;
        for _ in 0..pairs {
            brain.activate(a);
            last = brain.activate(b);
        }
        (brain, a, b, last)
    }

    fn derived_named(brain: &Brain, name: &str) -> Option<SymbolId> {
        brain
            .symbols()
            .iter()
            .find(|s| s.is_derived() && s.name == name)
            .map(|s| s.id)
    }

    #[test]
    fn repeated_run_reuses_its_parent() {
        let (brain, a, b, _) = run_alternating(BrainConfig::default(), 3);
        let d = brain.diagnostics();
        assert_eq!(d.elevations, 2);
        assert_eq!(d.derived_symbols, 1);

        let ab = derived_named(&brain, "[a,b]").unwrap();
        assert_eq!(brain.patterns().get(a, ab, 0).map(|e| e.count), Some(2));
        assert_eq!(brain.patterns().get(b, ab, 1).map(|e| e.count), Some(2));
        let upper: Vec<SymbolId> = brain.context().get(1).map(|e| e.symbol).collect();
        assert_eq!(upper, vec![ab, ab]);
    }

    #[test]
    fn partial_match_below_fit_ratio_creates_a_new_parent() {
        // After six pairs, level 1 sees the run [ab,ab] while [ab,ab,ab] holds
        // three edges of count 1: score 2.2 against an ideal of 3.
        let (brain, _, _, _) = run_alternating(BrainConfig::default(), 6);
        let ab = derived_named(&brain, "[a,b]").unwrap();
        let triple = derived_named(&brain, "[[a,b],[a,b],[a,b]]").unwrap();
        assert!(derived_named(&brain, "[[a,b],[a,b]]").is_some());
        assert_eq!(brain.diagnostics().derived_symbols, 3);
        for position in 0..3 {
            assert_eq!(brain.patterns().get(ab, triple, position).map(|e| e.count), Some(1));
        }

        // A looser cutoff accepts the same partial run as the longer pattern.
        let cfg = BrainConfig::default().with_pattern_fit_ratio(0.7);
        let (brain, _, _, _) = run_alternating(cfg, 6);
        let ab = derived_named(&brain, "[a,b]").unwrap();
        let triple = derived_named(&brain, "[[a,b],[a,b],[a,b]]").unwrap();
        assert_eq!(derived_named(&brain, "[[a,b],[a,b]]"), None);
        assert_eq!(brain.diagnostics().derived_symbols, 2);
        assert_eq!(brain.patterns().get(ab, triple, 0).map(|e| e.count), Some(2));
        assert_eq!(brain.patterns().get(ab, triple, 1).map(|e| e.count), Some(2));
        assert_eq!(brain.patterns().get(ab, triple, 2).map(|e| e.count), Some(1));
    }

    #[test]
    fn upper_level_prediction_is_scaled_into_the_merge() {
        // After four pairs, level 1 holds [ab,ab,ab] and predicts ab with
        // score 2; level 0 alone predicts a.
        for (factor, expected) in [(1.0, 2.0), (2.0, 4.0)] {
            let cfg = BrainConfig::default().with_level_weight_factor(factor);
            let (brain, a, _, last) = run_alternating(cfg, 4);
            let ab = derived_named(&brain, "[a,b]").unwrap();
            let p = last.unwrap();
            assert_eq!(p.len(), 2);
            assert!((p.score(ab).unwrap() - expected).abs() < 1e-9);
            assert!((p.score(a).unwrap() - 8.7).abs() < 1e-9);
            assert_eq!(p.best().map(|(s, _)| s), Some(a));
        }
    }

    #[test]
    fn elevation_requires_two_symbols() {
        let (mut brain, ids) = brain_with(&["a", "b", "c", "d"]);
        // No pair repeats, so no run ever reaches the learning rate.
        for &id in &ids {
            brain.activate(id);
        }
        assert_eq!(brain.diagnostics().elevations, 0);
        assert_eq!(brain.diagnostics().derived_symbols, 0);
    }

    #[test]
    fn depth_cap_stops_elevating_without_failing() {
        let mut brain = Brain::new(BrainConfig::default().with_max_levels(1));
        let up = brain.define_symbol("up");
        for _ in 0..6 {
            assert!(brain.activate(up).is_some() || brain.context().len(0) < 2);
        }
        let d = brain.diagnostics();
        assert_eq!(d.elevations, 0);
        assert_eq!(d.levels, 1);
        assert!(d.depth_cap_hits > 0);
    }

    #[test]
    fn activation_is_deterministic() {
        let run = || {
            let (mut brain, ids) = brain_with(&["a", "b", "c"]);
            let seq = [0usize, 1, 2, 0, 1, 2, 0, 1, 1, 2, 0, 1, 2, 0, 1];
            let mut last = None;
            for &i in &seq {
                last = brain.activate(ids[i]);
            }
            (last, brain.diagnostics().symbol_count, brain.transitions().len())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn sleep_prunes_weak_evidence() {
        let (mut brain, ids) = brain_with(&["a", "b"]);
        for i in 0..6 {
            brain.activate(ids[i % 2]);
        }
        let before = brain.diagnostics();
        let report = brain.sleep(0.5, 1);
        let after = brain.diagnostics();

        assert!(report.transitions_pruned > 0);
        assert_eq!(after.transition_count, before.transition_count - report.transitions_pruned);
        assert_eq!(after.symbol_count, before.symbol_count);
        // Surviving associations still answer keyed lookups.
        assert!(brain.transitions().count(ids[0], ids[1], 1) >= 1);
    }
}
