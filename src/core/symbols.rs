// no_std support
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense symbol identifier. The first symbol created gets id 1.
pub type SymbolId = u32;

/// A discrete unit: either a quantized base observation (leaf) or a learned
/// sequence of other symbols (derived).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    /// Chronological children of a derived symbol. `None` for leaves.
    pub pattern: Option<Vec<SymbolId>>,
}

impl Symbol {
    #[inline]
    pub fn is_derived(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Append-only store of symbols. Ids are never reused.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a leaf symbol and return its id.
    pub fn create(&mut self, name: impl Into<String>) -> SymbolId {
        self.push(name.into(), None)
    }

    /// Create a derived symbol whose display name is the bracketed list of its
    /// children's names, e.g. `[45deg,45deg]`.
    pub fn create_pattern(&mut self, pattern: Vec<SymbolId>) -> SymbolId {
        let mut name = String::from("[");
        for (i, &child) in pattern.iter().enumerate() {
            if i > 0 {
                name.push(',');
            }
            name.push_str(self.name(child).unwrap_or("?"));
        }
        name.push(']');
        self.push(name, Some(pattern))
    }

    fn push(&mut self, name: String, pattern: Option<Vec<SymbolId>>) -> SymbolId {
        let id = self.symbols.len() as SymbolId + 1;
        self.symbols.push(Symbol { id, name, pattern });
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        let idx = (id as usize).checked_sub(1)?;
        self.symbols.get(idx)
    }

    pub fn name(&self, id: SymbolId) -> Option<&str> {
        self.get(id).map(|s| s.name.as_str())
    }

    /// Follow `pattern[0]` down to the earliest leaf the symbol derives from.
    pub fn base_of(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = self.get(id)?;
        while let Some(first) = current.pattern.as_ref().and_then(|p| p.first()) {
            current = self.get(*first)?;
        }
        Some(current.id)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn derived_count(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_derived()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}
