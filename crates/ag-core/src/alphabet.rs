//! Symbol interning.
//!
//! Raw symbols are mapped to dense ids in first-seen order. Ids are assigned
//! only while training ([`Alphabet::intern`]); scoring uses
//! [`Alphabet::lookup`], which maps every symbol outside the alphabet to the
//! reserved unknown id (`len()`).

use ag_common::{Error, Result};
use std::collections::HashMap;
use std::hash::Hash;

/// Dense symbol identifier.
pub type SymbolId = u32;

/// Bidirectional symbol ↔ id table.
#[derive(Debug, Clone)]
pub struct Alphabet<S> {
    ids: HashMap<S, SymbolId>,
    symbols: Vec<S>,
}

impl<S> Default for Alphabet<S> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            symbols: Vec::new(),
        }
    }
}

impl<S> Alphabet<S> {
    /// Reserved id for symbols outside the alphabet.
    pub fn unknown_id(&self) -> SymbolId {
        // intern() keeps len() below SymbolId::MAX.
        self.symbols.len() as SymbolId
    }

    /// Whether `id` denotes the unknown symbol.
    pub fn is_unknown(&self, id: SymbolId) -> bool {
        id as usize >= self.symbols.len()
    }

    /// Symbol for a trained id.
    pub fn symbol(&self, id: SymbolId) -> Option<&S> {
        self.symbols.get(id as usize)
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[S] {
        &self.symbols
    }

    /// Number of trained symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<S: Eq + Hash + Clone> Alphabet<S> {
    /// Create an empty alphabet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an alphabet from symbols listed in id order.
    ///
    /// Fails if a symbol appears twice.
    pub fn from_symbols(symbols: Vec<S>) -> Result<Self> {
        let mut alphabet = Self::new();
        for (index, symbol) in symbols.into_iter().enumerate() {
            if alphabet.ids.contains_key(&symbol) {
                return Err(Error::Snapshot(format!(
                    "duplicate symbol at alphabet index {}",
                    index
                )));
            }
            alphabet.intern(&symbol)?;
        }
        Ok(alphabet)
    }

    /// Return the id for `symbol`, assigning the next free id if unseen.
    pub fn intern(&mut self, symbol: &S) -> Result<SymbolId> {
        if let Some(&id) = self.ids.get(symbol) {
            return Ok(id);
        }
        // The last u32 value is kept free for the unknown id.
        let id = SymbolId::try_from(self.symbols.len())
            .ok()
            .filter(|&id| id < SymbolId::MAX)
            .ok_or_else(|| Error::invalid_input("alphabet exceeds the supported symbol count"))?;
        self.ids.insert(symbol.clone(), id);
        self.symbols.push(symbol.clone());
        Ok(id)
    }

    /// Id of a trained symbol, or `None`.
    pub fn get(&self, symbol: &S) -> Option<SymbolId> {
        self.ids.get(symbol).copied()
    }

    /// Id of `symbol`, or [`Alphabet::unknown_id`] if it was never interned.
    pub fn lookup(&self, symbol: &S) -> SymbolId {
        self.get(symbol).unwrap_or_else(|| self.unknown_id())
    }

    /// Map a whole sequence through [`Alphabet::lookup`].
    pub fn encode(&self, sequence: &[S]) -> Vec<SymbolId> {
        sequence.iter().map(|s| self.lookup(s)).collect()
    }
}
