//! Context grid: per-order next-symbol frequency tables.
//!
//! For every order `k` in `0..=max_order` the grid keeps a table mapping a
//! context (the `k` symbol ids immediately preceding a position) to the counts
//! of the symbols observed next. Order 0 has a single, empty context and acts
//! as the unconditional distribution.
//!
//! # Build rule
//!
//! For a training sequence `s` of length `n`, every position `i` contributes
//! to each order `k <= min(max_order, i)` with context `s[i-k..i]` and next
//! symbol `s[i]`. Positions with `i < k` never contribute to order `k`; no
//! partial-length contexts are recorded.
//!
//! # Sharding
//!
//! Count accumulation is associative and commutative, so a corpus can be split
//! into shards, built independently, and merged with exact integer addition.
//! The merged grid is identical for every shard count and merge order.
//!
//! # Capacity
//!
//! The number of stored contexts per order is bounded by
//! `min(V^k, total training symbols)`. A high `max_order` over a large
//! alphabet can make the grid very large.
//!
//! Tables are materialized only up to the highest order that has received a
//! count, i.e. `min(max_order, longest sequence - 1)`. Orders beyond that have
//! no table and no support, so `max_order` itself costs nothing.

use crate::alphabet::SymbolId;
use ag_common::{Error, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::mem::size_of;
use std::thread;
use tracing::debug;

/// Next-symbol counts observed after one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextCounts {
    counts: HashMap<SymbolId, u64>,
    total: u64,
}

impl NextCounts {
    fn record(&mut self, next: SymbolId, amount: u64) -> Result<()> {
        let slot = self.counts.entry(next).or_insert(0);
        *slot = slot.checked_add(amount).ok_or_else(count_overflow)?;
        self.total = self.total.checked_add(amount).ok_or_else(count_overflow)?;
        Ok(())
    }

    fn absorb(&mut self, other: NextCounts) -> Result<()> {
        for (next, count) in other.counts {
            self.record(next, count)?;
        }
        Ok(())
    }

    /// Times `next` followed this context.
    pub fn count(&self, next: SymbolId) -> u64 {
        self.counts.get(&next).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct next symbols.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// (next, count) pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, u64)> + '_ {
        self.counts.iter().map(|(&next, &count)| (next, count))
    }
}

fn count_overflow() -> Error {
    Error::invalid_input("training corpus too large: context count overflowed u64")
}

/// Read-only view of one context's statistics.
///
/// A context that was never observed yields `total() == 0`, meaning "no
/// support" rather than "zero probability".
#[derive(Debug, Clone, Copy)]
pub struct ContextView<'a> {
    counts: Option<&'a NextCounts>,
}

impl<'a> ContextView<'a> {
    /// Total observations of this context.
    pub fn total(&self) -> u64 {
        self.counts.map_or(0, NextCounts::total)
    }

    /// Times `next` followed this context.
    pub fn count(&self, next: SymbolId) -> u64 {
        self.counts.map_or(0, |c| c.count(next))
    }

    /// Whether the context was observed at least `min_support` times.
    pub fn has_support(&self, min_support: u64) -> bool {
        min_support > 0 && self.total() >= min_support
    }

    /// Underlying counts, if the context was observed.
    pub fn counts(&self) -> Option<&'a NextCounts> {
        self.counts
    }
}

/// Frequency table for a single order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextTable {
    order: usize,
    contexts: HashMap<Vec<SymbolId>, NextCounts>,
}

impl ContextTable {
    fn new(order: usize) -> Self {
        Self {
            order,
            contexts: HashMap::new(),
        }
    }

    fn record(&mut self, context: &[SymbolId], next: SymbolId, amount: u64) -> Result<()> {
        debug_assert_eq!(context.len(), self.order);
        if let Some(counts) = self.contexts.get_mut(context) {
            return counts.record(next, amount);
        }
        let mut counts = NextCounts::default();
        counts.record(next, amount)?;
        self.contexts.insert(context.to_vec(), counts);
        Ok(())
    }

    fn absorb(&mut self, other: ContextTable) -> Result<()> {
        for (context, counts) in other.contexts {
            match self.contexts.entry(context) {
                Entry::Occupied(mut slot) => slot.get_mut().absorb(counts)?,
                Entry::Vacant(slot) => {
                    slot.insert(counts);
                }
            }
        }
        Ok(())
    }

    /// Context length of this table.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Statistics for `context`.
    pub fn get(&self, context: &[SymbolId]) -> ContextView<'_> {
        ContextView {
            counts: self.contexts.get(context),
        }
    }

    /// Number of distinct contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// (context, counts) pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&[SymbolId], &NextCounts)> + '_ {
        self.contexts.iter().map(|(ctx, counts)| (ctx.as_slice(), counts))
    }

    fn estimated_memory_bytes(&self) -> usize {
        let per_context = size_of::<Vec<SymbolId>>()
            + self.order * size_of::<SymbolId>()
            + size_of::<NextCounts>();
        let per_next = size_of::<SymbolId>() + size_of::<u64>();
        self.contexts
            .values()
            .map(|counts| per_context + counts.distinct() * per_next)
            .sum()
    }
}

/// Per-order frequency tables for orders `0..=max_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextGrid {
    max_order: usize,
    /// `tables[k]` holds order `k`; never empty, never longer than
    /// `max_order + 1`.
    tables: Vec<ContextTable>,
}

impl ContextGrid {
    /// Create an empty grid. Only the order-0 table is allocated.
    pub fn new(max_order: usize) -> Self {
        Self {
            max_order,
            tables: vec![ContextTable::new(0)],
        }
    }

    /// Make sure tables exist for every order up to `order`.
    fn ensure_order(&mut self, order: usize) -> Result<()> {
        if order > self.max_order {
            return Err(Error::invalid_parameter(format!(
                "order {} exceeds max_order {}",
                order, self.max_order
            )));
        }
        while self.tables.len() <= order {
            let next = self.tables.len();
            self.tables.push(ContextTable::new(next));
        }
        Ok(())
    }

    /// Build a grid from encoded training sequences on the calling thread.
    pub fn build<Q: AsRef<[SymbolId]>>(max_order: usize, sequences: &[Q]) -> Result<Self> {
        let mut grid = Self::new(max_order);
        for sequence in sequences {
            grid.observe(sequence.as_ref())?;
        }
        Ok(grid)
    }

    /// Build a grid by splitting `sequences` into up to `shards` contiguous
    /// shards, building each on a scoped thread, and merging the results.
    ///
    /// The result equals [`ContextGrid::build`] for every shard count.
    pub fn build_sharded<Q>(max_order: usize, sequences: &[Q], shards: usize) -> Result<Self>
    where
        Q: AsRef<[SymbolId]> + Sync,
    {
        if shards <= 1 || sequences.len() < 2 {
            return Self::build(max_order, sequences);
        }

        let chunk_size = sequences.len().div_ceil(shards);
        debug!(
            sequences = sequences.len(),
            shards,
            chunk_size,
            "building context grid in shards"
        );

        let partials: Vec<Result<ContextGrid>> = thread::scope(|s| {
            let handles: Vec<_> = sequences
                .chunks(chunk_size)
                .map(|chunk| s.spawn(move || Self::build(max_order, chunk)))
                .collect();

            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(partial) => partial,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        });

        let mut grid = Self::new(max_order);
        for partial in partials {
            grid.merge(partial?)?;
        }
        Ok(grid)
    }

    /// Add one encoded sequence's transitions to the grid.
    pub fn observe(&mut self, sequence: &[SymbolId]) -> Result<()> {
        if sequence.is_empty() {
            return Ok(());
        }
        self.ensure_order(self.max_order.min(sequence.len() - 1))?;
        for (i, &next) in sequence.iter().enumerate() {
            let top = self.max_order.min(i);
            for (k, table) in self.tables.iter_mut().enumerate().take(top + 1) {
                table.record(&sequence[i - k..i], next, 1)?;
            }
        }
        Ok(())
    }

    /// Fold another grid's counts into this one.
    pub fn merge(&mut self, other: ContextGrid) -> Result<()> {
        if other.max_order != self.max_order {
            return Err(Error::invalid_parameter(format!(
                "cannot merge grids of different max_order ({} vs {})",
                self.max_order, other.max_order
            )));
        }
        self.ensure_order(other.highest_order())?;
        for (table, other_table) in self.tables.iter_mut().zip(other.tables) {
            table.absorb(other_table)?;
        }
        Ok(())
    }

    /// Insert a pre-aggregated count. Used when restoring a persisted model.
    pub(crate) fn record_count(
        &mut self,
        context: &[SymbolId],
        next: SymbolId,
        count: u64,
    ) -> Result<()> {
        let order = context.len();
        if order > self.max_order {
            return Err(Error::Snapshot(format!(
                "context of length {} exceeds max_order {}",
                order, self.max_order
            )));
        }
        self.ensure_order(order)?;
        self.tables[order].record(context, next, count)
    }

    /// Statistics for `context` at `order`.
    ///
    /// Orders without a table and contexts of the wrong length have no
    /// support.
    pub fn lookup(&self, order: usize, context: &[SymbolId]) -> ContextView<'_> {
        match self.tables.get(order) {
            Some(table) if context.len() == order => table.get(context),
            _ => ContextView { counts: None },
        }
    }

    /// Table for one order, `None` above the highest materialized order.
    pub fn table(&self, order: usize) -> Option<&ContextTable> {
        self.tables.get(order)
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Highest order with an allocated table.
    pub fn highest_order(&self) -> usize {
        self.tables.len().saturating_sub(1)
    }

    /// Distinct contexts stored at `order`.
    pub fn contexts_at(&self, order: usize) -> usize {
        self.tables.get(order).map_or(0, ContextTable::len)
    }

    /// Distinct contexts per materialized order, index = order.
    pub fn contexts_per_order(&self) -> Vec<usize> {
        self.tables.iter().map(ContextTable::len).collect()
    }

    /// Distinct contexts across all orders.
    pub fn total_contexts(&self) -> usize {
        self.tables.iter().map(ContextTable::len).sum()
    }

    /// Number of training positions seen (the order-0 total).
    pub fn total_observations(&self) -> u64 {
        self.lookup(0, &[]).total()
    }

    /// Rough heap footprint of the stored counts.
    pub fn estimated_memory_bytes(&self) -> usize {
        self.tables
            .iter()
            .map(ContextTable::estimated_memory_bytes)
            .sum()
    }
}
