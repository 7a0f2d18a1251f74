//! Serializable snapshots of a fitted model.
//!
//! A snapshot lists the alphabet in id order and every table entry sorted by
//! context and next id, so identical models serialize identically.

use crate::alphabet::{Alphabet, SymbolId};
use crate::grid::ContextGrid;
use ag_common::{Error, Result};
use ag_math::ScoreTransform;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Schema version written into every snapshot.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

/// Persisted form of a fitted detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot<S> {
    pub schema_version: String,
    pub max_order: usize,
    pub score_transform: ScoreTransform,
    /// Trained symbols; the index is the symbol id.
    pub symbols: Vec<S>,
    /// One table per order up to the highest trained order,
    /// `tables[k].order == k`.
    pub tables: Vec<TableSnapshot>,
    pub baseline_surprise: f64,
    pub training_sequences: usize,
    pub training_symbols: u64,
}

/// Entries of one order's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub order: usize,
    pub contexts: Vec<ContextSnapshot>,
}

/// Next-symbol counts of one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub context: Vec<SymbolId>,
    /// `(next id, count)` sorted by id.
    pub next: Vec<(SymbolId, u64)>,
}

/// Deterministic table listing of a grid.
pub(crate) fn tables_from_grid(grid: &ContextGrid) -> Vec<TableSnapshot> {
    (0..=grid.highest_order())
        .map(|order| {
            let mut contexts: Vec<ContextSnapshot> = grid
                .table(order)
                .map(|table| {
                    table
                        .iter()
                        .map(|(context, counts)| {
                            let mut next: Vec<(SymbolId, u64)> = counts.iter().collect();
                            next.sort_unstable();
                            ContextSnapshot {
                                context: context.to_vec(),
                                next,
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            contexts.sort_unstable_by(|a, b| a.context.cmp(&b.context));
            TableSnapshot { order, contexts }
        })
        .collect()
}

/// Rebuild a grid from snapshot tables, validating shape and id ranges.
pub(crate) fn grid_from_tables(
    max_order: usize,
    tables: &[TableSnapshot],
    alphabet_size: usize,
) -> Result<ContextGrid> {
    match tables.len().checked_sub(1) {
        Some(highest) if highest <= max_order => {}
        _ => {
            return Err(Error::Snapshot(format!(
                "expected between 1 and max_order + 1 tables for max_order {}, found {}",
                max_order,
                tables.len()
            )));
        }
    }

    let mut grid = ContextGrid::new(max_order);
    for (index, table) in tables.iter().enumerate() {
        if table.order != index {
            return Err(Error::Snapshot(format!(
                "table {} declares order {}",
                index, table.order
            )));
        }
        for entry in &table.contexts {
            if entry.context.len() != index {
                return Err(Error::Snapshot(format!(
                    "order-{} table holds a context of length {}",
                    index,
                    entry.context.len()
                )));
            }
            if let Some(&bad) = entry
                .context
                .iter()
                .find(|&&id| id as usize >= alphabet_size)
            {
                return Err(Error::Snapshot(format!(
                    "context id {} outside alphabet of size {}",
                    bad, alphabet_size
                )));
            }
            if grid.lookup(index, &entry.context).total() > 0 {
                return Err(Error::Snapshot(format!(
                    "duplicate context {:?} at order {}",
                    entry.context, index
                )));
            }
            for &(next, count) in &entry.next {
                if next as usize >= alphabet_size {
                    return Err(Error::Snapshot(format!(
                        "next id {} outside alphabet of size {}",
                        next, alphabet_size
                    )));
                }
                if count == 0 {
                    return Err(Error::Snapshot(format!(
                        "zero count for context {:?} at order {}",
                        entry.context, index
                    )));
                }
                grid.record_count(&entry.context, next, count)?;
            }
        }
    }
    Ok(grid)
}

impl<S: Eq + Hash + Clone> ModelSnapshot<S> {
    /// Check the schema version and rebuild alphabet and grid.
    pub(crate) fn restore(&self) -> Result<(Alphabet<S>, ContextGrid)> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(Error::Snapshot(format!(
                "schema version mismatch: expected {}, got {}",
                SNAPSHOT_SCHEMA_VERSION, self.schema_version
            )));
        }
        if self.max_order == 0 {
            return Err(Error::Snapshot("max_order must be positive".to_string()));
        }
        if !self.baseline_surprise.is_finite() || self.baseline_surprise < 0.0 {
            return Err(Error::Snapshot(format!(
                "baseline surprise must be finite and non-negative, got {}",
                self.baseline_surprise
            )));
        }
        let alphabet = Alphabet::from_symbols(self.symbols.clone())?;
        let grid = grid_from_tables(self.max_order, &self.tables, alphabet.len())?;
        Ok((alphabet, grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_and_complete() {
        let grid = ContextGrid::build(2, &[vec![2u32, 0, 1], vec![0, 1]]).unwrap();
        let tables = tables_from_grid(&grid);
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[0].contexts.len(), 1);
        assert_eq!(tables[0].contexts[0].next, vec![(0, 2), (1, 2), (2, 1)]);

        let contexts: Vec<_> = tables[1].contexts.iter().map(|c| c.context.clone()).collect();
        assert_eq!(contexts, vec![vec![0], vec![2]]);
    }

    #[test]
    fn grid_round_trips_through_tables() {
        let grid = ContextGrid::build(3, &[vec![0u32, 1, 2, 0, 1], vec![2, 2, 1]]).unwrap();
        let restored = grid_from_tables(3, &tables_from_grid(&grid), 3).unwrap();
        assert_eq!(grid, restored);
    }

    #[test]
    fn rejects_malformed_tables() {
        let grid = ContextGrid::build(1, &[vec![0u32, 1]]).unwrap();
        let tables = tables_from_grid(&grid);

        assert!(grid_from_tables(0, &tables, 2).is_err());
        assert!(grid_from_tables(1, &[], 2).is_err());
        assert!(grid_from_tables(1, &tables, 1).is_err());

        let mut wrong_len = tables.clone();
        wrong_len[1].contexts[0].context = vec![0, 0];
        assert!(grid_from_tables(1, &wrong_len, 2).is_err());

        let mut zero = tables.clone();
        zero[0].contexts[0].next[0].1 = 0;
        assert!(grid_from_tables(1, &zero, 2).is_err());

        let mut dup = tables;
        let copy = dup[1].contexts[0].clone();
        dup[1].contexts.push(copy);
        assert!(grid_from_tables(1, &dup, 2).is_err());
    }

    #[test]
    fn accepts_tables_below_max_order() {
        let grid = ContextGrid::build(1, &[vec![0u32, 1]]).unwrap();
        let tables = tables_from_grid(&grid);

        let restored = grid_from_tables(usize::MAX, &tables, 2).unwrap();
        assert_eq!(restored.max_order(), usize::MAX);
        assert_eq!(restored.highest_order(), 1);
        assert_eq!(restored.lookup(1, &[0]).count(1), 1);
    }

    #[test]
    fn huge_max_order_in_model_file_restores() {
        let json = r#"{
            "schema_version": "1.0.0",
            "max_order": 18446744073709551615,
            "score_transform": "excess",
            "symbols": ["A", "B"],
            "tables": [
                {"order": 0, "contexts": [{"context": [], "next": [[0, 1], [1, 1]]}]},
                {"order": 1, "contexts": [{"context": [0], "next": [[1, 1]]}]}
            ],
            "baseline_surprise": 0.5,
            "training_sequences": 1,
            "training_symbols": 2
        }"#;
        let snapshot: ModelSnapshot<String> = serde_json::from_str(json).unwrap();
        let (alphabet, grid) = snapshot.restore().unwrap();
        assert_eq!(alphabet.len(), 2);
        assert_eq!(grid.max_order(), usize::MAX);
        assert_eq!(grid.total_observations(), 2);

        let mut empty = snapshot;
        empty.tables.clear();
        assert!(matches!(empty.restore(), Err(Error::Snapshot(_))));
    }
}
