//! Corpus validation and summary statistics.

use ag_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Summary of a sequence collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStats {
    pub n_sequences: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub mean_length: f64,
    pub total_symbols: usize,
    pub distinct_symbols: usize,
}

/// Check that the collection is non-empty and every sequence has at least
/// `min_length` symbols.
pub fn validate_sequences<S, T: AsRef<[S]>>(sequences: &[T], min_length: usize) -> Result<()> {
    if sequences.is_empty() {
        return Err(Error::invalid_input("sequence collection is empty"));
    }
    for (index, sequence) in sequences.iter().enumerate() {
        let len = sequence.as_ref().len();
        if len < min_length {
            return Err(Error::invalid_input(format!(
                "sequence {} has length {}, below the minimum of {}",
                index, len, min_length
            )));
        }
    }
    Ok(())
}

/// Length and vocabulary statistics of a non-empty collection.
pub fn calculate_sequence_stats<S, T>(sequences: &[T]) -> Result<SequenceStats>
where
    S: Eq + Hash,
    T: AsRef<[S]>,
{
    if sequences.is_empty() {
        return Err(Error::invalid_input("sequence collection is empty"));
    }

    let mut min_length = usize::MAX;
    let mut max_length = 0;
    let mut total_symbols = 0;
    let mut distinct: HashSet<&S> = HashSet::new();
    for sequence in sequences {
        let sequence = sequence.as_ref();
        min_length = min_length.min(sequence.len());
        max_length = max_length.max(sequence.len());
        total_symbols += sequence.len();
        distinct.extend(sequence.iter());
    }

    Ok(SequenceStats {
        n_sequences: sequences.len(),
        min_length,
        max_length,
        mean_length: total_symbols as f64 / sequences.len() as f64,
        total_symbols,
        distinct_symbols: distinct.len(),
    })
}
