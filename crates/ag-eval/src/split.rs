//! Seeded train/test splits and k-fold partitions.

use ag_common::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Split `items` into `(train, test)` after a seeded shuffle.
///
/// The test side receives `ceil(test_size * n)` items. Both sides must end up
/// non-empty.
pub fn train_test_split<T: Clone>(items: &[T], test_size: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::invalid_parameter(format!(
            "test_size must lie in (0, 1), got {}",
            test_size
        )));
    }
    let n = items.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::invalid_input(format!(
            "cannot split {} items with test_size {} into two non-empty sides",
            n, test_size
        )));
    }

    let order = shuffled_indices(n, seed);
    let test = order[..n_test].iter().map(|&i| items[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| items[i].clone()).collect();
    Ok((train, test))
}

/// Partition `0..n` into `k` shuffled folds.
///
/// The first `n % k` folds hold one extra index. Every index appears in
/// exactly one fold.
pub fn k_fold_indices(n: usize, k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(Error::invalid_parameter(format!(
            "k must be at least 2, got {}",
            k
        )));
    }
    if n < k {
        return Err(Error::invalid_input(format!(
            "cannot form {} folds from {} items",
            k, n
        )));
    }

    let order = shuffled_indices(n, seed);
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        folds.push(order[start..start + size].to_vec());
        start += size;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sizes() {
        let items: Vec<u32> = (0..10).collect();
        let (train, test) = train_test_split(&items, 0.3, 42).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);

        let mut all: Vec<u32> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, items);
    }

    #[test]
    fn split_is_seeded() {
        let items: Vec<u32> = (0..50).collect();
        assert_eq!(
            train_test_split(&items, 0.2, 7).unwrap(),
            train_test_split(&items, 0.2, 7).unwrap()
        );
    }

    #[test]
    fn split_rejects_bad_sizes() {
        let items = [1, 2, 3];
        assert!(matches!(
            train_test_split(&items, 0.0, 1),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            train_test_split(&items, 1.0, 1),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            train_test_split(&[1], 0.5, 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn folds_cover_every_index_once() {
        let folds = k_fold_indices(11, 3, 3).unwrap();
        assert_eq!(
            folds.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![4, 4, 3]
        );
        let mut all: Vec<usize> = folds.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn fold_errors() {
        assert!(matches!(k_fold_indices(10, 1, 0), Err(Error::InvalidParameter(_))));
        assert!(matches!(k_fold_indices(2, 3, 0), Err(Error::InvalidInput(_))));
    }
}
