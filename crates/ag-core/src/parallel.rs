//! Order-preserving fan-out over scoped threads.

use std::thread;

/// Apply `f` to every item using up to `workers` scoped threads.
///
/// Items are split into contiguous chunks, one per thread, and the results
/// are returned in input order. With `workers <= 1` everything runs on the
/// calling thread.
pub(crate) fn map_ordered<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if workers <= 1 || items.len() < 2 {
        return items.iter().map(&f).collect();
    }

    let chunk_size = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| s.spawn(move || chunk.iter().map(f).collect::<Vec<R>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(results) => results,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_input_order() {
        let items: Vec<u64> = (0..101).collect();
        for workers in [0, 1, 2, 7, 200] {
            let out = map_ordered(&items, workers, |x| x * 2);
            let expected: Vec<u64> = items.iter().map(|x| x * 2).collect();
            assert_eq!(out, expected, "workers={}", workers);
        }
    }

    #[test]
    fn empty_input() {
        let items: Vec<u8> = Vec::new();
        assert!(map_ordered(&items, 4, |x| *x).is_empty());
    }
}
