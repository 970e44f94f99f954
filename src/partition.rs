/// Splits an ordered batch of work items into per-worker chunks.
///
/// The partitioning is intentionally simple: workers take sequential blocks
/// of `round(N / P)` items and the final worker absorbs whatever rounding
/// leaves over. Chunks stay contiguous so that concatenating them in
/// ascending worker order reproduces the input sequence exactly, which is
/// what lets the extraction merge preserve single-threaded ordering.

use std::collections::BTreeMap;

/// Mapping from worker index to that worker's chunk of the input.
///
/// Only workers with non-empty chunks appear in the map; consumers must not
/// assume every index below the worker count is present. Iteration is in
/// ascending worker order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMap<T> {
    chunks: BTreeMap<usize, Vec<T>>,
}

impl<T> ChunkMap<T> {
    /// Number of populated chunks. Never exceeds min(N, P).
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total number of items across all chunks.
    pub fn total_items(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    pub fn get(&self, worker: usize) -> Option<&[T]> {
        self.chunks.get(&worker).map(Vec::as_slice)
    }

    /// Chunks in ascending worker order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[T])> {
        self.chunks.iter().map(|(&worker, chunk)| (worker, chunk.as_slice()))
    }

    /// Consumes the map, yielding `(worker, chunk)` pairs in ascending
    /// worker order.
    pub fn into_ordered_chunks(self) -> Vec<(usize, Vec<T>)> {
        self.chunks.into_iter().collect()
    }
}

/// Partitions `items` across `workers` chunks.
///
/// Chunk size is `round(N / P)`, minimum 1; workers `0..P-2` take sequential
/// blocks of that size and the last worker takes all remaining items, which
/// may be more than a block when the rounding underestimates. Workers whose
/// slice would be empty are omitted from the result.
pub fn split_batch<T: Clone>(items: &[T], workers: usize) -> ChunkMap<T> {
    let workers = workers.max(1);
    let n = items.len();
    let chunk_size = ((n as f64 / workers as f64).round() as usize).max(1);

    let mut chunks = BTreeMap::new();
    let mut low = 0;
    for worker in 0..workers {
        let high = if worker == workers - 1 {
            n
        } else {
            (low + chunk_size).min(n)
        };
        if low < high {
            chunks.insert(worker, items[low..high].to_vec());
        }
        low = high.max(low);
    }

    let map = ChunkMap { chunks };
    debug_assert_eq!(map.total_items(), n);
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(map: &ChunkMap<u32>) -> Vec<u32> {
        map.iter().flat_map(|(_, chunk)| chunk.iter().copied()).collect()
    }

    #[test]
    fn concatenation_reproduces_the_input() {
        for n in 0..40usize {
            let items: Vec<u32> = (0..n as u32).collect();
            for workers in 1..12usize {
                let map = split_batch(&items, workers);
                assert_eq!(reconstruct(&map), items, "n={n} workers={workers}");
                assert!(map.len() <= n.min(workers), "n={n} workers={workers}");
            }
        }
    }

    #[test]
    fn last_worker_absorbs_the_rounding_remainder() {
        // 10 items over 3 workers: chunk size round(10/3) = 3, so the final
        // worker gets the 4-item tail.
        let items: Vec<u32> = (0..10).collect();
        let map = split_batch(&items, 3);
        assert_eq!(map.get(0), Some(&[0, 1, 2][..]));
        assert_eq!(map.get(1), Some(&[3, 4, 5][..]));
        assert_eq!(map.get(2), Some(&[6, 7, 8, 9][..]));
    }

    #[test]
    fn rounding_up_can_shortchange_the_last_worker() {
        // 5 items over 2 workers: chunk size round(2.5) = 3, leaving only 2
        // for the final worker.
        let items: Vec<u32> = (0..5).collect();
        let map = split_batch(&items, 2);
        assert_eq!(map.get(0), Some(&[0, 1, 2][..]));
        assert_eq!(map.get(1), Some(&[3, 4][..]));
    }

    #[test]
    fn workers_with_empty_slices_are_omitted() {
        let items: Vec<u32> = (0..2).collect();
        let map = split_batch(&items, 5);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(0), Some(&[0][..]));
        assert_eq!(map.get(1), Some(&[1][..]));
        assert_eq!(map.get(2), None);
        assert_eq!(map.get(4), None);
    }

    #[test]
    fn empty_input_yields_an_empty_map() {
        let map = split_batch::<u32>(&[], 4);
        assert!(map.is_empty());
        assert_eq!(map.total_items(), 0);
    }

    #[test]
    fn single_worker_takes_everything() {
        let items: Vec<u32> = (0..7).collect();
        let map = split_batch(&items, 1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(0), Some(&items[..]));
    }
}
