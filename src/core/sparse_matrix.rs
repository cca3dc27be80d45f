//! Sparse storage of per-column objects.
//!
//! A `SparseObjectMatrix` is a logical row-major array over an N-dimensional space that only stores
//! occupied entries. The entries themselves live in a [`Dictionary`], a key-value store addressed by
//! flat index. The in-memory and sharded dictionaries are interchangeable; the algorithms only ever
//! see the matrix.

use super::error::{HtmError, Result};
use super::topology::Topology;
use fxhash::FxHashMap;

/// Key-value store addressed by flat index.
pub trait Dictionary<T>: Send + Sync {
    fn get(&self, key: usize) -> Option<&T>;

    fn get_mut(&mut self, key: usize) -> Option<&mut T>;

    /// Stores `value` under `key`, returning the previous value.
    fn set(&mut self, key: usize, value: T) -> Option<T>;

    fn contains(&self, key: usize) -> bool;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, ascending.
    fn keys(&self) -> Vec<usize>;
}

/// A dictionary backed by a single hash map.
#[derive(Debug, Clone)]
pub struct InMemoryDictionary<T> {
    map: FxHashMap<usize, T>,
}

impl<T> InMemoryDictionary<T> {
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }
}

impl<T> Default for InMemoryDictionary<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> Dictionary<T> for InMemoryDictionary<T> {
    #[inline]
    fn get(&self, key: usize) -> Option<&T> {
        self.map.get(&key)
    }

    #[inline]
    fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.map.get_mut(&key)
    }

    #[inline]
    fn set(&mut self, key: usize, value: T) -> Option<T> {
        self.map.insert(key, value)
    }

    #[inline]
    fn contains(&self, key: usize) -> bool {
        self.map.contains_key(&key)
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }

    fn keys(&self) -> Vec<usize> {
        let mut keys: Vec<usize> = self.map.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

/// A dictionary split into shards of contiguous key ranges.
///
/// Every value is stored whole in exactly one shard, so a column's data never straddles a
/// partition boundary. Keys beyond the planned capacity go to the last shard.
#[derive(Debug, Clone)]
pub struct ShardedDictionary<T> {
    shard_size: usize,
    shards: Vec<FxHashMap<usize, T>>,
}

impl<T> ShardedDictionary<T> {
    /// Partitions the keys `0..capacity` into `num_shards` contiguous ranges.
    pub fn new(num_shards: usize, capacity: usize) -> Self {
        let num_shards = num_shards.max(1);
        let shard_size = capacity.div_ceil(num_shards).max(1);
        Self {
            shard_size,
            shards: (0..num_shards).map(|_| FxHashMap::default()).collect(),
        }
    }

    /// The shard responsible for `key`.
    #[inline]
    pub fn shard_of(&self, key: usize) -> usize {
        (key / self.shard_size).min(self.shards.len() - 1)
    }

    #[inline]
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Number of entries held by shard `shard`.
    pub fn shard_len(&self, shard: usize) -> usize {
        self.shards.get(shard).map_or(0, |s| s.len())
    }
}

impl<T: Send + Sync> Dictionary<T> for ShardedDictionary<T> {
    #[inline]
    fn get(&self, key: usize) -> Option<&T> {
        self.shards[self.shard_of(key)].get(&key)
    }

    #[inline]
    fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        let shard = self.shard_of(key);
        self.shards[shard].get_mut(&key)
    }

    #[inline]
    fn set(&mut self, key: usize, value: T) -> Option<T> {
        let shard = self.shard_of(key);
        self.shards[shard].insert(key, value)
    }

    #[inline]
    fn contains(&self, key: usize) -> bool {
        self.shards[self.shard_of(key)].contains_key(&key)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    fn keys(&self) -> Vec<usize> {
        // Shards cover ascending key ranges, so sorting each shard is enough.
        let mut keys = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let start = keys.len();
            keys.extend(shard.keys().copied());
            keys[start..].sort_unstable();
        }
        keys
    }
}

/// Sparse matrix of objects over an N-dimensional index space.
pub struct SparseObjectMatrix<T> {
    topology: Topology,
    store: Box<dyn Dictionary<T>>,
}

impl<T: Send + Sync + 'static> SparseObjectMatrix<T> {
    /// Creates an empty matrix backed by an [`InMemoryDictionary`].
    pub fn new(dimensions: &[usize]) -> Self {
        Self::with_dictionary(dimensions, Box::new(InMemoryDictionary::new()))
    }
}

impl<T> SparseObjectMatrix<T> {
    /// Creates an empty matrix backed by the given dictionary.
    pub fn with_dictionary(dimensions: &[usize], store: Box<dyn Dictionary<T>>) -> Self {
        Self {
            topology: Topology::new(dimensions),
            store,
        }
    }

    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Number of addressable indices.
    #[inline]
    pub fn max_index(&self) -> usize {
        self.topology.size()
    }

    /// Number of occupied indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.store.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.store.get_mut(index)
    }

    /// The entry at `coordinates`.
    pub fn get_at(&self, coordinates: &[usize]) -> Option<&T> {
        self.get(self.topology.index_from_coordinates(coordinates))
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.store.contains(index)
    }

    /// Stores `value` at `index`, which must be inside the matrix.
    pub fn set(&mut self, index: usize, value: T) -> Result<Option<T>> {
        if index >= self.max_index() {
            return Err(HtmError::out_of_bounds("matrix", index, self.max_index()));
        }
        Ok(self.store.set(index, value))
    }

    /// Occupied indices, ascending.
    pub fn sparse_indices(&self) -> Vec<usize> {
        self.store.keys()
    }

    /// Occupied entries in ascending index order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.store
            .keys()
            .into_iter()
            .filter_map(move |index| self.store.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_and_sharded_dictionaries_agree() {
        let mut plain = InMemoryDictionary::new();
        let mut sharded = ShardedDictionary::new(3, 10);
        for key in [7, 0, 4, 9, 2] {
            plain.set(key, key * 10);
            sharded.set(key, key * 10);
        }
        assert_eq!(plain.keys(), sharded.keys());
        assert_eq!(plain.keys(), vec![0, 2, 4, 7, 9]);
        for key in 0..10 {
            assert_eq!(plain.get(key), sharded.get(key));
            assert_eq!(plain.contains(key), sharded.contains(key));
        }
    }

    #[test]
    fn shards_hold_contiguous_key_ranges() {
        let mut dict = ShardedDictionary::new(4, 16);
        for key in 0..16 {
            dict.set(key, ());
        }
        assert_eq!(dict.shard_of(0), 0);
        assert_eq!(dict.shard_of(3), 0);
        assert_eq!(dict.shard_of(4), 1);
        assert_eq!(dict.shard_of(15), 3);
        assert_eq!(dict.shard_of(100), 3);
        assert!((0..4).all(|shard| dict.shard_len(shard) == 4));
    }

    #[test]
    fn matrix_rejects_indices_outside_its_dimensions() {
        let mut matrix = SparseObjectMatrix::new(&[2, 3]);
        assert!(matrix.set(5, "last").is_ok());
        assert!(matches!(
            matrix.set(6, "outside"),
            Err(HtmError::IndexOutOfBounds { index: 6, size: 6, .. })
        ));
        assert_eq!(matrix.get_at(&[1, 2]), Some(&"last"));
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn sharded_matrix_reads_back_like_in_memory() {
        let mut matrix: SparseObjectMatrix<usize> =
            SparseObjectMatrix::with_dictionary(&[8], Box::new(ShardedDictionary::new(2, 8)));
        matrix.set(6, 60).unwrap();
        matrix.set(1, 10).unwrap();
        *matrix.get_mut(6).unwrap() += 1;
        assert_eq!(matrix.values().copied().collect::<Vec<_>>(), vec![10, 61]);
        assert_eq!(matrix.sparse_indices(), vec![1, 6]);
    }
}
