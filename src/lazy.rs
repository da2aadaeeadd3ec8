use alloc::boxed::Box;
use core::mem;

use crate::config::TableConfig;
use crate::error::Result;
use crate::error::TableError;
use crate::hasher::DefaultKeyHasher;
use crate::hasher::KeyHasher;
use crate::table::ProbeTable;
use crate::table::alloc_slots;
use crate::table::check_resize;
use crate::table::grown_capacity;
use crate::table::home_index;
use crate::table::needs_growth;
use crate::table::next_index;
use crate::table::probe_length;

#[derive(Debug, Clone)]
enum Bucket<K, V> {
    Occupied { key: K, value: V },
    Tombstone,
}

enum Lookup {
    Found(usize),
    Vacant {
        empty: usize,
        first_tombstone: Option<usize>,
    },
}

/// A hash table using linear probing with tombstone deletion.
///
/// Removing a key leaves a tombstone in its bucket so that probe sequences
/// running through it stay unbroken. Tombstones keep counting against the
/// load threshold until the next resize throws them away, so heavy delete
/// churn makes this table rebuild more often than the shifting variants.
/// A later insertion along the same probe path may reuse a tombstoned
/// bucket.
///
/// # Examples
///
/// ```rust
/// use probe_hash::LazyProbeTable;
/// use probe_hash::ProbeTable;
///
/// let mut table: LazyProbeTable<&str, u32> = LazyProbeTable::new();
/// table.put("a", 1);
/// table.put("b", 2);
/// table.remove(&"a");
///
/// assert!(table.get(&"a").is_err());
/// assert_eq!(table.get(&"b"), Ok(&2));
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.tombstones(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LazyProbeTable<K, V, H = DefaultKeyHasher> {
    slots: Box<[Option<Bucket<K, V>>]>,
    live: usize,
    tombstones: usize,
    load_threshold: f32,
    hasher: H,
}

impl<K, V, H> LazyProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K> + Default,
{
    /// Creates an empty table with the default configuration.
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }

    /// Creates an empty table with the given configuration.
    pub fn with_config(config: TableConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, H::default())
    }
}

impl<K, V, H> Default for LazyProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> LazyProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    /// Creates an empty table with the default configuration and the given
    /// hasher.
    pub fn with_hasher(hasher: H) -> Self {
        let config = TableConfig::default();
        Self::build(config, hasher)
    }

    /// Creates an empty table with the given configuration and hasher.
    ///
    /// Fails with [`TableError::InvalidArgument`] if the configuration does
    /// not [validate](TableConfig::validate).
    pub fn with_config_and_hasher(config: TableConfig, hasher: H) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, hasher))
    }

    fn build(config: TableConfig, hasher: H) -> Self {
        Self {
            slots: alloc_slots(config.initial_capacity),
            live: 0,
            tombstones: 0,
            load_threshold: config.load_threshold,
            hasher,
        }
    }

    /// Number of tombstoned buckets awaiting the next resize.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Returns the table's hasher.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Removes every entry and tombstone, keeping the capacity.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.live = 0;
        self.tombstones = 0;
    }

    #[inline]
    fn home(&self, key: &K) -> usize {
        home_index(self.hasher.hash(key), self.slots.len())
    }

    /// Walks the probe sequence of `key`, stepping over tombstones, until it
    /// reaches the key or a never-used bucket.
    fn lookup(&self, key: &K) -> Lookup {
        let capacity = self.slots.len();
        let mut index = self.home(key);
        let mut first_tombstone = None;

        loop {
            match &self.slots[index] {
                None => {
                    return Lookup::Vacant {
                        empty: index,
                        first_tombstone,
                    };
                }
                Some(Bucket::Tombstone) => {
                    first_tombstone.get_or_insert(index);
                }
                Some(Bucket::Occupied { key: existing, .. }) if existing == key => {
                    return Lookup::Found(index);
                }
                Some(Bucket::Occupied { .. }) => {}
            }
            index = next_index(index, capacity);
        }
    }

    /// Inserts without checking the load threshold.
    fn place(&mut self, key: K, value: V) -> Option<V> {
        match self.lookup(&key) {
            Lookup::Found(index) => match &mut self.slots[index] {
                Some(Bucket::Occupied { value: existing, .. }) => {
                    Some(mem::replace(existing, value))
                }
                _ => None,
            },
            Lookup::Vacant {
                empty,
                first_tombstone,
            } => {
                let index = match first_tombstone {
                    Some(index) => {
                        self.tombstones -= 1;
                        index
                    }
                    None => empty,
                };
                self.slots[index] = Some(Bucket::Occupied { key, value });
                self.live += 1;
                None
            }
        }
    }

    fn rebuild(&mut self, new_capacity: usize) {
        let old = mem::replace(&mut self.slots, alloc_slots(new_capacity));
        let old_capacity = old.len();
        let discarded = mem::take(&mut self.tombstones);
        self.live = 0;

        for slot in old.into_vec() {
            if let Some(Bucket::Occupied { key, value }) = slot {
                self.place(key, value);
            }
        }

        log::debug!(
            "lazy probe table resized {old_capacity} -> {new_capacity}: \
             {} live entries replayed, {discarded} tombstones discarded",
            self.live
        );
    }

    #[cfg(test)]
    fn index_of(&self, key: &K) -> Option<usize> {
        match self.lookup(key) {
            Lookup::Found(index) => Some(index),
            Lookup::Vacant { .. } => None,
        }
    }

    /// Panics if bookkeeping or reachability is broken.
    #[cfg(test)]
    fn check_invariants(&self) {
        let capacity = self.slots.len();
        let live = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Some(Bucket::Occupied { .. })))
            .count();
        let tombstones = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Some(Bucket::Tombstone)))
            .count();
        assert_eq!(live, self.live);
        assert_eq!(tombstones, self.tombstones);
        assert!(live + tombstones < capacity, "no empty bucket left");

        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(Bucket::Occupied { key, .. }) = slot {
                let mut probe = self.home(key);
                while probe != index {
                    assert!(self.slots[probe].is_some(), "hole at {probe} before {index}");
                    probe = next_index(probe, capacity);
                }
            }
        }
    }
}

impl<K, V, H> ProbeTable<K, V> for LazyProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    fn put(&mut self, key: K, value: V) -> Option<V> {
        if needs_growth(self.occupied_slots(), self.capacity(), self.load_threshold) {
            let target = grown_capacity(self.capacity(), self.live, self.load_threshold);
            self.rebuild(target);
        }
        self.place(key, value)
    }

    fn get(&self, key: &K) -> Result<&V> {
        match self.lookup(key) {
            Lookup::Found(index) => match &self.slots[index] {
                Some(Bucket::Occupied { value, .. }) => Ok(value),
                _ => Err(TableError::NotFound),
            },
            Lookup::Vacant { .. } => Err(TableError::NotFound),
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let Lookup::Found(index) = self.lookup(key) else {
            return None;
        };

        match self.slots[index].replace(Bucket::Tombstone) {
            Some(Bucket::Occupied { value, .. }) => {
                self.live -= 1;
                self.tombstones += 1;
                Some(value)
            }
            other => {
                self.slots[index] = other;
                None
            }
        }
    }

    fn resize(&mut self, new_capacity: usize) -> Result<()> {
        check_resize(new_capacity, self.live)?;
        self.rebuild(new_capacity);
        Ok(())
    }

    fn len(&self) -> usize {
        self.live
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn load_threshold(&self) -> f32 {
        self.load_threshold
    }

    /// Live entries plus tombstones.
    fn occupied_slots(&self) -> usize {
        self.live + self.tombstones
    }

    fn probe_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        let capacity = self.slots.len();
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| match slot {
                Some(Bucket::Occupied { key, .. }) => {
                    Some(probe_length(self.home(key), index, capacity))
                }
                _ => None,
            })
    }
}
