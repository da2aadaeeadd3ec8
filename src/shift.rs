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
struct Bucket<K, V> {
    key: K,
    value: V,
    home: usize,
}

enum Lookup {
    Found(usize),
    Vacant(usize),
}

/// A hash table using linear probing with backward-shift deletion.
///
/// No tombstones are ever written. Removing an entry opens a gap, and every
/// later entry in the same run whose probe path crosses that gap is pulled
/// back into it. Lookups can therefore stop at the first empty bucket, and
/// removals free their bucket immediately instead of counting against the
/// load threshold.
///
/// Each bucket remembers its home index so the shift pass never rehashes.
///
/// # Examples
///
/// ```rust
/// use probe_hash::ProbeTable;
/// use probe_hash::ShiftProbeTable;
///
/// let mut table: ShiftProbeTable<u32, char> = ShiftProbeTable::new();
/// for (i, c) in ('a'..='z').enumerate() {
///     table.put(i as u32, c);
/// }
/// assert_eq!(table.remove(&3), Some('d'));
/// assert_eq!(table.len(), 25);
/// assert_eq!(table.get(&4), Ok(&'e'));
/// ```
#[derive(Debug, Clone)]
pub struct ShiftProbeTable<K, V, H = DefaultKeyHasher> {
    slots: Box<[Option<Bucket<K, V>>]>,
    live: usize,
    load_threshold: f32,
    hasher: H,
}

impl<K, V, H> ShiftProbeTable<K, V, H>
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

impl<K, V, H> Default for ShiftProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> ShiftProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    /// Creates an empty table with the default configuration and the given
    /// hasher.
    pub fn with_hasher(hasher: H) -> Self {
        Self::build(TableConfig::default(), hasher)
    }

    /// Creates an empty table with the given configuration and hasher.
    pub fn with_config_and_hasher(config: TableConfig, hasher: H) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, hasher))
    }

    fn build(config: TableConfig, hasher: H) -> Self {
        Self {
            slots: alloc_slots(config.initial_capacity),
            live: 0,
            load_threshold: config.load_threshold,
            hasher,
        }
    }

    /// Returns the table's hasher.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Removes every entry, keeping the capacity.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.live = 0;
    }

    #[inline]
    fn home(&self, key: &K) -> usize {
        home_index(self.hasher.hash(key), self.slots.len())
    }

    fn lookup(&self, key: &K, home: usize) -> Lookup {
        let capacity = self.slots.len();
        let mut index = home;

        while let Some(bucket) = &self.slots[index] {
            if bucket.key == *key {
                return Lookup::Found(index);
            }
            index = next_index(index, capacity);
        }

        Lookup::Vacant(index)
    }

    /// Inserts without checking the load threshold.
    fn place(&mut self, key: K, value: V) -> Option<V> {
        let home = self.home(&key);
        match self.lookup(&key, home) {
            Lookup::Found(index) => self.slots[index]
                .as_mut()
                .map(|bucket| mem::replace(&mut bucket.value, value)),
            Lookup::Vacant(index) => {
                self.slots[index] = Some(Bucket { key, value, home });
                self.live += 1;
                None
            }
        }
    }

    /// Pulls entries back into the empty bucket at `gap` until the run ends.
    ///
    /// An entry at `next` may move into `gap` only when `gap` lies on its
    /// probe path, the cyclic interval `[home, next)`. Entries that must stay
    /// put are skipped rather than ending the pass: a later entry in the same
    /// run may still belong in the gap.
    fn close_gap(&mut self, mut gap: usize) {
        let capacity = self.slots.len();
        let mut next = next_index(gap, capacity);

        while let Some(home) = self.slots[next].as_ref().map(|bucket| bucket.home) {
            if probe_length(home, gap, capacity) < probe_length(home, next, capacity) {
                self.slots[gap] = self.slots[next].take();
                gap = next;
            }
            next = next_index(next, capacity);
        }
    }

    fn rebuild(&mut self, new_capacity: usize) {
        let old = mem::replace(&mut self.slots, alloc_slots(new_capacity));
        let old_capacity = old.len();
        self.live = 0;

        for bucket in old.into_vec().into_iter().flatten() {
            self.place(bucket.key, bucket.value);
        }

        log::debug!(
            "shift probe table resized {old_capacity} -> {new_capacity}: {} live entries replayed",
            self.live
        );
    }

    #[cfg(test)]
    fn index_of(&self, key: &K) -> Option<usize> {
        match self.lookup(key, self.home(key)) {
            Lookup::Found(index) => Some(index),
            Lookup::Vacant(_) => None,
        }
    }

    /// Panics if any entry is unreachable from its home or its recorded home
    /// is stale.
    #[cfg(test)]
    fn check_invariants(&self) {
        let capacity = self.slots.len();
        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(live, self.live);
        assert!(live < capacity, "no empty bucket left");

        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(bucket) = slot {
                assert_eq!(bucket.home, self.home(&bucket.key), "stale home at {index}");
                let mut probe = bucket.home;
                while probe != index {
                    assert!(self.slots[probe].is_some(), "hole at {probe} before {index}");
                    probe = next_index(probe, capacity);
                }
            }
        }
    }
}

impl<K, V, H> ProbeTable<K, V> for ShiftProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    fn put(&mut self, key: K, value: V) -> Option<V> {
        if needs_growth(self.live, self.capacity(), self.load_threshold) {
            let target = grown_capacity(self.capacity(), self.live, self.load_threshold);
            self.rebuild(target);
        }
        self.place(key, value)
    }

    fn get(&self, key: &K) -> Result<&V> {
        match self.lookup(key, self.home(key)) {
            Lookup::Found(index) => self.slots[index]
                .as_ref()
                .map(|bucket| &bucket.value)
                .ok_or(TableError::NotFound),
            Lookup::Vacant(_) => Err(TableError::NotFound),
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let Lookup::Found(index) = self.lookup(key, self.home(key)) else {
            return None;
        };

        let bucket = self.slots[index].take()?;
        self.close_gap(index);
        self.live -= 1;
        Some(bucket.value)
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

    fn probe_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        let capacity = self.slots.len();
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.as_ref()
                .map(|bucket| probe_length(bucket.home, index, capacity))
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;

    use super::*;
    use crate::hasher::IdentityHasher;
    use crate::lazy::LazyProbeTable;
    use crate::table::testing;

    fn identity_table(
        capacity: usize,
        threshold: f32,
    ) -> ShiftProbeTable<u64, u64, IdentityHasher> {
        let config = TableConfig::new(capacity, threshold);
        ShiftProbeTable::with_config_and_hasher(config, IdentityHasher).unwrap()
    }

    #[test]
    fn colliding_keys_scenario() {
        let mut table = identity_table(4, 1.0);
        for key in [1, 5, 9] {
            table.put(key, key * 10);
        }
        assert_eq!(table.index_of(&1), Some(1));
        assert_eq!(table.index_of(&5), Some(2));
        assert_eq!(table.index_of(&9), Some(3));

        assert_eq!(table.remove(&5), Some(50));
        assert_eq!(table.index_of(&9), Some(2));
        assert!(table.slots[3].is_none());
        assert_eq!(table.get(&9), Ok(&90));
        assert_eq!(table.len(), 2);
        table.check_invariants();
    }

    #[test]
    fn shift_continues_past_entries_at_home() {
        let mut table = identity_table(8, 1.0);
        // 1 and 2 sit at their homes; 9 (home 1) is pushed to bucket 3.
        for key in [1, 2, 9] {
            table.put(key, key);
        }
        assert_eq!(table.index_of(&9), Some(3));

        table.remove(&1);
        // 2 must stay, but 9 still has to be pulled back into bucket 1.
        assert_eq!(table.index_of(&2), Some(2));
        assert_eq!(table.index_of(&9), Some(1));
        assert_eq!(table.get(&9), Ok(&9));
        table.check_invariants();
    }

    #[test]
    fn shift_wraps_around() {
        let mut table = identity_table(8, 1.0);
        for key in [6, 14, 22, 7] {
            table.put(key, key);
        }
        assert_eq!(table.index_of(&14), Some(7));
        assert_eq!(table.index_of(&22), Some(0));
        assert_eq!(table.index_of(&7), Some(1));

        table.remove(&14);
        assert_eq!(table.index_of(&22), Some(7));
        assert_eq!(table.index_of(&7), Some(0));
        assert!(table.slots[1].is_none());
        table.check_invariants();
    }

    #[test]
    fn gap_at_home_of_wrapped_entry() {
        let mut table = identity_table(8, 1.0);
        // 7 at 7, 15 wraps to 0, 0 (home 0) lands at 1.
        for key in [7, 15, 0] {
            table.put(key, key);
        }
        assert_eq!(table.index_of(&0), Some(1));

        // The gap at 0 is the home of key 0 and on the path of nothing else.
        table.remove(&15);
        assert_eq!(table.index_of(&0), Some(0));
        assert_eq!(table.index_of(&7), Some(7));
        table.check_invariants();

        // A gap at 7 is not on the path of key 0 (home 0).
        table.remove(&7);
        assert_eq!(table.index_of(&0), Some(0));
        table.check_invariants();
    }

    #[test]
    fn remove_frees_capacity() {
        let mut table = identity_table(10, 0.5);
        for round in 0..20 {
            for key in 0..4 {
                table.put(key + round * 100, key);
            }
            for key in 0..4 {
                table.remove(&(key + round * 100));
            }
        }
        assert_eq!(table.capacity(), 10);
        assert!(table.is_empty());
        table.check_invariants();
    }

    #[test]
    fn overwrite_and_absent_remove() {
        let mut table: ShiftProbeTable<String, u32> = ShiftProbeTable::new();
        assert_eq!(table.put("x".into(), 1), None);
        assert_eq!(table.put("x".into(), 2), Some(1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.remove(&"y".into()), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&"x".into()), Ok(&2));
    }

    #[test]
    fn growth_restores_threshold() {
        let mut table: ShiftProbeTable<u64, u64> =
            ShiftProbeTable::with_config(TableConfig::new(2, 0.75)).unwrap();
        for key in 0..1000 {
            table.put(key, key * 3);
            let before = (table.len() - 1) as f32 / table.capacity() as f32;
            assert!(before < table.load_threshold(), "key {key}");
        }
        for key in 0..1000 {
            assert_eq!(table.get(&key), Ok(&(key * 3)));
        }
        assert!((table.len() - 1) as f32 / (table.capacity() as f32) < 0.75);
        table.check_invariants();
    }

    #[test]
    fn grows_at_inexact_threshold() {
        let mut table = identity_table(10, 0.6);
        for key in 0..6 {
            table.put(key, key);
        }
        assert_eq!(table.capacity(), 10);
        assert!(table.load_factor() >= table.load_threshold());

        table.put(6, 6);
        assert_eq!(table.capacity(), 20);
        assert_eq!(table.len(), 7);
        table.check_invariants();
    }

    #[test]
    fn resize_rejects_before_mutating() {
        let mut table = identity_table(8, 0.9);
        for key in 0..5 {
            table.put(key, key);
        }
        assert!(matches!(table.resize(0), Err(TableError::InvalidArgument { .. })));
        assert!(matches!(table.resize(5), Err(TableError::InvalidArgument { .. })));
        assert_eq!(table.capacity(), 8);

        table.resize(6).unwrap();
        assert_eq!(table.capacity(), 6);
        for key in 0..5 {
            assert_eq!(table.get(&key), Ok(&key));
        }
        table.check_invariants();
    }

    #[test]
    fn matches_plain_linear_probing_without_removals() {
        let mut shift: ShiftProbeTable<String, usize> = ShiftProbeTable::new();
        let mut lazy: LazyProbeTable<String, usize> = LazyProbeTable::new();
        for i in 0..500 {
            shift.put(format!("k{i}"), i);
            lazy.put(format!("k{i}"), i);
        }
        assert_eq!(shift.capacity(), lazy.capacity());
        assert!(shift.probe_lengths().eq(lazy.probe_lengths()));
    }

    #[test]
    fn random_churn_matches_model() {
        for seed in 0..8 {
            let mut table: ShiftProbeTable<u64, u64> =
                ShiftProbeTable::with_config(TableConfig::new(4, 0.95)).unwrap();
            testing::churn(&mut table, seed, 4000, |t| t.check_invariants());
        }
    }

    #[test]
    fn random_churn_fractional_thresholds() {
        for (seed, threshold) in [0.3f32, 0.6, 0.9].into_iter().enumerate() {
            let mut table: ShiftProbeTable<u64, u64> =
                ShiftProbeTable::with_config(TableConfig::new(4, threshold)).unwrap();
            testing::churn(&mut table, seed as u64 + 200, 4000, |t| t.check_invariants());
        }
    }

    #[test]
    fn random_churn_dense_collisions() {
        for seed in 0..4 {
            let mut table: ShiftProbeTable<u64, u64, IdentityHasher> =
                ShiftProbeTable::with_config_and_hasher(TableConfig::new(64, 1.0), IdentityHasher)
                    .unwrap();
            testing::churn(&mut table, seed + 100, 4000, |t| t.check_invariants());
        }
    }
}
