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

/// A hash table using Robin Hood hashing with backward-shift deletion.
///
/// Along any run of occupied buckets, entries are kept ordered by how far
/// they sit from home: an entry never follows one that has travelled more
/// than one bucket less. Insertion maintains this by evicting any resident
/// that is closer to home than the entry being placed and carrying the
/// resident onward instead. Lookups use the same ordering to stop early:
/// once the search has travelled further than the resident it is looking
/// at, the key cannot be further along.
///
/// Removal shifts the rest of the run back by one bucket until it reaches an
/// empty bucket or an entry already at home.
///
/// # Examples
///
/// ```rust
/// use probe_hash::ProbeTable;
/// use probe_hash::RobinHoodTable;
/// use probe_hash::TableConfig;
///
/// let config = TableConfig::default().with_load_threshold(0.95);
/// let mut table: RobinHoodTable<u64, u64> = RobinHoodTable::with_config(config).unwrap();
/// for i in 0..1000 {
///     table.put(i, i * i);
/// }
/// assert_eq!(table.get(&12), Ok(&144));
///
/// let stats = table.probe_stats();
/// assert_eq!(stats.count, 1000);
/// ```
#[derive(Debug, Clone)]
pub struct RobinHoodTable<K, V, H = DefaultKeyHasher> {
    slots: Box<[Option<Bucket<K, V>>]>,
    live: usize,
    load_threshold: f32,
    hasher: H,
}

impl<K, V, H> RobinHoodTable<K, V, H>
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

impl<K, V, H> Default for RobinHoodTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> RobinHoodTable<K, V, H>
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

    /// Bounded search: gives up at an empty bucket or at the first resident
    /// that is closer to its home than the search is to the key's home.
    fn find(&self, key: &K) -> Option<usize> {
        let capacity = self.slots.len();
        let mut index = self.home(key);
        let mut distance = 0;

        loop {
            let bucket = self.slots[index].as_ref()?;
            if distance > probe_length(bucket.home, index, capacity) {
                return None;
            }
            if bucket.key == *key {
                return Some(index);
            }
            index = next_index(index, capacity);
            distance += 1;
        }
    }

    /// Inserts without checking the load threshold.
    fn place(&mut self, key: K, value: V) -> Option<V> {
        let capacity = self.slots.len();
        let home = self.home(&key);
        let mut carried = Bucket { key, value, home };
        let mut distance = 0;
        let mut index = home;

        loop {
            let Some(resident) = self.slots[index].as_mut() else {
                self.slots[index] = Some(carried);
                self.live += 1;
                return None;
            };

            if resident.key == carried.key {
                return Some(mem::replace(&mut resident.value, carried.value));
            }

            // Steal from the rich: the resident is closer to home than the
            // carried entry, so it gives up its bucket and travels on.
            let resident_distance = probe_length(resident.home, index, capacity);
            if resident_distance < distance {
                mem::swap(resident, &mut carried);
                distance = resident_distance;
            }

            index = next_index(index, capacity);
            distance += 1;
        }
    }

    /// Shifts the run after `gap` back by one bucket.
    fn shift_back(&mut self, mut gap: usize) {
        let capacity = self.slots.len();

        loop {
            let next = next_index(gap, capacity);
            let displaced = self.slots[next]
                .as_ref()
                .is_some_and(|bucket| probe_length(bucket.home, next, capacity) > 0);
            if !displaced {
                break;
            }
            self.slots[gap] = self.slots[next].take();
            gap = next;
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
            "robin hood table resized {old_capacity} -> {new_capacity}: {} live entries replayed",
            self.live
        );
    }

    /// Panics if reachability, recorded homes, or the distance ordering is
    /// broken.
    #[cfg(test)]
    fn check_invariants(&self) {
        let capacity = self.slots.len();
        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(live, self.live);
        assert!(live < capacity, "no empty bucket left");

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(bucket) = slot else { continue };
            assert_eq!(bucket.home, self.home(&bucket.key), "stale home at {index}");

            let mut probe = bucket.home;
            while probe != index {
                assert!(self.slots[probe].is_some(), "hole at {probe} before {index}");
                probe = next_index(probe, capacity);
            }

            let next = next_index(index, capacity);
            if let Some(follower) = &self.slots[next] {
                assert!(
                    probe_length(follower.home, next, capacity)
                        <= probe_length(bucket.home, index, capacity) + 1,
                    "distance ordering broken at {index}"
                );
            }
        }
    }
}

impl<K, V, H> ProbeTable<K, V> for RobinHoodTable<K, V, H>
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
        self.find(key)
            .and_then(|index| self.slots[index].as_ref())
            .map(|bucket| &bucket.value)
            .ok_or(TableError::NotFound)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.find(key)?;
        let bucket = self.slots[index].take()?;
        self.shift_back(index);
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
    use alloc::vec::Vec;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::hasher::IdentityHasher;
    use crate::lazy::LazyProbeTable;
    use crate::table::testing;

    fn identity_table(
        capacity: usize,
        threshold: f32,
    ) -> RobinHoodTable<u64, u64, IdentityHasher> {
        let config = TableConfig::new(capacity, threshold);
        RobinHoodTable::with_config_and_hasher(config, IdentityHasher).unwrap()
    }

    #[test]
    fn insertion_steals_from_the_rich() {
        let mut table = identity_table(8, 1.0);
        for key in [1, 2, 9] {
            table.put(key, key);
        }
        // 9 (home 1) evicts 2, which sat at its own home.
        assert_eq!(table.find(&1), Some(1));
        assert_eq!(table.find(&9), Some(2));
        assert_eq!(table.find(&2), Some(3));
        assert_eq!(table.max_probe_length(), 1);
        table.check_invariants();
    }

    #[test]
    fn lookup_stops_early() {
        let mut table = identity_table(16, 1.0);
        for key in [1, 17, 33, 2, 3] {
            table.put(key, key);
        }
        table.check_invariants();
        // 49 (home 1) cannot lie past entries closer to home than the search.
        assert_eq!(table.get(&49), Err(TableError::NotFound));
        assert_eq!(table.remove(&49), None);
        assert_eq!(table.len(), 5);
        for key in [1, 17, 33, 2, 3] {
            assert_eq!(table.get(&key), Ok(&key));
        }
    }

    #[test]
    fn removal_shifts_until_home() {
        let mut table = identity_table(8, 1.0);
        for key in [1, 2, 9, 4] {
            table.put(key, key);
        }
        assert_eq!(table.remove(&1), Some(1));

        assert_eq!(table.find(&9), Some(1));
        assert_eq!(table.find(&2), Some(2));
        // 4 is already at home and stops the shift.
        assert_eq!(table.find(&4), Some(4));
        assert!(table.slots[3].is_none());
        assert_eq!(table.max_probe_length(), 0);
        table.check_invariants();
    }

    #[test]
    fn removal_shift_wraps_around() {
        let mut table = identity_table(8, 1.0);
        for key in [7, 15, 23] {
            table.put(key, key);
        }
        assert_eq!(table.find(&23), Some(1));

        table.remove(&7);
        assert_eq!(table.find(&15), Some(7));
        assert_eq!(table.find(&23), Some(0));
        assert!(table.slots[1].is_none());
        table.check_invariants();
    }

    #[test]
    fn overwrite_keeps_count() {
        let mut table = identity_table(8, 1.0);
        for key in [1, 9, 17] {
            table.put(key, key);
        }
        assert_eq!(table.put(17, 0), Some(17));
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&17), Ok(&0));
        table.check_invariants();
    }

    #[test]
    fn grows_at_inexact_threshold() {
        let mut table = identity_table(10, 0.3);
        for key in 0..3 {
            table.put(key, key);
        }
        assert_eq!(table.capacity(), 10);
        assert!(table.load_factor() >= table.load_threshold());

        table.put(3, 3);
        assert_eq!(table.capacity(), 20);
        assert_eq!(table.len(), 4);
        table.check_invariants();
    }

    #[test]
    fn resize_rejects_before_mutating() {
        let mut table = identity_table(8, 0.9);
        for key in 0..4 {
            table.put(key * 8, key);
        }
        assert!(matches!(table.resize(4), Err(TableError::InvalidArgument { .. })));
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.max_probe_length(), 3);

        table.resize(32).unwrap();
        assert_eq!(table.max_probe_length(), 0);
        for key in 0..4 {
            assert_eq!(table.get(&(key * 8)), Ok(&key));
        }
        table.check_invariants();
    }

    #[test]
    fn max_probe_length_never_exceeds_linear_probing() {
        for seed in 0..16 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let config = TableConfig::new(1024, 0.95);
            let mut robin_hood: RobinHoodTable<u64, ()> =
                RobinHoodTable::with_config(config).unwrap();
            let mut linear: LazyProbeTable<u64, ()> = LazyProbeTable::with_config(config).unwrap();

            let keys: Vec<u64> = (0..900).map(|_| rng.random_range(0..1_000_000)).collect();
            for &key in &keys {
                robin_hood.put(key, ());
                linear.put(key, ());
            }

            assert_eq!(robin_hood.capacity(), linear.capacity());
            assert_eq!(robin_hood.len(), linear.len());

            let rh = robin_hood.probe_stats();
            let lp = linear.probe_stats();
            assert!(rh.max <= lp.max, "seed {seed}: {} > {}", rh.max, lp.max);
            // The occupied buckets are the same, so total displacement is too;
            // only its spread changes.
            assert!((rh.mean - lp.mean).abs() < 1e-9, "seed {seed}");
            assert!(rh.variance <= lp.variance + 1e-9, "seed {seed}");
            robin_hood.check_invariants();
        }
    }

    #[test]
    fn random_churn_matches_model() {
        for seed in 0..8 {
            let mut table: RobinHoodTable<u64, u64> =
                RobinHoodTable::with_config(TableConfig::new(4, 0.95)).unwrap();
            testing::churn(&mut table, seed, 4000, |t| t.check_invariants());
        }
    }

    #[test]
    fn random_churn_fractional_thresholds() {
        for (seed, threshold) in [0.3f32, 0.6, 0.9].into_iter().enumerate() {
            let mut table: RobinHoodTable<u64, u64> =
                RobinHoodTable::with_config(TableConfig::new(4, threshold)).unwrap();
            testing::churn(&mut table, seed as u64 + 200, 4000, |t| t.check_invariants());
        }
    }

    #[test]
    fn random_churn_dense_collisions() {
        for seed in 0..4 {
            let mut table = identity_table(64, 1.0);
            testing::churn(&mut table, seed + 100, 4000, |t| t.check_invariants());
        }
    }

    #[test]
    fn report_clears_collector() {
        let mut table = identity_table(8, 1.0);
        for key in [0, 8, 16] {
            table.put(key, key);
        }
        let mut collector = crate::StreamStats::new();
        collector.add(100.0);
        let stats = table.report_probe_stats(&mut collector);
        assert_eq!(stats.count, 4);
        assert_eq!(collector.count(), 0);

        let stats = table.report_probe_stats(&mut collector);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 1.0);
        assert_eq!(stats.max, 2);
    }
}
