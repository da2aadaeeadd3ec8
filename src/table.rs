//! The contract shared by every probing table.
//!
//! All variants store entries directly in a fixed-size bucket array and
//! resolve collisions by scanning forward, wrapping at the end of the array.
//! They differ only in how they place and remove entries. The pieces they
//! share live here: reducing a digest to a home bucket, measuring probe
//! lengths, the grow-before-insert policy, and the [`ProbeTable`] trait that
//! exposes one operation set over all of them.

use alloc::boxed::Box;
use alloc::format;

use crate::error::Result;
use crate::error::TableError;
use crate::stats::ProbeHistogram;
use crate::stats::ProbeStats;
use crate::stats::StreamStats;

/// Reduces a digest to a bucket index for the given capacity.
#[inline(always)]
pub fn home_index(digest: u64, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    (digest % capacity as u64) as usize
}

/// Forward cyclic distance from `home` to `actual`.
///
/// This is how far an entry stored at `actual` was pushed from the bucket
/// its key hashes to.
///
/// ```rust
/// use probe_hash::table::probe_length;
///
/// assert_eq!(probe_length(1, 3, 4), 2);
/// assert_eq!(probe_length(3, 1, 4), 2);
/// assert_eq!(probe_length(2, 2, 4), 0);
/// ```
#[inline(always)]
pub fn probe_length(home: usize, actual: usize, capacity: usize) -> usize {
    if actual >= home {
        actual - home
    } else {
        actual + capacity - home
    }
}

#[inline(always)]
pub(crate) fn next_index(index: usize, capacity: usize) -> usize {
    let next = index + 1;
    if next == capacity { 0 } else { next }
}

/// Occupied buckets over capacity, in the precision of the load threshold.
#[inline(always)]
pub(crate) fn load_ratio(occupied: usize, capacity: usize) -> f32 {
    occupied as f32 / capacity as f32
}

/// Whether a table must grow before accepting another insertion.
///
/// Besides the configured threshold, a table always keeps one bucket empty so
/// that every probe sequence has somewhere to stop.
#[inline]
pub(crate) fn needs_growth(occupied: usize, capacity: usize, load_threshold: f32) -> bool {
    load_ratio(occupied, capacity) >= load_threshold || occupied + 1 >= capacity
}

/// Capacity to grow to when `live` entries survive a rebuild.
///
/// Starts from double the current capacity and keeps doubling until the
/// rebuilt table is back under its threshold.
#[cold]
pub(crate) fn grown_capacity(capacity: usize, live: usize, load_threshold: f32) -> usize {
    let mut target = capacity.checked_mul(2).expect("capacity overflow");
    while needs_growth(live, target, load_threshold) {
        target = target.checked_mul(2).expect("capacity overflow");
    }
    target
}

/// Rejects explicit resize requests that could not hold the live entries.
pub(crate) fn check_resize(new_capacity: usize, live: usize) -> Result<()> {
    if new_capacity == 0 {
        return Err(TableError::invalid_argument("capacity must be positive"));
    }

    if new_capacity <= live {
        return Err(TableError::invalid_argument(format!(
            "capacity {new_capacity} cannot hold {live} live entries"
        )));
    }

    Ok(())
}

/// Allocates `capacity` empty buckets.
pub(crate) fn alloc_slots<T>(capacity: usize) -> Box<[Option<T>]> {
    core::iter::repeat_with(|| None).take(capacity).collect()
}

/// Operations every probing table supports.
///
/// `put` grows the table first whenever [`occupied_slots`] has reached the
/// load threshold, so an insertion never completes against an over-threshold
/// table. `resize` rebuilds the bucket array at the requested capacity and
/// replays every live entry into it, discarding any dead buckets.
///
/// [`occupied_slots`]: ProbeTable::occupied_slots
///
/// # Examples
///
/// ```rust
/// use probe_hash::ProbeTable;
/// use probe_hash::RobinHoodTable;
/// use probe_hash::TableError;
///
/// let mut table: RobinHoodTable<u64, &str> = RobinHoodTable::new();
/// table.put(1, "one");
/// table.put(2, "two");
///
/// assert_eq!(table.get(&1), Ok(&"one"));
/// assert_eq!(table.remove(&1), Some("one"));
/// assert_eq!(table.get(&1), Err(TableError::NotFound));
///
/// // Removing an absent key does nothing.
/// assert_eq!(table.remove(&1), None);
/// assert_eq!(table.len(), 1);
/// ```
pub trait ProbeTable<K, V> {
    /// Inserts `value` under `key`, returning the value it replaced.
    fn put(&mut self, key: K, value: V) -> Option<V>;

    /// Returns the value stored under `key`, or [`TableError::NotFound`].
    fn get(&self, key: &K) -> Result<&V>;

    /// Removes `key`, returning its value. Absent keys are a no-op.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Rebuilds the table with exactly `new_capacity` buckets.
    ///
    /// Fails with [`TableError::InvalidArgument`], leaving the table
    /// untouched, if `new_capacity` is zero or too small to hold the live
    /// entries plus one empty bucket.
    fn resize(&mut self, new_capacity: usize) -> Result<()>;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Number of buckets.
    fn capacity(&self) -> usize;

    /// Occupancy ratio at which `put` grows the table.
    fn load_threshold(&self) -> f32;

    /// Buckets counted against the load threshold.
    ///
    /// Equal to [`len`](ProbeTable::len) unless the variant leaves dead
    /// buckets behind on removal.
    fn occupied_slots(&self) -> usize {
        self.len()
    }

    /// Probe length of every occupied bucket, in bucket order.
    fn probe_lengths(&self) -> impl Iterator<Item = usize> + '_;

    /// Returns `true` if the table holds no live entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is present.
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_ok()
    }

    /// Ratio of occupied buckets to capacity.
    fn load_factor(&self) -> f32 {
        load_ratio(self.occupied_slots(), self.capacity())
    }

    /// Longest probe length among occupied buckets, `0` when empty.
    fn max_probe_length(&self) -> usize {
        self.probe_lengths().max().unwrap_or(0)
    }

    /// Feeds every probe length into `collector`, reads out the summary,
    /// and clears the collector again.
    fn report_probe_stats(&self, collector: &mut StreamStats) -> ProbeStats {
        for length in self.probe_lengths() {
            collector.add(length as f64);
        }
        let stats = collector.snapshot();
        collector.clear();
        stats
    }

    /// Summary of probe lengths over the occupied buckets.
    fn probe_stats(&self) -> ProbeStats {
        self.report_probe_stats(&mut StreamStats::new())
    }

    /// Histogram of probe lengths over the occupied buckets.
    fn probe_histogram(&self) -> ProbeHistogram {
        self.probe_lengths().collect()
    }
}
