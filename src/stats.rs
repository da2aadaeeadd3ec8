//! Probe-length statistics.
//!
//! Purely observational: nothing in here influences where a table places its
//! entries. Tables feed their probe lengths into a [`StreamStats`] collector
//! (see [`ProbeTable::report_probe_stats`]) and hand back a [`ProbeStats`]
//! snapshot that can be logged or printed.
//!
//! [`ProbeTable::report_probe_stats`]: crate::ProbeTable::report_probe_stats

use alloc::vec::Vec;
use core::fmt;

/// Streaming mean and variance using Welford's method.
///
/// # Examples
///
/// ```rust
/// use probe_hash::StreamStats;
///
/// let mut stats = StreamStats::new();
/// for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     stats.add(x);
/// }
/// assert_eq!(stats.count(), 8);
/// assert!((stats.mean() - 5.0).abs() < 1e-12);
/// assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    count: usize,
    mean: f64,
    m2: f64,
    max: f64,
}

impl StreamStats {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample.
    pub fn add(&mut self, x: f64) {
        self.count += 1;

        if self.count == 1 {
            self.mean = x;
            self.m2 = 0.0;
            self.max = x;
        } else {
            let delta = x - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (x - self.mean);
            if x > self.max {
                self.max = x;
            }
        }
    }

    /// Forgets every sample.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of samples seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Running mean, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (`n - 1` denominator), `0.0` with fewer than two
    /// samples.
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    /// Standard deviation.
    pub fn std_dev(&self) -> f64 {
        sqrt(self.variance())
    }

    /// Largest sample, `0.0` when empty.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Copies the current summary out of the collector.
    pub fn snapshot(&self) -> ProbeStats {
        ProbeStats {
            count: self.count,
            mean: self.mean,
            variance: self.variance(),
            std_dev: self.std_dev(),
            max: self.max as usize,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        #[inline]
        fn sqrt(x: f64) -> f64 {
            x.sqrt()
        }
    } else {
        // Newton's method; `core` has no float square root.
        fn sqrt(x: f64) -> f64 {
            if x <= 0.0 {
                return 0.0;
            }
            if !x.is_finite() {
                return x;
            }
            let mut guess = if x >= 1.0 { x } else { 1.0 };
            loop {
                let next = 0.5 * (guess + x / guess);
                if next >= guess {
                    return guess;
                }
                guess = next;
            }
        }
    }
}

/// Summary of probe lengths across a table's occupied buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeStats {
    /// Number of occupied buckets sampled
    pub count: usize,
    /// Mean probe length
    pub mean: f64,
    /// Sample variance of the probe length
    pub variance: f64,
    /// Standard deviation of the probe length
    pub std_dev: f64,
    /// Longest probe length
    pub max: usize,
}

impl fmt::Display for ProbeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples={} mean={:.4} variance={:.4} stddev={:.4} max={}",
            self.count, self.mean, self.variance, self.std_dev, self.max
        )
    }
}

impl ProbeStats {
    /// Emits the summary as an `info` record under `label`.
    pub fn log(&self, label: &str) {
        log::info!("{label}: probe lengths {self}");
    }

    /// Pretty-prints the summary to stdout.
    #[cfg(feature = "std")]
    pub fn print(&self, label: &str) {
        println!("---------------------------------------");
        println!("{label}");
        println!("---------------------------------------");
        println!("Samples: {}", self.count);
        println!("Mean: {:.4}", self.mean);
        println!("Variance: {:.4}", self.variance);
        println!("Standard Deviation: {:.4}", self.std_dev);
        println!("Max: {}", self.max);
        println!();
    }
}

/// Count of occupied buckets per probe length.
///
/// Bin `i` holds the number of entries stored exactly `i` buckets past
/// their home.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHistogram {
    bins: Vec<usize>,
}

impl FromIterator<usize> for ProbeHistogram {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bins = Vec::new();
        for length in iter {
            if length >= bins.len() {
                bins.resize(length + 1, 0);
            }
            bins[length] += 1;
        }
        Self { bins }
    }
}

impl ProbeHistogram {
    /// Per-length counts, indexed by probe length.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Longest probe length with a non-zero count.
    pub fn max_probe_length(&self) -> Option<usize> {
        self.bins.iter().rposition(|&count| count != 0)
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.total());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            bar.extend(partial);
            bar
        };

        let width = self.bins.len().to_string().len();
        for (length, &count) in self.bins.iter().enumerate() {
            println!("{length:>width$} | {} ({count})", make_bar(count));
        }
    }
}
