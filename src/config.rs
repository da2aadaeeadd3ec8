//! Construction parameters shared by all table variants.

use alloc::format;

use crate::error::Result;
use crate::error::TableError;

/// Initial number of buckets when none is requested.
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Fraction of capacity at which a table grows before inserting.
pub const DEFAULT_LOAD_THRESHOLD: f32 = 0.7;

/// Capacity and growth parameters for a probing table.
///
/// # Examples
///
/// ```rust
/// use probe_hash::TableConfig;
///
/// let config = TableConfig::default()
///     .with_initial_capacity(64)
///     .with_load_threshold(0.9);
/// assert!(config.validate().is_ok());
///
/// assert!(TableConfig::default().with_load_threshold(1.5).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableConfig {
    /// Number of buckets allocated up front. Must be positive.
    pub initial_capacity: usize,
    /// Occupancy ratio that triggers growth. Must lie in `(0, 1]`.
    pub load_threshold: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_threshold: DEFAULT_LOAD_THRESHOLD,
        }
    }
}

impl TableConfig {
    /// Creates a configuration from explicit parameters.
    pub fn new(initial_capacity: usize, load_threshold: f32) -> Self {
        Self {
            initial_capacity,
            load_threshold,
        }
    }

    /// Sets the initial bucket count.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the load threshold.
    pub fn with_load_threshold(mut self, load_threshold: f32) -> Self {
        self.load_threshold = load_threshold;
        self
    }

    /// Checks the parameters without allocating anything.
    ///
    /// A threshold of exactly `1.0` is accepted: tables still keep one
    /// bucket free so that probe sequences always terminate.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(TableError::invalid_argument(
                "initial capacity must be positive",
            ));
        }

        if !self.load_threshold.is_finite()
            || self.load_threshold <= 0.0
            || self.load_threshold > 1.0
        {
            return Err(TableError::invalid_argument(format!(
                "load threshold must lie in (0, 1], got {}",
                self.load_threshold
            )));
        }

        Ok(())
    }
}
