#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod hasher;

/// Linear probing with tombstone (lazy) deletion.
pub mod lazy;

/// Robin Hood hashing with backward-shift deletion.
///
/// Insertion displaces residents that sit closer to their home bucket than
/// the incoming entry, which keeps probe lengths short and tightly
/// distributed even at high load.
pub mod robin_hood;

/// Linear probing with backward-shift deletion.
pub mod shift;

pub mod stats;
pub mod table;

pub use config::TableConfig;
pub use error::Result;
pub use error::TableError;
pub use hasher::DefaultKeyHasher;
pub use hasher::KeyHasher;
pub use lazy::LazyProbeTable;
pub use robin_hood::RobinHoodTable;
pub use shift::ShiftProbeTable;
pub use stats::ProbeHistogram;
pub use stats::ProbeStats;
pub use stats::StreamStats;
pub use table::ProbeTable;
