//! Hashing capabilities used by the probing tables.
//!
//! A table never hashes keys itself. It asks a [`KeyHasher`] for a digest
//! and reduces that digest modulo its current capacity to find the home
//! bucket. Any type can act as the capability, so callers may plug in their
//! own function without touching the tables.
//!
//! # Contract
//!
//! `hash` must be deterministic for the lifetime of a table: the same key has
//! to produce the same digest on every call. The tables do not check this.
//! A hasher that violates it leaves lookups, removals, and resizes with
//! unspecified (but memory-safe) results.

use alloc::string::String;
use core::hash::BuildHasher;
use core::hash::Hash;

/// Maps a key to an unsigned digest, independent of table capacity.
///
/// # Examples
///
/// ```rust
/// use probe_hash::KeyHasher;
///
/// struct ByLength;
///
/// impl KeyHasher<str> for ByLength {
///     fn hash(&self, key: &str) -> u64 {
///         key.len() as u64
///     }
/// }
///
/// assert_eq!(ByLength.hash("four"), 4);
/// ```
pub trait KeyHasher<K: ?Sized> {
    /// Returns the digest for `key`.
    fn hash(&self, key: &K) -> u64;
}

/// Default digests for primitive keys.
///
/// Integers up to 32 bits go through Thomas Wang's 32-bit integer mix,
/// wider integers through his 64-bit mix, and strings and byte slices through
/// the djb2 multiplicative accumulator. Key types with no implementation
/// here are rejected at compile time; supply a custom [`KeyHasher`] or a
/// [`BuildHasherAdapter`] for them instead.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultKeyHasher;

#[inline]
fn wang32(mut key: u32) -> u32 {
    key = key.wrapping_add(0x7ed5_5d16).wrapping_add(key << 12);
    key = (key ^ 0xc761_c23c) ^ (key >> 19);
    key = key.wrapping_add(0x1656_67b1).wrapping_add(key << 5);
    key = key.wrapping_add(0xd3a2_646c) ^ (key << 9);
    key = key.wrapping_add(0xfd70_46c5).wrapping_add(key << 3);
    key = (key ^ 0xb55a_4f09) ^ (key >> 16);
    key
}

#[inline]
fn wang64(mut key: u64) -> u64 {
    key = (!key).wrapping_add(key << 21);
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8);
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4);
    key ^= key >> 28;
    key = key.wrapping_add(key << 31);
    key
}

#[inline]
fn djb2(bytes: &[u8]) -> u64 {
    bytes.iter().fold(5381u64, |hash, &byte| {
        (hash << 5).wrapping_add(hash).wrapping_add(byte as u64)
    })
}

macro_rules! impl_narrow_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyHasher<$ty> for DefaultKeyHasher {
                #[inline]
                fn hash(&self, key: &$ty) -> u64 {
                    wang32(*key as u32) as u64
                }
            }
        )*
    };
}

macro_rules! impl_wide_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyHasher<$ty> for DefaultKeyHasher {
                #[inline]
                fn hash(&self, key: &$ty) -> u64 {
                    wang64(*key as u64)
                }
            }
        )*
    };
}

impl_narrow_int!(i8, i16, i32, u8, u16, u32, char);
impl_wide_int!(i64, u64, isize, usize);

impl KeyHasher<bool> for DefaultKeyHasher {
    #[inline]
    fn hash(&self, key: &bool) -> u64 {
        wang32(*key as u32) as u64
    }
}

impl KeyHasher<str> for DefaultKeyHasher {
    #[inline]
    fn hash(&self, key: &str) -> u64 {
        djb2(key.as_bytes())
    }
}

impl KeyHasher<String> for DefaultKeyHasher {
    #[inline]
    fn hash(&self, key: &String) -> u64 {
        djb2(key.as_bytes())
    }
}

impl KeyHasher<[u8]> for DefaultKeyHasher {
    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        djb2(key)
    }
}

impl<T: ?Sized> KeyHasher<&T> for DefaultKeyHasher
where
    DefaultKeyHasher: KeyHasher<T>,
{
    #[inline]
    fn hash(&self, key: &&T) -> u64 {
        <Self as KeyHasher<T>>::hash(self, *key)
    }
}

/// Uses an integer key as its own digest.
///
/// Handy when a test needs to pin keys to specific home buckets: with
/// capacity `n`, key `k` lands in bucket `k % n`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdentityHasher;

macro_rules! impl_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyHasher<$ty> for IdentityHasher {
                #[inline]
                fn hash(&self, key: &$ty) -> u64 {
                    *key as u64
                }
            }
        )*
    };
}

impl_identity!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Adapts any [`BuildHasher`] into a [`KeyHasher`] for keys implementing
/// [`Hash`].
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "std")]
/// # {
/// use std::hash::RandomState;
///
/// use probe_hash::KeyHasher;
/// use probe_hash::hasher::BuildHasherAdapter;
///
/// let hasher = BuildHasherAdapter::new(RandomState::new());
/// assert_eq!(hasher.hash(&"key"), hasher.hash(&"key"));
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct BuildHasherAdapter<S> {
    hash_builder: S,
}

impl<S> BuildHasherAdapter<S> {
    /// Wraps `hash_builder`.
    pub fn new(hash_builder: S) -> Self {
        Self { hash_builder }
    }

    /// Returns the wrapped builder.
    pub fn hash_builder(&self) -> &S {
        &self.hash_builder
    }
}

impl<K, S> KeyHasher<K> for BuildHasherAdapter<S>
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }
}

/// foldhash's randomly seeded builder behind the [`KeyHasher`] interface.
#[cfg(feature = "foldhash")]
pub type FoldHashBuilder = BuildHasherAdapter<foldhash::fast::RandomState>;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Randomly seeded [`KeyHasher`] for any `K: Hash`.
        pub type DefaultHashBuilder = FoldHashBuilder;
    } else if #[cfg(feature = "std")] {
        /// Randomly seeded [`KeyHasher`] for any `K: Hash`.
        pub type DefaultHashBuilder = BuildHasherAdapter<std::hash::RandomState>;
    }
}
