//! Expiring, type-scoped concurrent cache
//!
//! Discovery responses and operator JWKS documents are fetched over the
//! network and reused across flows; this module stores them in a concurrent
//! key/value cache with per-entry-type expiry windows bounded by
//! operator-configured limits. Expiry is evaluated lazily on read; there is
//! no background sweep.

mod concurrent;

pub use concurrent::{ConcurrentCache, ExpiryWindow};

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// A value the cache can store.
///
/// The type tag scopes stored entries and expiry windows: a key maps to at
/// most one live value per tag, and [`ConcurrentCache::set_expiry_time`] is
/// bounded by the window configured for the tag.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync {
    /// Stable identifier for this entry type.
    const TYPE_TAG: &'static str;
}

/// Cache failure kinds.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The caller supplied an empty key to a write operation.
    #[error("cache key must be non-empty")]
    InvalidKey,

    /// The backing store could not serialize or deserialize a value.
    #[error("cache access failed for type `{type_tag}`: {source}")]
    Access {
        /// Type tag of the entry being accessed
        type_tag: &'static str,
        /// Underlying (de)serialization fault
        #[source]
        source: serde_json::Error,
    },

    /// A requested expiry falls outside the window configured for the type.
    #[error(
        "expiry {requested:?} for type `{type_tag}` outside configured window {min:?}..={max:?}"
    )]
    ExpiryLimit {
        /// Type tag whose window was violated
        type_tag: &'static str,
        /// The rejected duration
        requested: Duration,
        /// Lower bound of the configured window
        min: Duration,
        /// Upper bound of the configured window
        max: Duration,
    },
}
