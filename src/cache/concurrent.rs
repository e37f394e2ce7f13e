//! Concurrent cache implementation backed by a sharded map

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::{CacheError, Cacheable};

/// Per-type bounds on the expiry a caller may configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    /// Smallest expiry a caller may set for the type.
    pub min: Duration,
    /// Largest expiry a caller may set for the type.
    pub max: Duration,
}

impl ExpiryWindow {
    /// Create a window. An inverted pair is reordered so the window stays
    /// usable.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    fn contains(&self, duration: Duration) -> bool {
        duration >= self.min && duration <= self.max
    }
}

/// One stored value plus its expiry bookkeeping.
#[derive(Debug, Clone)]
struct StoredEntry {
    value: serde_json::Value,
    stored_at: SystemTime,
    expires_at: Option<SystemTime>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            // Clock going backwards reads as not-yet-expired; the entry
            // simply lives until the clock catches up.
            Some(deadline) => SystemTime::now() >= deadline,
            None => false,
        }
    }
}

/// Concurrent key/value store, generic over [`Cacheable`] types.
///
/// Entries are scoped by `(type tag, key)`: the same key may hold one live
/// value per type. Writes under an existing key replace the previous entry
/// atomically. Expired entries are evicted lazily when read.
///
/// # Example
///
/// ```rust
/// use mobile_connect::cache::{Cacheable, ConcurrentCache};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Endpoints { token_url: String }
///
/// impl Cacheable for Endpoints {
///     const TYPE_TAG: &'static str = "endpoints";
/// }
///
/// let cache = ConcurrentCache::new();
/// cache.add("+447700900901", &Endpoints { token_url: "https://op.example/token".into() })?;
/// let hit: Option<Endpoints> = cache.get("+447700900901")?;
/// assert!(hit.is_some());
/// # Ok::<(), mobile_connect::cache::CacheError>(())
/// ```
#[derive(Debug, Default)]
pub struct ConcurrentCache {
    entries: DashMap<(&'static str, String), StoredEntry>,
    /// Configured once at construction; absent tag means no bound is enforced.
    limits: HashMap<&'static str, ExpiryWindow>,
    /// Default expiry applied to future entries, per type tag.
    expiry_defaults: DashMap<&'static str, Duration>,
}

impl ConcurrentCache {
    /// Create a cache with no expiry windows configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with per-type expiry windows.
    pub fn with_limits(limits: HashMap<&'static str, ExpiryWindow>) -> Self {
        Self {
            entries: DashMap::new(),
            limits,
            expiry_defaults: DashMap::new(),
        }
    }

    /// Store `value` under `key`, replacing any existing entry of the same
    /// type and key.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidKey`] for an empty key; [`CacheError::Access`]
    /// if the value cannot be serialized into the backing store.
    pub fn add<T: Cacheable>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let value = serde_json::to_value(value).map_err(|source| CacheError::Access {
            type_tag: T::TYPE_TAG,
            source,
        })?;

        let now = SystemTime::now();
        let expires_at = self
            .expiry_defaults
            .get(T::TYPE_TAG)
            .map(|ttl| now + *ttl);

        debug!(
            type_tag = T::TYPE_TAG,
            key,
            expires = expires_at.is_some(),
            "Caching entry"
        );

        self.entries.insert(
            (T::TYPE_TAG, key.to_string()),
            StoredEntry {
                value,
                stored_at: now,
                expires_at,
            },
        );

        Ok(())
    }

    /// Read the value stored under `key`, evicting it first if expired.
    ///
    /// An empty key yields `None`, never an error.
    ///
    /// # Errors
    ///
    /// [`CacheError::Access`] if a stored value cannot be deserialized into
    /// `T`.
    pub fn get<T: Cacheable>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_with_options(key, true)
    }

    /// Read the value stored under `key`.
    ///
    /// With `remove_if_expired = true` an expired entry is deleted and `None`
    /// returned. With `remove_if_expired = false` the stale value is still
    /// returned, with no staleness signal: callers that can tolerate
    /// best-effort data (e.g. operator endpoints while the network is down)
    /// opt into this deliberately.
    pub fn get_with_options<T: Cacheable>(
        &self,
        key: &str,
        remove_if_expired: bool,
    ) -> Result<Option<T>, CacheError> {
        if key.is_empty() {
            return Ok(None);
        }

        let map_key = (T::TYPE_TAG, key.to_string());

        let value = match self.entries.get(&map_key) {
            Some(entry) => {
                if entry.is_expired() && remove_if_expired {
                    drop(entry); // release the shard lock before removing
                    debug!(type_tag = T::TYPE_TAG, key, "Evicting expired entry");
                    // Re-check under the write lock: a fresh write may have
                    // replaced the entry since the read guard was dropped.
                    self.entries.remove_if(&map_key, |_, entry| entry.is_expired());
                    return Ok(None);
                }
                if entry.is_expired() {
                    warn!(
                        type_tag = T::TYPE_TAG,
                        key,
                        stored_at = ?entry.stored_at,
                        "Returning stale cache entry"
                    );
                }
                entry.value.clone()
            }
            None => return Ok(None),
        };

        let typed = serde_json::from_value(value).map_err(|source| CacheError::Access {
            type_tag: T::TYPE_TAG,
            source,
        })?;

        Ok(Some(typed))
    }

    /// Delete every entry stored under `key`, across all types.
    pub fn remove(&self, key: &str) {
        self.entries.retain(|(_, k), _| k != key);
    }

    /// Delete the entry stored under `key` for a single type.
    pub fn remove_typed<T: Cacheable>(&self, key: &str) {
        self.entries.remove(&(T::TYPE_TAG, key.to_string()));
    }

    /// Empty the whole store, all types.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// True iff no entries of any type remain.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live entries (expired-but-unevicted entries included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Set the default expiry future entries of type `T` will use.
    ///
    /// # Errors
    ///
    /// [`CacheError::ExpiryLimit`] if `duration` falls outside the window
    /// configured for the type; the previous default is left untouched.
    /// Types with no configured window accept any duration.
    pub fn set_expiry_time<T: Cacheable>(&self, duration: Duration) -> Result<(), CacheError> {
        if let Some(window) = self.limits.get(T::TYPE_TAG) {
            if !window.contains(duration) {
                return Err(CacheError::ExpiryLimit {
                    type_tag: T::TYPE_TAG,
                    requested: duration,
                    min: window.min,
                    max: window.max,
                });
            }
        }

        self.expiry_defaults.insert(T::TYPE_TAG, duration);
        Ok(())
    }

    /// The currently configured default expiry for type `T`, if any.
    pub fn expiry_time<T: Cacheable>(&self) -> Option<Duration> {
        self.expiry_defaults.get(T::TYPE_TAG).map(|d| *d)
    }
}
