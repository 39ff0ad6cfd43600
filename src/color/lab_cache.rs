//! Memoized hex → Lab conversions.
//!
//! Filtering recomputes the distance of every item on every pass; the same few
//! dozen hex strings show up again and again, so conversions are kept in a
//! bounded LRU shared behind a mutex.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use super::error::ColorError;
use super::lab::{hex_to_lab, Lab};

/// Default number of memoized conversions.
const DEFAULT_CAPACITY: usize = 1024;

/// Bounded, thread-safe memo of hex → [`Lab`].
///
/// Keys are normalised (trimmed, lowercased, `#` stripped) so `#FFF` and `fff`
/// share an entry. Values are a pure function of the key, so two threads racing
/// to fill the same entry store identical values.
#[derive(Clone)]
pub struct LabCache {
    entries: Arc<Mutex<LruCache<String, Lab>>>,
}

impl LabCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn normalize(hex: &str) -> String {
        let trimmed = hex.trim();
        trimmed
            .strip_prefix('#')
            .unwrap_or(trimmed)
            .to_ascii_lowercase()
    }

    /// Returns the Lab value for `hex`, converting and memoizing on a miss.
    ///
    /// Malformed input is never cached.
    pub fn lab(&self, hex: &str) -> Result<Lab, ColorError> {
        let key = Self::normalize(hex);

        if let Some(lab) = self.entries.lock().get(&key) {
            return Ok(*lab);
        }

        let lab = hex_to_lab(hex)?;
        trace!(hex = %key, "Memoized Lab conversion");
        self.entries.lock().put(key, lab);
        Ok(lab)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for LabCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_hit_matches_direct_conversion() {
        let cache = LabCache::new();
        let direct = hex_to_lab("#3a5a44").unwrap();
        assert_eq!(cache.lab("#3a5a44").unwrap(), direct);
        assert_eq!(cache.lab("3A5A44").unwrap(), direct);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalid_not_cached() {
        let cache = LabCache::new();
        assert!(cache.lab("#zzz").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = LabCache::with_capacity(2);
        cache.lab("#000").unwrap();
        cache.lab("#fff").unwrap();
        cache.lab("#f00").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_fill_is_consistent() {
        let cache = LabCache::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.lab("#ff006e").unwrap())
            })
            .collect();

        let expected = hex_to_lab("#ff006e").unwrap();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        assert_eq!(cache.len(), 1);
    }
}
