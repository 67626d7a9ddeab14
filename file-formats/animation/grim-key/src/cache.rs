use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::anim::KeyframeAnim;
use crate::error::Result;

type Entries = Mutex<HashMap<String, Weak<KeyframeAnim>>>;

/// Name-keyed cache that deduplicates loaded animation clips.
///
/// The cache holds weak references only, so it never keeps a clip alive by
/// itself: ownership stays with the `Arc`s handed to callers. Each clip
/// loaded through the cache carries a registration handle back to the
/// entry map and removes its entry when the last reference drops, so the
/// cache never resolves a name to a clip that no longer exists.
#[derive(Debug, Default)]
pub struct KeyframeCache {
    entries: Arc<Entries>,
}

impl KeyframeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the clip cached under `name`, or parse it from `data`.
    ///
    /// Parse failures are propagated and nothing is cached for the name.
    pub fn load(&self, name: &str, data: &[u8]) -> Result<Arc<KeyframeAnim>> {
        if let Some(hit) = self.get(name) {
            return Ok(hit);
        }

        let handle = CacheHandle {
            name: name.to_string(),
            entries: Arc::downgrade(&self.entries),
        };
        let anim = Arc::new(KeyframeAnim::load(name, data, Some(handle))?);
        self.lock().insert(name.to_string(), Arc::downgrade(&anim));
        debug!("cached keyframe animation '{name}'");
        Ok(anim)
    }

    /// Look up a live clip by name without loading anything
    pub fn get(&self, name: &str) -> Option<Arc<KeyframeAnim>> {
        self.lock().get(name).and_then(Weak::upgrade)
    }

    /// Number of registered clips
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Weak<KeyframeAnim>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration handle a cached clip holds back to its cache entry
#[derive(Debug)]
pub(crate) struct CacheHandle {
    name: String,
    entries: Weak<Entries>,
}

impl CacheHandle {
    /// Remove the entry for this clip; called from the clip's `Drop`
    pub(crate) fn release(&self) {
        let Some(entries) = self.entries.upgrade() else {
            // Cache dropped before the clip; nothing left to notify
            return;
        };
        let mut map = entries.lock().unwrap_or_else(PoisonError::into_inner);
        // The name may already have been re-bound to a newer clip
        if map.get(&self.name).is_some_and(|w| w.strong_count() == 0) {
            map.remove(&self.name);
            debug!("uncached keyframe animation '{}'", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &[u8] = b"\
section: header
flags 0
type 0
frames 10
fps 15
joints 1
section: keyframe nodes
nodes 0
";

    #[test]
    fn test_load_deduplicates_by_name() {
        let cache = KeyframeCache::new();
        let a = cache.load("walk.key", MINIMAL).unwrap();
        let b = cache.load("walk.key", b"garbage that would not parse").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_names_are_distinct_clips() {
        let cache = KeyframeCache::new();
        let a = cache.load("walk.key", MINIMAL).unwrap();
        let b = cache.load("run.key", MINIMAL).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_drop_deregisters() {
        let cache = KeyframeCache::new();
        let anim = cache.load("walk.key", MINIMAL).unwrap();
        assert!(cache.get("walk.key").is_some());

        drop(anim);
        assert!(cache.get("walk.key").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_parse_failure_caches_nothing() {
        let cache = KeyframeCache::new();
        assert!(cache.load("broken.key", b"not a keyframe file").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clip_outliving_cache_is_harmless() {
        let cache = KeyframeCache::new();
        let anim = cache.load("walk.key", MINIMAL).unwrap();
        drop(cache);
        drop(anim);
    }
}
