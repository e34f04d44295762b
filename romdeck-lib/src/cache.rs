//! Time-boxed catalog cache.
//!
//! Wraps the systems registry and per-platform catalogs behind typed keys.
//! Entries expire after a fixed window so external ROM-directory changes
//! surface without a manual refresh; every mutation path must invalidate
//! the affected key before the next read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use romdeck_core::game::Game;
use romdeck_core::platform::Platform;

/// Cache addressing. A sum type rather than strings so a typo'd key is a
/// compile error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Systems,
    Catalog(String),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Systems(Arc<Vec<Platform>>),
    Catalog(Arc<Vec<Game>>),
}

struct CacheEntry {
    value: CacheValue,
    stored_at: Instant,
}

/// Per-key slot. Concurrent callers for the same key serialize on the slot
/// mutex: the first computes, the rest then observe the fresh entry.
/// Different keys never contend beyond the brief slot-map lookup.
#[derive(Default)]
struct Slot {
    entry: Mutex<Option<CacheEntry>>,
}

pub struct CatalogCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Arc<Slot>>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Get the systems registry, computing when absent, expired, or forced.
    /// Compute failures are not cached - the next caller retries.
    pub fn systems_with<E>(
        &self,
        force: bool,
        compute: impl FnOnce() -> Result<Vec<Platform>, E>,
    ) -> Result<Arc<Vec<Platform>>, E> {
        let slot = self.slot(CacheKey::Systems);
        let mut guard = lock(&slot.entry);

        if !force {
            if let Some(CacheEntry {
                value: CacheValue::Systems(platforms),
                stored_at,
            }) = guard.as_ref()
            {
                if stored_at.elapsed() < self.ttl {
                    return Ok(platforms.clone());
                }
            }
        }

        let platforms = Arc::new(compute()?);
        *guard = Some(CacheEntry {
            value: CacheValue::Systems(platforms.clone()),
            stored_at: Instant::now(),
        });
        Ok(platforms)
    }

    /// Get a platform's catalog, computing when absent, expired, or forced.
    pub fn catalog_with<E>(
        &self,
        platform_id: &str,
        force: bool,
        compute: impl FnOnce() -> Result<Vec<Game>, E>,
    ) -> Result<Arc<Vec<Game>>, E> {
        let slot = self.slot(CacheKey::Catalog(platform_id.to_string()));
        let mut guard = lock(&slot.entry);

        if !force {
            if let Some(CacheEntry {
                value: CacheValue::Catalog(games),
                stored_at,
            }) = guard.as_ref()
            {
                if stored_at.elapsed() < self.ttl {
                    return Ok(games.clone());
                }
            }
        }

        let games = Arc::new(compute()?);
        *guard = Some(CacheEntry {
            value: CacheValue::Catalog(games.clone()),
            stored_at: Instant::now(),
        });
        Ok(games)
    }

    /// Drop one key's entry. The next read recomputes.
    pub fn invalidate(&self, key: &CacheKey) {
        let slot = {
            let slots = lock(&self.slots);
            slots.get(key).cloned()
        };
        if let Some(slot) = slot {
            *lock(&slot.entry) = None;
            log::debug!("Cache invalidated: {key:?}");
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        let slots: Vec<Arc<Slot>> = lock(&self.slots).values().cloned().collect();
        for slot in slots {
            *lock(&slot.entry) = None;
        }
        log::debug!("Cache cleared");
    }

    fn slot(&self, key: CacheKey) -> Arc<Slot> {
        let mut slots = lock(&self.slots);
        slots.entry(key).or_default().clone()
    }
}

/// Lock that survives a poisoned mutex - a panicking compute on another
/// thread must not wedge the whole cache.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn games(n: usize) -> Vec<Game> {
        (0..n)
            .map(|i| Game {
                id: format!("test-{i}"),
                platform_id: "test".into(),
                file_name: format!("{i}.bin"),
                absolute_path: format!("/roms/test/{i}.bin").into(),
                extension: "bin".into(),
                name: format!("{i}"),
                description: String::new(),
                developer: None,
                publisher: None,
                genre: None,
                players: None,
                rating: None,
                release_date: None,
                region: None,
                lang: None,
                play_count: 0,
                last_played: None,
                favorite: false,
                hidden: false,
                image: None,
                thumbnail: None,
                video: None,
                marquee: None,
                fanart: None,
                mix: None,
            })
            .collect()
    }

    fn get(cache: &CatalogCache, id: &str, force: bool, n: usize) -> Arc<Vec<Game>> {
        let result: Result<_, Infallible> = cache.catalog_with(id, force, || Ok(games(n)));
        result.unwrap()
    }

    #[test]
    fn second_read_is_served_from_cache() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        let first = get(&cache, "snes", false, 1);
        let second = get(&cache, "snes", false, 99);
        assert_eq!(second.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn force_recomputes() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        get(&cache, "snes", false, 1);
        let forced = get(&cache, "snes", true, 2);
        assert_eq!(forced.len(), 2);
    }

    #[test]
    fn invalidate_recomputes_only_that_key() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        get(&cache, "snes", false, 1);
        get(&cache, "nes", false, 3);

        cache.invalidate(&CacheKey::Catalog("snes".into()));
        assert_eq!(get(&cache, "snes", false, 2).len(), 2);
        assert_eq!(get(&cache, "nes", false, 99).len(), 3);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = CatalogCache::new(Duration::from_millis(10));
        get(&cache, "snes", false, 1);
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(get(&cache, "snes", false, 2).len(), 2);
    }

    #[test]
    fn failed_compute_is_not_cached() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        let failed: Result<_, &str> = cache.catalog_with("snes", false, || Err("scan failed"));
        assert!(failed.is_err());
        assert_eq!(get(&cache, "snes", false, 4).len(), 4);
    }

    #[test]
    fn clear_drops_all_keys() {
        let cache = CatalogCache::new(Duration::from_secs(300));
        get(&cache, "snes", false, 1);
        let systems: Result<_, Infallible> = cache.systems_with(false, || Ok(vec![]));
        systems.unwrap();

        cache.clear();
        assert_eq!(get(&cache, "snes", false, 7).len(), 7);
    }

    #[test]
    fn concurrent_same_key_readers_coalesce() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache = Arc::new(CatalogCache::new(Duration::from_secs(300)));
        let computes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let computes = computes.clone();
                std::thread::spawn(move || {
                    let result: Result<_, Infallible> = cache.catalog_with("snes", false, || {
                        computes.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        Ok(games(1))
                    });
                    result.unwrap().len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(computes.load(Ordering::SeqCst), 1);
    }
}
