//! Memoized, throttled provider calls.
//!
//! Every provider call goes through [`CachedLookup`]:
//! - a cache hit returns immediately, with no network call and no pause;
//! - a miss calls the provider once, stores the answer, then pauses for
//!   the configured delay;
//! - a per-key lock makes concurrent callers for the same key wait for
//!   the first one and share its outcome instead of issuing their own call.
//!
//! Recoverable provider failures become "not found" for that call and are
//! not cached, so a later lookup retries them. Auth failures propagate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::GeocodeCache;
use crate::model::{CacheKey, CachedValue, Coordinate};
use crate::provider::{Geocoder, ProviderError, ReverseGeocoder};

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

/// Fixed pause after each uncached provider call.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    pauses: AtomicUsize,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pauses: AtomicUsize::new(0) }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    /// How many pauses were taken so far.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: usize,
    pub calls: usize,
    pub degraded: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicUsize,
    calls: AtomicUsize,
    degraded: AtomicUsize,
}

// ---------------------------------------------------------------------------
// CachedLookup
// ---------------------------------------------------------------------------

/// Outcome of the call made under a key lock, shared with the callers
/// queued behind it. Dropped once the last of them releases the key.
type Outcome = Option<Result<CachedValue, ProviderError>>;
type KeyLock = Arc<Mutex<Outcome>>;

pub struct CachedLookup {
    cache: Arc<dyn GeocodeCache>,
    throttle: Throttle,
    in_flight: Mutex<HashMap<CacheKey, KeyLock>>,
    counters: Counters,
}

impl CachedLookup {
    pub fn new(cache: Arc<dyn GeocodeCache>, throttle: Throttle) -> Self {
        Self {
            cache,
            throttle,
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            calls: self.counters.calls.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    /// Forward geocode through the cache.
    pub fn geocode(
        &self,
        provider: &dyn Geocoder,
        address: &str,
    ) -> Result<Option<Coordinate>, ProviderError> {
        let key = CacheKey::new(provider.provider(), address);
        let value = self.resolve(&key, || {
            info!(provider = %provider.provider(), address, "geocoding");
            provider
                .geocode(address)
                .map(|found| found.map_or(CachedValue::NotFound, CachedValue::Coordinate))
        })?;
        Ok(match value {
            CachedValue::Coordinate(c) => Some(c),
            _ => None,
        })
    }

    /// Reverse geocode through the cache.
    pub fn reverse_geocode(
        &self,
        provider: &dyn ReverseGeocoder,
        at: Coordinate,
    ) -> Result<Option<String>, ProviderError> {
        let key = CacheKey::reverse(at);
        let value = self.resolve(&key, || {
            info!(lat = at.lat, lon = at.lon, "reverse geocoding");
            provider
                .reverse_geocode(at)
                .map(|found| found.map_or(CachedValue::NotFound, CachedValue::Address))
        })?;
        Ok(match value {
            CachedValue::Address(a) => Some(a),
            _ => None,
        })
    }

    fn key_lock(&self, key: &CacheKey) -> KeyLock {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.entry(key.clone()).or_default().clone()
    }

    fn release_key(&self, key: &CacheKey, lock: &KeyLock) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // Map + our handle; nobody else is waiting on this key.
        if Arc::strong_count(lock) <= 2 {
            in_flight.remove(key);
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<CachedValue> {
        match self.cache.get(key) {
            Ok(found) => found,
            Err(e) => {
                warn!(provider = %key.provider, key = %key.key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    fn resolve(
        &self,
        key: &CacheKey,
        fetch: impl FnOnce() -> Result<CachedValue, ProviderError>,
    ) -> Result<CachedValue, ProviderError> {
        if let Some(hit) = self.cached(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(provider = %key.provider, key = %key.key, "cache hit");
            return Ok(hit);
        }

        let lock = self.key_lock(key);
        let result = {
            let mut outcome = lock.lock().unwrap_or_else(|e| e.into_inner());
            match outcome.as_ref() {
                Some(shared) => {
                    debug!(provider = %key.provider, key = %key.key, "sharing in-flight outcome");
                    shared.clone()
                }
                None => {
                    let fresh = self.resolve_locked(key, fetch);
                    *outcome = Some(fresh.clone());
                    fresh
                }
            }
        };
        self.release_key(key, &lock);
        result
    }

    fn resolve_locked(
        &self,
        key: &CacheKey,
        fetch: impl FnOnce() -> Result<CachedValue, ProviderError>,
    ) -> Result<CachedValue, ProviderError> {
        // Another caller may have filled the key while we waited.
        if let Some(hit) = self.cached(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }

        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        let outcome = fetch();
        self.throttle.pause();

        match outcome {
            Ok(value) => {
                if let Err(e) = self.cache.put(key, &value) {
                    warn!(provider = %key.provider, key = %key.key, error = %e, "cache write failed");
                }
                Ok(value)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(provider = %key.provider, key = %key.key, error = %e, "lookup failed; treating as not found");
                Ok(CachedValue::NotFound)
            }
        }
    }
}
