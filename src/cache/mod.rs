//! Bounded, single-flight cache in front of a [`HolidayProvider`].
//!
//! [`CachedHolidayProvider`] keeps at most `capacity` (year, country) entries
//! in least-recently-used order and guarantees that, for any one key, only a
//! single upstream fetch is in flight at a time. Callers that arrive while a
//! fetch is running wait for it and share its outcome.
//!
//! Successful answers are cached, including empty ones. Failures are handed
//! to every waiting caller and then forgotten, so the next request for the
//! key tries the upstream again.
//!
//! ## Locking
//!
//! All bookkeeping sits behind one [`parking_lot::Mutex`] that is only held
//! for map operations, never across an `.await`. Waiting on a slow upstream
//! happens on a per-key [`OnceCell`], so unrelated keys never block each other.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::provider::{HolidayProvider, Holidays, ProviderError};

/// Capacity used by [`CachedHolidayProvider::new`].
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Identifies one fetchable unit of holiday data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    year: i32,
    country_code: String,
}

impl CacheKey {
    pub fn new(year: i32, country_code: impl Into<String>) -> Self {
        Self {
            year,
            country_code: country_code.into(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.year, self.country_code)
    }
}

/// Outcome of one upstream fetch, shared by everyone who waited on it.
type Flight = OnceCell<Result<Holidays, ProviderError>>;

struct CacheState {
    entries: LruCache<CacheKey, Holidays>,
    in_flight: HashMap<CacheKey, Arc<Flight>>,
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups answered from a resident entry.
    pub hits: u64,
    /// Lookups that found no resident entry (and joined or started a fetch).
    pub misses: u64,
    /// Calls made to the upstream provider.
    pub fetches: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
}

/// A [`HolidayProvider`] that caches another provider's answers.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use holiday_lens::cache::CachedHolidayProvider;
/// use holiday_lens::provider::{HolidayProvider, NagerProvider, nager::DEFAULT_BASE_URL};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let upstream = NagerProvider::new(DEFAULT_BASE_URL, Duration::from_secs(10))?;
/// let cache = CachedHolidayProvider::new(upstream);
///
/// let first = cache.fetch(2024, "DE").await?;
/// let second = cache.fetch(2024, "DE").await?; // served from memory
/// assert_eq!(first.len(), second.len());
/// # Ok(())
/// # }
/// ```
pub struct CachedHolidayProvider<P> {
    upstream: P,
    capacity: NonZeroUsize,
    state: Mutex<CacheState>,
    stats: CacheStats,
}

impl<P> CachedHolidayProvider<P>
where
    P: HolidayProvider,
{
    /// Wraps `upstream` with a cache of [`DEFAULT_CAPACITY`] entries.
    pub fn new(upstream: P) -> Self {
        Self::with_capacity(upstream, DEFAULT_CAPACITY)
    }

    /// Wraps `upstream` with a cache holding at most `capacity` entries.
    pub fn with_capacity(upstream: P, capacity: NonZeroUsize) -> Self {
        Self {
            upstream,
            capacity,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
            stats: CacheStats::default(),
        }
    }

    /// Returns the holidays for `(year, country_code)`, fetching them on a miss.
    ///
    /// At most one upstream fetch per key runs at any time; concurrent callers
    /// for the same key receive that fetch's result, whether success or
    /// failure. Failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns the [`ProviderError`] of the upstream fetch this call joined.
    pub async fn get(&self, year: i32, country_code: &str) -> Result<Holidays, ProviderError> {
        let key = CacheKey::new(year, country_code);

        let flight = {
            let mut state = self.state.lock();
            if let Some(holidays) = state.entries.get(&key) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "cache hit");
                return Ok(Arc::clone(holidays));
            }
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            Arc::clone(state.in_flight.entry(key.clone()).or_default())
        };
        let waiter = Waiter {
            state: &self.state,
            key: &key,
            flight: Some(flight),
        };
        let flight = waiter.flight();

        let outcome = flight
            .get_or_init(|| async {
                self.stats.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "fetching holidays from upstream");
                self.upstream.fetch(year, country_code).await
            })
            .await
            .clone();

        self.settle(&key, flight, &outcome);
        outcome
    }

    // Retires a finished flight. Only the caller that still finds `flight`
    // registered stores the result; the others just refresh recency.
    fn settle(&self, key: &CacheKey, flight: &Arc<Flight>, outcome: &Result<Holidays, ProviderError>) {
        let mut state = self.state.lock();

        let owner = state
            .in_flight
            .get(key)
            .is_some_and(|registered| Arc::ptr_eq(registered, flight));
        if owner {
            state.in_flight.remove(key);
        }

        match outcome {
            Ok(holidays) if owner => {
                if let Some((evicted, _)) = state.entries.push(key.clone(), Arc::clone(holidays)) {
                    if evicted != *key {
                        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %key, evicted = %evicted, "cache full, evicted least recently used");
                    }
                }
            }
            Ok(_) => {
                state.entries.get(key);
            }
            Err(e) if owner => {
                warn!(key = %key, error = %e, "upstream fetch failed, result not cached");
            }
            Err(_) => {}
        }
    }

    /// Maximum number of resident entries.
    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `(year, country_code)` is resident, without touching
    /// its recency.
    pub fn contains(&self, year: i32, country_code: &str) -> bool {
        self.state
            .lock()
            .entries
            .contains(&CacheKey::new(year, country_code))
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Returns a snapshot of the hit/miss/fetch/eviction counters.
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            fetches: self.stats.fetches.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    /// Returns the wrapped provider.
    pub fn upstream(&self) -> &P {
        &self.upstream
    }
}

// One caller's hold on a flight. Dropping the last hold on a flight that never
// finished (every waiter was cancelled) unregisters it.
struct Waiter<'a> {
    state: &'a Mutex<CacheState>,
    key: &'a CacheKey,
    flight: Option<Arc<Flight>>,
}

impl Waiter<'_> {
    fn flight(&self) -> &Arc<Flight> {
        match &self.flight {
            Some(flight) => flight,
            None => unreachable!("flight is only taken on drop"),
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let Some(flight) = self.flight.take() else {
            return;
        };
        if flight.initialized() {
            return;
        }

        // Joining a flight clones it under this lock, so the count is stable here.
        let mut state = self.state.lock();
        let ours = state
            .in_flight
            .get(self.key)
            .is_some_and(|registered| Arc::ptr_eq(registered, &flight));
        drop(flight);
        let abandoned = ours
            && state
                .in_flight
                .get(self.key)
                .is_some_and(|registered| Arc::strong_count(registered) == 1 && !registered.initialized());
        if abandoned {
            state.in_flight.remove(self.key);
            debug!(key = %self.key, "every caller gave up, dropped unfinished fetch");
        }
    }
}

#[async_trait]
impl<P> HolidayProvider for CachedHolidayProvider<P>
where
    P: HolidayProvider,
{
    async fn fetch(&self, year: i32, country_code: &str) -> Result<Holidays, ProviderError> {
        self.get(year, country_code).await
    }
}

impl<P> fmt::Debug for CachedHolidayProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedHolidayProvider")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
