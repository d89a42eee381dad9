//! Time-bounded map from job id to the job's latest audio links.
//!
//! A fresh entry is served without touching the provider. Misses and stale
//! entries trigger one provider lookup per key at a time; concurrent callers
//! for the same key await the same lookup. Failed lookups are never cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use songbridge_core::{AudioLinks, ValidatedConfig, DEFAULT_LINK_CACHE_TTL_SECS};
use songbridge_logging::{bridge_debug, bridge_warn};

use crate::ProviderClient;

/// Source of "now" for freshness checks.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

#[derive(Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    /// Oldest entries are evicted past this size. `None` keeps every job seen.
    pub max_entries: Option<usize>,
    pub clock: Clock,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_LINK_CACHE_TTL_SECS),
            max_entries: None,
            clock: Arc::new(Instant::now),
        }
    }
}

impl CacheSettings {
    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self {
            ttl: config.link_cache_ttl,
            max_entries: config.link_cache_max_entries,
            ..Self::default()
        }
    }
}

type Lookup = Shared<BoxFuture<'static, Option<Arc<AudioLinks>>>>;

struct CacheEntry {
    links: Arc<AudioLinks>,
    fetched_at: Instant,
}

struct InFlight {
    id: u64,
    lookup: Lookup,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    next_flight: u64,
}

struct CacheInner {
    provider: Arc<dyn ProviderClient>,
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

/// Shared handle to the link cache. Clones refer to the same entries.
#[derive(Clone)]
pub struct AudioLinkCache {
    inner: Arc<CacheInner>,
}

impl AudioLinkCache {
    pub fn new(provider: Arc<dyn ProviderClient>, settings: CacheSettings) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                provider,
                settings,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Returns the job's audio links, querying the provider when no fresh
    /// entry exists.
    ///
    /// `None` covers both "no job id" and "nothing usable right now"; callers
    /// should retry later in either case.
    pub async fn resolve(&self, job_id: Option<&str>) -> Option<Arc<AudioLinks>> {
        let job_id = job_id.filter(|id| !id.is_empty())?;

        let lookup = {
            let mut state = self.inner.lock_state();
            let now = (self.inner.settings.clock)();
            if let Some(entry) = state.entries.get(job_id) {
                if now.saturating_duration_since(entry.fetched_at) < self.inner.settings.ttl {
                    bridge_debug!("Link cache hit for {}", job_id);
                    return Some(entry.links.clone());
                }
            }
            match state.in_flight.get(job_id) {
                Some(flight) => {
                    bridge_debug!("Joining in-flight lookup for {}", job_id);
                    flight.lookup.clone()
                }
                None => self.start_lookup(&mut state, job_id),
            }
        };

        lookup.await
    }

    /// Drops the entry for `job_id`, or every entry when `None`.
    ///
    /// Lookups already in flight for the dropped keys still answer their
    /// waiters but no longer write to the cache.
    pub fn invalidate(&self, job_id: Option<&str>) {
        let mut state = self.inner.lock_state();
        match job_id {
            Some(job_id) => {
                state.entries.remove(job_id);
                state.in_flight.remove(job_id);
            }
            None => {
                state.entries.clear();
                state.in_flight.clear();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start_lookup(&self, state: &mut CacheState, job_id: &str) -> Lookup {
        let id = state.next_flight;
        state.next_flight = state.next_flight.wrapping_add(1);

        // Weak: the in-flight map owns this future, a strong handle would cycle.
        let provider = self.inner.provider.clone();
        let cache = Arc::downgrade(&self.inner);
        let key = job_id.to_string();
        let lookup = async move {
            let links = fetch_links(provider.as_ref(), &key).await;
            if let Some(inner) = cache.upgrade() {
                inner.store(key, id, links.as_ref());
            }
            links
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            job_id.to_string(),
            InFlight {
                id,
                lookup: lookup.clone(),
            },
        );
        lookup
    }
}

impl CacheInner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the outcome of flight `flight`, unless it was invalidated
    /// while running.
    fn store(&self, job_id: String, flight: u64, links: Option<&Arc<AudioLinks>>) {
        let mut state = self.lock_state();
        let current = state.in_flight.get(&job_id).map(|f| f.id) == Some(flight);
        if !current {
            return;
        }
        state.in_flight.remove(&job_id);
        if let Some(links) = links {
            let fetched_at = (self.settings.clock)();
            state.entries.insert(
                job_id,
                CacheEntry {
                    links: links.clone(),
                    fetched_at,
                },
            );
            if let Some(max) = self.settings.max_entries {
                evict_oldest(&mut state.entries, max);
            }
        }
    }
}

async fn fetch_links(provider: &dyn ProviderClient, job_id: &str) -> Option<Arc<AudioLinks>> {
    match provider.job_detail(job_id).await {
        Ok(detail) if detail.success => match detail.data {
            Some(data) => Some(Arc::new(AudioLinks::from_provider(
                data.stream_audio_url.as_deref(),
                data.audio_url.as_deref(),
                data.status.as_deref(),
            ))),
            None => {
                bridge_debug!("Job detail for {} carried no data", job_id);
                None
            }
        },
        Ok(_) => {
            bridge_debug!("Job detail for {} was not successful", job_id);
            None
        }
        Err(err) => {
            bridge_warn!("Job detail lookup for {} failed: {}", job_id, err);
            None
        }
    }
}

fn evict_oldest(entries: &mut HashMap<String, CacheEntry>, max: usize) {
    while entries.len() > max {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.fetched_at)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                bridge_debug!("Evicting link cache entry for {}", key);
                entries.remove(&key);
            }
            None => break,
        }
    }
}
