use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use songbridge_core::{AudioLinks, ValidatedRequest};
use songbridge_engine::{
    AudioLinkCache, CacheSettings, FailureKind, JobDetail, JobDetailData, JobId, ProviderClient,
    ProviderError,
};

const TTL: Duration = Duration::from_secs(5 * 60);

/// Provider stand-in: answers every lookup with the current scripted reply.
struct ScriptedProvider {
    reply: Mutex<Result<JobDetail, ProviderError>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedProvider {
    fn new(reply: Result<JobDetail, ProviderError>) -> Arc<Self> {
        Self::with_delay(reply, Duration::ZERO)
    }

    fn with_delay(reply: Result<JobDetail, ProviderError>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    fn set(&self, reply: Result<JobDetail, ProviderError>) {
        *self.reply.lock().unwrap() = reply;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProviderClient for ScriptedProvider {
    async fn submit(&self, _request: &ValidatedRequest) -> Result<JobId, ProviderError> {
        Ok("job-new".to_string())
    }

    async fn job_detail(&self, _job_id: &str) -> Result<JobDetail, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.lock().unwrap().clone()
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    fn settings(&self) -> CacheSettings {
        let now = self.now.clone();
        CacheSettings {
            ttl: TTL,
            max_entries: None,
            clock: Arc::new(move || *now.lock().unwrap()),
        }
    }
}

fn detail(stream: Option<&str>, audio: Option<&str>, status: &str) -> Result<JobDetail, ProviderError> {
    Ok(JobDetail::ok(JobDetailData {
        stream_audio_url: stream.map(str::to_string),
        audio_url: audio.map(str::to_string),
        status: Some(status.to_string()),
    }))
}

fn cache_with(provider: &Arc<ScriptedProvider>, clock: &ManualClock) -> AudioLinkCache {
    songbridge_logging::initialize_for_tests();
    AudioLinkCache::new(provider.clone(), clock.settings())
}

#[tokio::test]
async fn missing_job_id_skips_cache_and_provider() {
    let provider = ScriptedProvider::new(detail(Some("https://x/s.mp3"), None, "processing"));
    let cache = cache_with(&provider, &ManualClock::new());

    assert_eq!(cache.resolve(None).await, None);
    assert_eq!(cache.resolve(Some("")).await, None);
    assert_eq!(provider.calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn fresh_entry_is_served_without_provider_call() {
    let provider = ScriptedProvider::new(detail(Some("https://x/s.mp3"), Some("https://x/f.mp3"), "complete"));
    let clock = ManualClock::new();
    let cache = cache_with(&provider, &clock);

    let first = cache.resolve(Some("job-1")).await.expect("links");
    clock.advance(TTL - Duration::from_secs(1));
    let second = cache.resolve(Some("job-1")).await.expect("links");

    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn entry_expires_exactly_at_ttl() {
    let provider = ScriptedProvider::new(detail(None, Some("https://x/f.mp3"), "complete"));
    let clock = ManualClock::new();
    let cache = cache_with(&provider, &clock);

    cache.resolve(Some("job-1")).await;
    clock.advance(TTL);
    cache.resolve(Some("job-1")).await;

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let provider = ScriptedProvider::new(Err(ProviderError::new(FailureKind::Timeout, "slow")));
    let clock = ManualClock::new();
    let cache = cache_with(&provider, &clock);

    assert_eq!(cache.resolve(Some("job-1")).await, None);
    assert_eq!(cache.resolve(Some("job-1")).await, None);
    assert_eq!(provider.calls(), 2);

    provider.set(Ok(JobDetail::unsuccessful()));
    assert_eq!(cache.resolve(Some("job-1")).await, None);
    assert_eq!(provider.calls(), 3);

    provider.set(Ok(JobDetail {
        success: true,
        data: None,
    }));
    assert_eq!(cache.resolve(Some("job-1")).await, None);
    assert_eq!(provider.calls(), 4);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn links_follow_field_precedence() {
    let provider = ScriptedProvider::new(detail(Some("https://x/a.mp3"), Some("https://x/b.mp3"), "complete"));
    let cache = cache_with(&provider, &ManualClock::new());

    let both = cache.resolve(Some("both")).await.unwrap();
    assert_eq!(both.stream_url.as_deref(), Some("https://x/a.mp3"));
    assert_eq!(both.audio_url.as_deref(), Some("https://x/b.mp3"));

    provider.set(detail(None, Some("https://x/b.mp3"), "complete"));
    let audio_only = cache.resolve(Some("audio-only")).await.unwrap();
    assert_eq!(audio_only.stream_url.as_deref(), Some("https://x/b.mp3"));
    assert_eq!(audio_only.audio_url.as_deref(), Some("https://x/b.mp3"));

    provider.set(detail(None, None, "pending"));
    let neither = cache.resolve(Some("neither")).await.unwrap();
    assert_eq!(
        *neither,
        AudioLinks {
            stream_url: None,
            audio_url: None,
            status: Some("pending".to_string()),
        }
    );
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let provider = ScriptedProvider::new(detail(None, Some("https://x/f.mp3"), "complete"));
    let cache = cache_with(&provider, &ManualClock::new());

    cache.resolve(Some("job-1")).await;
    cache.invalidate(Some("job-1"));
    cache.invalidate(Some("job-1"));
    cache.resolve(Some("job-1")).await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn invalidate_all_clears_every_entry() {
    let provider = ScriptedProvider::new(detail(None, Some("https://x/f.mp3"), "complete"));
    let cache = cache_with(&provider, &ManualClock::new());

    cache.resolve(Some("job-1")).await;
    cache.resolve(Some("job-2")).await;
    assert_eq!(cache.len(), 2);

    cache.invalidate(None);
    assert!(cache.is_empty());
    cache.resolve(Some("job-1")).await;
    cache.resolve(Some("job-2")).await;
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn job_42_moves_from_stream_to_final_audio() {
    let provider = ScriptedProvider::new(detail(Some("https://x/s.mp3"), None, "processing"));
    let clock = ManualClock::new();
    let cache = cache_with(&provider, &clock);

    let early = cache.resolve(Some("job-42")).await.unwrap();
    assert_eq!(
        *early,
        AudioLinks {
            stream_url: Some("https://x/s.mp3".to_string()),
            audio_url: Some("https://x/s.mp3".to_string()),
            status: Some("processing".to_string()),
        }
    );

    provider.set(detail(None, Some("https://x/f.mp3"), "complete"));
    clock.advance(Duration::from_secs(6 * 60));

    let late = cache.resolve(Some("job-42")).await.unwrap();
    assert_eq!(
        *late,
        AudioLinks {
            stream_url: Some("https://x/f.mp3".to_string()),
            audio_url: Some("https://x/f.mp3".to_string()),
            status: Some("complete".to_string()),
        }
    );
}

#[tokio::test]
async fn concurrent_misses_share_one_lookup() {
    let provider = ScriptedProvider::with_delay(
        detail(Some("https://x/s.mp3"), None, "processing"),
        Duration::from_millis(50),
    );
    let cache = cache_with(&provider, &ManualClock::new());

    let (a, b, c) = tokio::join!(
        cache.resolve(Some("job-1")),
        cache.resolve(Some("job-1")),
        cache.resolve(Some("job-1")),
    );

    assert_eq!(provider.calls(), 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(a.is_some());
}

#[tokio::test]
async fn invalidation_during_lookup_discards_its_result() {
    let provider = ScriptedProvider::with_delay(
        detail(Some("https://x/s.mp3"), None, "processing"),
        Duration::from_millis(50),
    );
    let cache = cache_with(&provider, &ManualClock::new());

    let invalidator = cache.clone();
    let (links, ()) = tokio::join!(cache.resolve(Some("job-1")), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        invalidator.invalidate(Some("job-1"));
    });

    assert!(links.is_some());
    assert!(cache.is_empty());
    cache.resolve(Some("job-1")).await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn size_bound_evicts_oldest_entry() {
    let provider = ScriptedProvider::new(detail(None, Some("https://x/f.mp3"), "complete"));
    let clock = ManualClock::new();
    let mut settings = clock.settings();
    settings.max_entries = Some(2);
    songbridge_logging::initialize_for_tests();
    let cache = AudioLinkCache::new(provider.clone(), settings);

    cache.resolve(Some("job-1")).await;
    clock.advance(Duration::from_secs(1));
    cache.resolve(Some("job-2")).await;
    clock.advance(Duration::from_secs(1));
    cache.resolve(Some("job-3")).await;
    assert_eq!(cache.len(), 2);
    assert_eq!(provider.calls(), 3);

    // job-2 survived, job-1 did not.
    cache.resolve(Some("job-2")).await;
    assert_eq!(provider.calls(), 3);
    cache.resolve(Some("job-1")).await;
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn expired_entry_is_not_served_when_refresh_fails() {
    let provider = ScriptedProvider::new(detail(Some("https://x/s.mp3"), None, "processing"));
    let clock = ManualClock::new();
    let cache = cache_with(&provider, &clock);

    assert!(cache.resolve(Some("job-1")).await.is_some());
    clock.advance(TTL);
    provider.set(Err(ProviderError::new(FailureKind::Network, "connection reset")));

    assert_eq!(cache.resolve(Some("job-1")).await, None);
    assert_eq!(provider.calls(), 2);

    provider.set(Ok(JobDetail::unsuccessful()));
    assert_eq!(cache.resolve(Some("job-1")).await, None);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn abandoned_lookup_does_not_keep_cache_alive() {
    let provider = ScriptedProvider::with_delay(
        detail(Some("https://x/s.mp3"), None, "processing"),
        Duration::from_secs(60 * 60),
    );
    let cache = cache_with(&provider, &ManualClock::new());

    let waited = tokio::time::timeout(Duration::from_millis(20), cache.resolve(Some("job-1"))).await;
    assert!(waited.is_err());
    assert_eq!(provider.calls(), 1);

    drop(cache);
    assert_eq!(Arc::strong_count(&provider), 1);
}
