use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use songbridge_core::{CallbackStage, Gateway, IssueCode, ValidatedRequest};
use songbridge_engine::{
    AudioLinkCache, CacheSettings, JobDetail, JobDetailData, JobId, ProviderClient,
    ProviderError, Reconciler,
};

/// Reports whatever status it was last given and counts lookups.
struct StatusProvider {
    status: Mutex<String>,
    calls: AtomicUsize,
}

impl StatusProvider {
    fn new(status: &str) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn set(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProviderClient for StatusProvider {
    async fn submit(&self, _request: &ValidatedRequest) -> Result<JobId, ProviderError> {
        Ok("job-1".to_string())
    }

    async fn job_detail(&self, _job_id: &str) -> Result<JobDetail, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(JobDetail::ok(JobDetailData {
            stream_audio_url: Some("https://x/s.mp3".to_string()),
            audio_url: None,
            status: Some(self.status.lock().unwrap().clone()),
        }))
    }
}

fn callback(stage: &str, task_id: &str) -> Value {
    json!({
        "code": 200,
        "msg": "ok",
        "data": {
            "callbackType": stage,
            "task_id": task_id,
            "data": [ { "id": "t1", "stream_audio_url": "https://x/s.mp3" } ]
        }
    })
}

fn reconciler(provider: &Arc<StatusProvider>) -> Reconciler {
    songbridge_logging::initialize_for_tests();
    let cache = AudioLinkCache::new(provider.clone(), CacheSettings::default());
    Reconciler::new(Gateway::new(), cache)
}

#[tokio::test]
async fn applied_callback_invalidates_cached_links() {
    let provider = StatusProvider::new("TEXT_SUCCESS");
    let reconciler = reconciler(&provider);

    let before = reconciler.cache().resolve(Some("job-1")).await.unwrap();
    assert_eq!(before.status.as_deref(), Some("TEXT_SUCCESS"));

    provider.set("FIRST_SUCCESS");
    let receipt = reconciler.on_callback(&callback("first", "job-1")).await.expect("valid");
    assert!(receipt.applied);
    assert!(!receipt.terminal);
    assert_eq!(receipt.job_id, "job-1");
    assert_eq!(receipt.track_count, 1);
    assert_eq!(reconciler.stage("job-1"), Some(CallbackStage::First));

    let after = reconciler.cache().resolve(Some("job-1")).await.unwrap();
    assert_eq!(after.status.as_deref(), Some("FIRST_SUCCESS"));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn invalid_callback_is_rejected_before_anything_happens() {
    let provider = StatusProvider::new("PENDING");
    let reconciler = reconciler(&provider);
    reconciler.cache().resolve(Some("job-1")).await;

    let mut payload = callback("complete", "job-1");
    payload["data"].as_object_mut().unwrap().remove("callbackType");
    let err = reconciler.on_callback(&payload).await.unwrap_err();
    assert_eq!(err.issue_at("data.callbackType").unwrap().code, IssueCode::Required);

    assert_eq!(reconciler.stage("job-1"), None);
    assert_eq!(reconciler.cache().len(), 1);
}

#[tokio::test]
async fn stages_never_move_backwards() {
    let provider = StatusProvider::new("SUCCESS");
    let reconciler = reconciler(&provider);

    assert!(reconciler.on_callback(&callback("first", "job-1")).await.unwrap().applied);
    assert!(!reconciler.on_callback(&callback("text", "job-1")).await.unwrap().applied);

    let done = reconciler.on_callback(&callback("complete", "job-1")).await.unwrap();
    assert!(done.applied);
    assert!(done.terminal);

    // Terminal: even an error report no longer changes the job.
    reconciler.cache().resolve(Some("job-1")).await;
    let late = reconciler.on_callback(&callback("error", "job-1")).await.unwrap();
    assert!(!late.applied);
    assert_eq!(reconciler.stage("job-1"), Some(CallbackStage::Complete));
    assert_eq!(reconciler.cache().len(), 1);
}

#[tokio::test]
async fn refresh_always_asks_the_provider() {
    let provider = StatusProvider::new("PENDING");
    let reconciler = reconciler(&provider);

    reconciler.cache().resolve(Some("job-1")).await;
    provider.set("SUCCESS");
    let links = reconciler.refresh("job-1").await.unwrap();
    assert_eq!(links.status.as_deref(), Some("SUCCESS"));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn forget_releases_job_state() {
    let provider = StatusProvider::new("SUCCESS");
    let reconciler = reconciler(&provider);

    reconciler.on_callback(&callback("complete", "job-1")).await.unwrap();
    reconciler.cache().resolve(Some("job-1")).await;
    assert_eq!(reconciler.stage("job-1"), Some(CallbackStage::Complete));

    reconciler.forget("job-1");
    assert_eq!(reconciler.stage("job-1"), None);
    assert!(reconciler.cache().is_empty());

    let again = reconciler.on_callback(&callback("text", "job-1")).await.unwrap();
    assert!(again.applied);
    assert_eq!(reconciler.stage("job-1"), Some(CallbackStage::Text));
}

#[tokio::test]
async fn provider_failure_callback_is_terminal() {
    let provider = StatusProvider::new("GENERATE_AUDIO_FAILED");
    let reconciler = reconciler(&provider);

    let mut payload = callback("error", "job-1");
    payload["code"] = json!(501);
    payload["msg"] = json!("generation failed");
    let receipt = reconciler.on_callback(&payload).await.unwrap();

    assert!(receipt.applied);
    assert!(receipt.terminal);
    assert_eq!(receipt.provider_code, 501);
    assert_eq!(reconciler.stage("job-1"), Some(CallbackStage::Error));
}
