use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use songbridge_core::{AudioLinks, CallbackStage, Gateway, ValidationError};
use songbridge_logging::{bridge_debug, bridge_info, bridge_warn};

use crate::{AudioLinkCache, JobId};

/// What the reconciler did with one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackReceipt {
    pub job_id: JobId,
    pub stage: CallbackStage,
    /// False when the callback arrived out of order and was only acknowledged.
    pub applied: bool,
    pub terminal: bool,
    pub provider_code: i64,
    pub track_count: usize,
}

/// Drives job state from provider callbacks and polling, keeping the link
/// cache honest.
///
/// One stage is remembered per job seen until [`Reconciler::forget`] drops it.
#[derive(Clone)]
pub struct Reconciler {
    gateway: Gateway,
    cache: AudioLinkCache,
    stages: Arc<Mutex<HashMap<JobId, CallbackStage>>>,
}

impl Reconciler {
    pub fn new(gateway: Gateway, cache: AudioLinkCache) -> Self {
        Self {
            gateway,
            cache,
            stages: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Validates a raw callback and, when it moves the job forward, drops the
    /// job's cached links so the next read sees the new state.
    ///
    /// Stages only advance (`text`, `first`, `complete`); once a job is
    /// `complete` or `error`, later callbacks are acknowledged but ignored.
    pub async fn on_callback(&self, payload: &Value) -> Result<CallbackReceipt, ValidationError> {
        let callback = self.gateway.validate_callback(payload).await?;

        let applied = {
            let mut stages = self.lock_stages();
            let advance = match stages.get(&callback.task_id) {
                Some(previous) if previous.is_terminal() => false,
                Some(previous) => callback.stage >= *previous,
                None => true,
            };
            if advance {
                stages.insert(callback.task_id.clone(), callback.stage);
            }
            advance
        };

        if !callback.is_success() {
            bridge_warn!(
                "Provider reported code {} for job {}: {}",
                callback.code,
                callback.task_id,
                callback.msg
            );
        }

        if applied {
            self.cache.invalidate(Some(&callback.task_id));
            bridge_info!(
                "Job {} reached stage {:?} (code {}, {} tracks)",
                callback.task_id,
                callback.stage,
                callback.code,
                callback.tracks.len()
            );
        } else {
            bridge_debug!(
                "Ignoring out-of-order {:?} callback for job {}",
                callback.stage,
                callback.task_id
            );
        }

        Ok(CallbackReceipt {
            stage: callback.stage,
            applied,
            terminal: callback.stage.is_terminal(),
            provider_code: callback.code,
            track_count: callback.tracks.len(),
            job_id: callback.task_id,
        })
    }

    /// Polling path: forgets what the cache holds for the job and asks the
    /// provider again.
    pub async fn refresh(&self, job_id: &str) -> Option<Arc<AudioLinks>> {
        self.cache.invalidate(Some(job_id));
        self.cache.resolve(Some(job_id)).await
    }

    /// Last stage applied for the job, if any callback was seen.
    pub fn stage(&self, job_id: &str) -> Option<CallbackStage> {
        self.lock_stages().get(job_id).copied()
    }

    /// Drops the job's recorded stage and cached links. A later callback for
    /// the job starts from scratch.
    pub fn forget(&self, job_id: &str) {
        self.lock_stages().remove(job_id);
        self.cache.invalidate(Some(job_id));
    }

    pub fn cache(&self) -> &AudioLinkCache {
        &self.cache
    }

    fn lock_stages(&self) -> MutexGuard<'_, HashMap<JobId, CallbackStage>> {
        self.stages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
