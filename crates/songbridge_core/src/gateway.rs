//! Validation gateway: the only way a raw payload becomes a typed record.
//!
//! Each family has one canonical [`Schema::parse`]. The async `validate_*`
//! entry points run it and then any registered [`Refinement`]s; the
//! `is_valid_*` variants run it alone and keep only the verdict.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::callback::ValidatedCallback;
use crate::config::ValidatedConfig;
use crate::issue::{FieldIssue, IssueCode, PayloadFamily, ValidationError};
use crate::request::ValidatedRequest;

/// Shape check for one payload family. Unknown fields are ignored.
pub trait Schema: Sized + Send + Sync {
    const FAMILY: PayloadFamily;

    fn parse(payload: &Value) -> Result<Self, ValidationError>;
}

/// Extra check that runs after the shape check succeeded and may suspend,
/// e.g. to consult an external registry.
#[async_trait]
pub trait Refinement<T>: Send + Sync {
    /// Returns the issues found; empty means the record passes.
    async fn refine(&self, record: &T) -> Vec<FieldIssue>;
}

type Rules<T> = Vec<Arc<dyn Refinement<T>>>;

#[derive(Default, Clone)]
pub struct Gateway {
    request_rules: Rules<ValidatedRequest>,
    callback_rules: Rules<ValidatedCallback>,
    config_rules: Rules<ValidatedConfig>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_rule(mut self, rule: impl Refinement<ValidatedRequest> + 'static) -> Self {
        self.request_rules.push(Arc::new(rule));
        self
    }

    pub fn with_callback_rule(mut self, rule: impl Refinement<ValidatedCallback> + 'static) -> Self {
        self.callback_rules.push(Arc::new(rule));
        self
    }

    pub fn with_config_rule(mut self, rule: impl Refinement<ValidatedConfig> + 'static) -> Self {
        self.config_rules.push(Arc::new(rule));
        self
    }

    pub async fn validate_generation_request(
        &self,
        payload: &Value,
    ) -> Result<ValidatedRequest, ValidationError> {
        validate_with(payload, &self.request_rules).await
    }

    pub async fn validate_callback(&self, payload: &Value) -> Result<ValidatedCallback, ValidationError> {
        validate_with(payload, &self.callback_rules).await
    }

    pub async fn validate_config(&self, payload: &Value) -> Result<ValidatedConfig, ValidationError> {
        validate_with(payload, &self.config_rules).await
    }

    /// Shape check only; refinements need a suspending context.
    pub fn is_valid_request(&self, payload: &Value) -> bool {
        is_valid_request(payload)
    }

    pub fn is_valid_callback(&self, payload: &Value) -> bool {
        is_valid_callback(payload)
    }

    pub fn is_valid_config(&self, payload: &Value) -> bool {
        is_valid_config(payload)
    }
}

async fn validate_with<T: Schema + 'static>(
    payload: &Value,
    rules: &[Arc<dyn Refinement<T>>],
) -> Result<T, ValidationError> {
    let record = T::parse(payload)?;
    let mut issues = Vec::new();
    for rule in rules {
        issues.extend(rule.refine(&record).await);
    }
    if issues.is_empty() {
        Ok(record)
    } else {
        Err(ValidationError::new(T::FAMILY, issues))
    }
}

pub async fn validate_generation_request(payload: &Value) -> Result<ValidatedRequest, ValidationError> {
    validate_with(payload, &[]).await
}

pub async fn validate_callback(payload: &Value) -> Result<ValidatedCallback, ValidationError> {
    validate_with(payload, &[]).await
}

pub async fn validate_config(payload: &Value) -> Result<ValidatedConfig, ValidationError> {
    validate_with(payload, &[]).await
}

pub fn is_valid_request(payload: &Value) -> bool {
    ValidatedRequest::parse(payload).is_ok()
}

pub fn is_valid_callback(payload: &Value) -> bool {
    ValidatedCallback::parse(payload).is_ok()
}

pub fn is_valid_config(payload: &Value) -> bool {
    ValidatedConfig::parse(payload).is_ok()
}

/// Rejects generation requests whose callback URL points at a host outside
/// the allowlist. Host comparison ignores ASCII case.
#[derive(Debug, Clone)]
pub struct CallbackHostAllowlist {
    hosts: Vec<String>,
}

impl CallbackHostAllowlist {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Allowlist holding just the host of `url`, or `None` when it has none.
    pub fn from_url(url: &str) -> Option<Self> {
        let host = Url::parse(url).ok()?.host_str()?.to_string();
        Some(Self::new([host]))
    }

    fn allows(&self, host: &str) -> bool {
        self.hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}

#[async_trait]
impl Refinement<ValidatedRequest> for CallbackHostAllowlist {
    async fn refine(&self, record: &ValidatedRequest) -> Vec<FieldIssue> {
        let host = Url::parse(&record.callback_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        match host {
            Some(host) if self.allows(&host) => Vec::new(),
            Some(host) => vec![FieldIssue::new(
                "callBackUrl",
                IssueCode::Rejected,
                format!("callback host {host:?} is not allowed"),
            )],
            None => vec![FieldIssue::new(
                "callBackUrl",
                IssueCode::InvalidUrl,
                "callback url has no host",
            )],
        }
    }
}
