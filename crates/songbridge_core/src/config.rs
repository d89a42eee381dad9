use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::gateway::Schema;
use crate::issue::{PayloadFamily, ValidationError};
use crate::reader::{FieldReader, ROOT};
use crate::request::Model;

pub const DEFAULT_BASE_URL: &str = "https://api.sunoapi.org";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_LINK_CACHE_TTL_SECS: u64 = 300;

/// Provider configuration with defaults applied.
#[derive(Clone, PartialEq)]
pub struct ValidatedConfig {
    pub api_key: String,
    /// Without a trailing slash.
    pub base_url: String,
    pub callback_url: Option<String>,
    pub default_model: Model,
    pub request_timeout: Duration,
    pub link_cache_ttl: Duration,
    pub link_cache_max_entries: Option<usize>,
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("callback_url", &self.callback_url)
            .field("default_model", &self.default_model.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("link_cache_ttl", &self.link_cache_ttl)
            .field("link_cache_max_entries", &self.link_cache_max_entries)
            .finish()
    }
}

impl Schema for ValidatedConfig {
    const FAMILY: PayloadFamily = PayloadFamily::Config;

    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::FAMILY);
        let Some(obj) = reader.root(payload) else {
            return reader.finish(placeholder());
        };

        let api_key = reader.required_text(obj, ROOT, "apiKey");

        let base_url = reader.optional_str(obj, ROOT, "baseUrl");
        reader.http_url("baseUrl", base_url.as_deref());
        let base_url = base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let callback_url = reader.optional_str(obj, ROOT, "callbackUrl");
        reader.http_url("callbackUrl", callback_url.as_deref());

        let raw_model = reader.optional_str(obj, ROOT, "defaultModel");
        let default_model = reader
            .one_of("defaultModel", raw_model, Model::NAMES, Model::parse)
            .unwrap_or_default();

        let timeout_ms = reader.optional_u64(obj, ROOT, "requestTimeoutMs");
        reader.within("requestTimeoutMs", timeout_ms, 1, MAX_REQUEST_TIMEOUT_MS);

        let ttl_secs = reader.optional_u64(obj, ROOT, "linkCacheTtlSecs");
        reader.within("linkCacheTtlSecs", ttl_secs, 1, u64::MAX);

        let max_entries = reader.optional_u64(obj, ROOT, "linkCacheMaxEntries");
        reader.within("linkCacheMaxEntries", max_entries, 1, u32::MAX as u64);

        reader.finish(ValidatedConfig {
            api_key,
            base_url,
            callback_url,
            default_model,
            request_timeout: Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS)),
            link_cache_ttl: Duration::from_secs(ttl_secs.unwrap_or(DEFAULT_LINK_CACHE_TTL_SECS)),
            link_cache_max_entries: max_entries.map(|n| n as usize),
        })
    }
}

fn placeholder() -> ValidatedConfig {
    ValidatedConfig {
        api_key: String::new(),
        base_url: DEFAULT_BASE_URL.to_string(),
        callback_url: None,
        default_model: Model::default(),
        request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        link_cache_ttl: Duration::from_secs(DEFAULT_LINK_CACHE_TTL_SECS),
        link_cache_max_entries: None,
    }
}
