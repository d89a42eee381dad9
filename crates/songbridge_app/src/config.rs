//! Provider configuration loading for the command-line host.
//!
//! The file is plain JSON in the provider-configuration shape. The API key may
//! come from `SONGBRIDGE_API_KEY` instead, which wins when set.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use songbridge_core::{validate_config, ValidatedConfig};
use songbridge_logging::bridge_info;

pub const API_KEY_ENV: &str = "SONGBRIDGE_API_KEY";

pub async fn load_config(path: &Path) -> Result<ValidatedConfig> {
    let payload = read_json(path)?;
    let payload = apply_env_override(payload, std::env::var(API_KEY_ENV).ok());
    let config = validate_config(&payload)
        .await
        .with_context(|| format!("invalid provider configuration in {}", path.display()))?;
    bridge_info!("Loaded provider configuration from {:?}: {:?}", path, config);
    Ok(config)
}

pub fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Replaces `apiKey` with a non-empty override. Non-object payloads are left
/// for validation to reject.
fn apply_env_override(mut payload: Value, api_key: Option<String>) -> Value {
    if let (Some(key), Some(obj)) = (api_key.filter(|k| !k.trim().is_empty()), payload.as_object_mut()) {
        obj.insert("apiKey".to_string(), Value::String(key));
    }
    payload
}
