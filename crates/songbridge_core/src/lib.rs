//! Songbridge core: payload schemas, the validation gateway, and audio-link
//! snapshots. Pure; no I/O.
mod callback;
mod config;
mod gateway;
mod issue;
mod links;
mod reader;
mod request;

pub use callback::{CallbackStage, CallbackTrack, ValidatedCallback, PROVIDER_OK};
pub use config::{
    ValidatedConfig, DEFAULT_BASE_URL, DEFAULT_LINK_CACHE_TTL_SECS, DEFAULT_REQUEST_TIMEOUT_MS,
    MAX_REQUEST_TIMEOUT_MS,
};
pub use gateway::{
    is_valid_callback, is_valid_config, is_valid_request, validate_callback, validate_config,
    validate_generation_request, CallbackHostAllowlist, Gateway, Refinement, Schema,
};
pub use issue::{FieldIssue, IssueCode, PayloadFamily, ValidationError};
pub use links::AudioLinks;
pub use request::{Model, ValidatedRequest, VocalGender, DESCRIPTION_PROMPT_LIMIT, TITLE_LIMIT};
