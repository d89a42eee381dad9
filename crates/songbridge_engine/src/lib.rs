//! Songbridge engine: provider client, audio-link cache, and callback
//! reconciliation.
mod cache;
mod provider;
mod reconcile;
mod types;

pub use cache::{AudioLinkCache, CacheSettings, Clock};
pub use provider::{HttpProviderClient, ProviderClient, ProviderSettings};
pub use reconcile::{CallbackReceipt, Reconciler};
pub use types::{FailureKind, JobDetail, JobDetailData, JobId, ProviderError};
