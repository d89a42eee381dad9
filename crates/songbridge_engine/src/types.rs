use std::fmt;

use thiserror::Error;

pub type JobId = String;

/// Provider's answer to a job-detail lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobDetail {
    pub success: bool,
    pub data: Option<JobDetailData>,
}

impl JobDetail {
    pub fn ok(data: JobDetailData) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }

    pub fn unsuccessful() -> Self {
        Self::default()
    }
}

/// Provider-shaped fields the link cache reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobDetailData {
    pub stream_audio_url: Option<String>,
    pub audio_url: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    MalformedResponse,
    /// The provider answered but refused the call.
    Rejected { code: i64 },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Rejected { code } => write!(f, "rejected by provider (code {code})"),
        }
    }
}
