use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Payload families the gateway knows how to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFamily {
    GenerationRequest,
    Callback,
    Config,
}

impl fmt::Display for PayloadFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadFamily::GenerationRequest => write!(f, "generation request"),
            PayloadFamily::Callback => write!(f, "callback"),
            PayloadFamily::Config => write!(f, "config"),
        }
    }
}

/// Machine-readable reason attached to a [`FieldIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    Required,
    InvalidType,
    InvalidValue,
    Empty,
    TooLong,
    OutOfRange,
    InvalidUrl,
    Rejected,
}

/// One problem found in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dotted path to the field, e.g. `data.data[0].id`. `$` is the payload root.
    pub path: String,
    pub code: IssueCode,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A payload was rejected. Always carries at least one issue.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("invalid {family} payload: {}", summarize(.issues))]
pub struct ValidationError {
    pub family: PayloadFamily,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(family: PayloadFamily, issues: Vec<FieldIssue>) -> Self {
        Self { family, issues }
    }

    /// Returns the first issue reported for `path`, if any.
    pub fn issue_at(&self, path: &str) -> Option<&FieldIssue> {
        self.issues.iter().find(|issue| issue.path == path)
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
