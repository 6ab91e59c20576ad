//! Error taxonomy for index and resync runs.
//!
//! Source-hosting failures are typed so a failed run can record a
//! meaningful `error_message` on its connection; everything else travels
//! as [`anyhow::Error`] and is reported as an unexpected failure.

use thiserror::Error;

/// Failures talking to the source-hosting API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("GitHub rejected the access token (invalid, expired, or missing scope)")]
    Unauthorized,

    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<i64> },

    #[error("failed to fetch {path}: HTTP {status}")]
    Fetch { path: String, status: u16 },

    /// The contents API only inlines files up to 1 MB.
    #[error("{path} is too large to fetch through the contents API")]
    TooLarge { path: String, size: Option<u64> },

    #[error("invalid GitHub response for {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
}

fn reset_suffix(reset_at: &Option<i64>) -> String {
    (*reset_at)
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| format!(" (resets at {})", dt.format("%Y-%m-%dT%H:%M:%SZ")))
        .unwrap_or_default()
}

/// Reasons a run is refused before it starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("connection {0} not found")]
    ConnectionNotFound(String),

    #[error("connection {0} is already syncing")]
    AlreadySyncing(String),

    #[error("invalid repository name '{0}': expected owner/repo")]
    InvalidRepoName(String),
}

/// Classification of a fatal run error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    NotFound,
    RateLimited,
    Unexpected,
}

pub fn classify(err: &anyhow::Error) -> FailureKind {
    match err.chain().find_map(|e| e.downcast_ref::<SourceError>()) {
        Some(SourceError::Unauthorized) => FailureKind::Auth,
        Some(SourceError::NotFound(_)) => FailureKind::NotFound,
        Some(SourceError::RateLimited { .. }) => FailureKind::RateLimited,
        _ => FailureKind::Unexpected,
    }
}

/// Human-readable message stored on a connection whose run failed.
pub fn describe_failure(err: &anyhow::Error) -> String {
    let source = err.chain().find_map(|e| e.downcast_ref::<SourceError>());
    match (classify(err), source) {
        (FailureKind::Auth, _) => {
            "Authentication failed: the GitHub token is invalid or expired. Reconnect the repository."
                .to_string()
        }
        (FailureKind::NotFound, Some(e)) => {
            format!("Repository or branch not found ({}). Check the repository name and default branch.", e)
        }
        (FailureKind::RateLimited, Some(e)) => {
            format!("{}. Try again later.", capitalize(&e.to_string()))
        }
        _ => format!("Indexing failed: {:#}", err),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
