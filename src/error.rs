use chrono::Duration;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use crate::utils::format_duration;

/// Custom Error and Result types to unify errors from all sources.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Refresh on cooldown, {} remaining", remaining_label(.remaining))]
    Cooldown { remaining: Duration },

    #[error("A refresh is already in progress")]
    AlreadyInProgress,

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    ChannelSend(String),
}

fn remaining_label(remaining: &Duration) -> String {
    format_duration(*remaining)
}

impl CacheError {
    /// Whether a failed page request is worth a second attempt on the fallback
    /// transport. Payload and client-side errors would fail the same way twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Timeout(_) | CacheError::Transport(_) => true,
            CacheError::Http { status } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            CacheError::Timeout(error.to_string())
        } else if error.is_decode() {
            CacheError::MalformedResponse(error.to_string())
        } else {
            match error.status() {
                Some(status) => CacheError::Http {
                    status: status.as_u16(),
                },
                None => CacheError::Transport(error.to_string()),
            }
        }
    }
}

impl From<sled::Error> for CacheError {
    fn from(error: sled::Error) -> Self {
        CacheError::StorageUnavailable(error.to_string())
    }
}

// Only the storage layer encodes values as JSON, payload decoding maps its
// own errors to MalformedResponse.
impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        CacheError::StorageUnavailable(format!("encoding: {error}"))
    }
}

impl From<JobSchedulerError> for CacheError {
    fn from(error: JobSchedulerError) -> Self {
        CacheError::Scheduler(error.to_string())
    }
}

impl From<figment::Error> for CacheError {
    fn from(error: figment::Error) -> Self {
        CacheError::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(CacheError::Timeout("slow".into()).is_retryable());
        assert!(CacheError::Transport("reset".into()).is_retryable());
        assert!(CacheError::Http { status: 503 }.is_retryable());
        assert!(CacheError::Http { status: 429 }.is_retryable());
        assert!(!CacheError::Http { status: 404 }.is_retryable());
        assert!(!CacheError::MalformedResponse("{}".into()).is_retryable());
        assert!(!CacheError::StorageUnavailable("gone".into()).is_retryable());
    }

    #[test]
    fn cooldown_message_shows_remaining_time() {
        let error = CacheError::Cooldown {
            remaining: Duration::minutes(3 * 60 + 12),
        };
        assert_eq!(error.to_string(), "Refresh on cooldown, 3h 12m remaining");
    }
}
