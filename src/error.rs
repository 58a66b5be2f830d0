//! Failure taxonomy for a reconciliation cycle.
//!
//! Every error a cycle can hit is classified here so the reconciler can
//! decide uniformly which failures page the operator and which are
//! log-only. No variant ever terminates the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Non-2xx HTTP response from the schedule source
    #[error("schedule fetch failed: {status}\nSchedule URL: {url}")]
    Http { status: reqwest::StatusCode, url: String },

    /// Network-level failure (connect, timeout, TLS, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// OAuth client-credentials grant was rejected or unreachable
    #[error("access token error: {0}")]
    Auth(String),

    /// The schedule source answered 2xx but reported an application error
    #[error("schedule API error: {0}")]
    RemoteRejected(String),

    /// 2xx response whose body is missing the expected fields
    #[error("schedule response malformed: {0}")]
    Malformed(String),

    /// Schedule recipients do not line up with the configured slots
    #[error("schedule has {got} recipients but {expected} ring groups are configured")]
    RecipientCount { got: usize, expected: usize },
}

impl SyncError {
    /// Whether this failure should reach the operator by email.
    ///
    /// The schedule source's own application error path is deliberately
    /// log-only; everything else escalates.
    pub fn should_notify(&self) -> bool {
        !matches!(self, SyncError::RemoteRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_carries_status_and_url() {
        let err = SyncError::Http {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            url: "https://schedule.example.com/api/oncall".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"), "message should carry the status: {}", msg);
        assert!(
            msg.contains("https://schedule.example.com/api/oncall"),
            "message should carry the URL: {}",
            msg
        );
    }

    #[test]
    fn test_remote_rejected_is_log_only() {
        let err = SyncError::RemoteRejected("no schedule published".to_string());
        assert!(!err.should_notify());
    }

    #[test]
    fn test_other_failures_notify() {
        let errs = [
            SyncError::Http {
                status: reqwest::StatusCode::BAD_GATEWAY,
                url: "https://x".to_string(),
            },
            SyncError::Auth("invalid_client".to_string()),
            SyncError::Malformed("missing hash".to_string()),
            SyncError::RecipientCount { got: 2, expected: 3 },
        ];
        for err in errs {
            assert!(err.should_notify(), "{} should notify", err);
        }
    }

    #[test]
    fn test_recipient_count_message() {
        let err = SyncError::RecipientCount { got: 1, expected: 3 };
        let msg = err.to_string();
        assert!(msg.contains('1') && msg.contains('3'), "{}", msg);
    }
}
