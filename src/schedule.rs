//! Schedule source client
//!
//! Fetches the desired on-call schedule: an opaque fingerprint plus the
//! ordered list of recipients, one per ring-group slot.

use serde::Deserialize;
use tracing::debug;

use crate::error::SyncError;

/// One dial target from the schedule, in slot order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recipient {
    pub number: String,
}

/// An immutable snapshot of the desired schedule.
/// Compared by fingerprint equality only; contents are never diffed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub fingerprint: String,
    pub recipients: Vec<Recipient>,
}

/// Wire shape of the schedule endpoint. A 2xx response either carries
/// `hash` + `recipients` or an application-level `error`.
#[derive(Debug, Deserialize)]
struct ScheduleBody {
    hash: Option<String>,
    #[serde(default)]
    recipients: Vec<Recipient>,
    error: Option<String>,
}

pub struct ScheduleSource {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl ScheduleSource {
    pub fn new(client: reqwest::Client, url: String, api_key: String) -> Self {
        Self { client, url, api_key }
    }

    /// Fetch the current desired schedule.
    ///
    /// Non-2xx status maps to `SyncError::Http` with the status and URL.
    /// A 2xx body carrying an `error` field maps to `RemoteRejected`.
    pub async fn fetch(&self) -> Result<Schedule, SyncError> {
        let response = self
            .client
            .get(&self.url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Http {
                status,
                url: self.url.clone(),
            });
        }

        let body: ScheduleBody = response.json().await?;

        if let Some(error) = body.error {
            return Err(SyncError::RemoteRejected(error));
        }

        let fingerprint = body
            .hash
            .ok_or_else(|| SyncError::Malformed("response has no hash field".to_string()))?;

        debug!(
            fingerprint = %fingerprint,
            recipients = body.recipients.len(),
            "schedule fetched"
        );

        Ok(Schedule {
            fingerprint,
            recipients: body.recipients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_with_hash_and_recipients() {
        let json = r#"{"hash":"h1","recipients":[{"number":"100"},{"number":"101"}]}"#;
        let body: ScheduleBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.hash.as_deref(), Some("h1"));
        assert_eq!(body.recipients.len(), 2);
        assert_eq!(body.recipients[0].number, "100");
        assert!(body.error.is_none());
    }

    #[test]
    fn test_body_with_error_field() {
        let json = r#"{"error":"no schedule published"}"#;
        let body: ScheduleBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.error.as_deref(), Some("no schedule published"));
        assert!(body.hash.is_none());
        assert!(body.recipients.is_empty());
    }

    #[test]
    fn test_body_extra_fields_ignored() {
        let json = r#"{"hash":"h2","recipients":[],"generated_at":"2026-08-28T00:00:00Z"}"#;
        let body: ScheduleBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.hash.as_deref(), Some("h2"));
    }

    #[test]
    fn test_schedule_compared_by_value() {
        let a = Schedule {
            fingerprint: "h1".to_string(),
            recipients: vec![Recipient { number: "100".to_string() }],
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
