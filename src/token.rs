//! OAuth2 client-credentials token provider for the PBX API.
//!
//! A fresh token is requested for every update cycle; nothing is cached
//! across cycles and there is no retry or backoff. A failed grant is an
//! explicit `SyncError::Auth` that callers must treat as "cannot proceed".

use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::SyncError;

const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// A bearer token for the PBX GraphQL API, valid until `expiry`
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expiry: Instant,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expiry
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

pub struct TokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    /// Space-separated scope string, sent as-is in the grant
    scope: String,
}

impl TokenProvider {
    pub fn new(
        client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            scope,
        }
    }

    /// Execute the client-credentials grant and return a bearer token.
    pub async fn fetch_token(&self) -> Result<AccessToken, SyncError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| SyncError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!(
                "token endpoint answered {}: {}",
                status,
                detail.trim()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("token response unreadable: {}", e)))?;

        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Auth("grant succeeded but no access_token in response".to_string()))?;

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        debug!(expires_in = lifetime, "access token obtained");

        Ok(AccessToken {
            value,
            expiry: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_full() {
        let json = r#"{"access_token":"tok123","token_type":"Bearer","expires_in":7200}"#;
        let body: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.access_token.as_deref(), Some("tok123"));
        assert_eq!(body.expires_in, Some(7200));
    }

    #[test]
    fn test_token_response_minimal() {
        let json = r#"{"access_token":"tok123"}"#;
        let body: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.access_token.as_deref(), Some("tok123"));
        assert_eq!(body.expires_in, None);
    }

    #[test]
    fn test_token_response_missing_token() {
        let json = r#"{"error":"invalid_client"}"#;
        let body: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(body.access_token.is_none());
    }

    #[test]
    fn test_fresh_token_not_expired() {
        let token = AccessToken {
            value: "tok".to_string(),
            expiry: Instant::now() + Duration::from_secs(60),
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let token = AccessToken {
            value: "tok".to_string(),
            expiry: Instant::now() - Duration::from_secs(1),
        };
        assert!(token.is_expired());
    }
}
