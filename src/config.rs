use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::env;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Ring time for the first slot (seconds)
pub const PRIMARY_RING_TIME: u32 = 30;
/// Ring time for every later slot (seconds)
pub const FALLBACK_RING_TIME: u32 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    // PBX GraphQL API
    pub pbx_api_url: String,
    pub pbx_gql_url: String,
    pub pbx_client_id: String,
    pub pbx_client_secret: String,
    /// Space-separated OAuth scope string, passed through to the token grant
    pub pbx_scope: String,

    // Ring group slots, in on-call priority order
    pub ring_groups: Vec<String>,
    pub ring_times: Vec<u32>,
    pub pbx_cid: String,

    // Schedule source
    pub schedule_url: String,
    pub schedule_api_key: String,

    // Trigger
    pub cron_expression: String,
    pub timezone: String,

    // Operator alerting
    pub alert_email: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,

    // Advance the fingerprint even when some PBX calls failed.
    // Matches the historical behavior; set false to retry on the next cycle.
    pub advance_on_partial: bool,

    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ring_groups = parse_csv(&get("RING_GROUPS").context("RING_GROUPS not set")?);

        let ring_times = match get("RING_TIMES") {
            Some(raw) => {
                parse_ring_times(&raw).context("RING_TIMES must be comma-separated seconds")?
            }
            None => default_ring_times(ring_groups.len()),
        };

        Ok(Config {
            pbx_api_url: get("PBX_API_URL").context("PBX_API_URL not set")?,
            pbx_gql_url: get("PBX_GQL_URL").context("PBX_GQL_URL not set")?,
            pbx_client_id: get("PBX_CLIENT_ID").context("PBX_CLIENT_ID not set")?,
            pbx_client_secret: get("PBX_CLIENT_SECRET").context("PBX_CLIENT_SECRET not set")?,
            pbx_scope: get("PBX_SCOPE").context("PBX_SCOPE not set")?,

            ring_groups,
            ring_times,
            pbx_cid: get("PBX_CID").context("PBX_CID not set")?,

            schedule_url: get("SCHEDULE_URL").context("SCHEDULE_URL not set")?,
            schedule_api_key: get("SCHEDULE_API_KEY").context("SCHEDULE_API_KEY not set")?,

            cron_expression: get("CRON_EXPRESSION").context("CRON_EXPRESSION not set")?,
            timezone: get("TIMEZONE").unwrap_or_else(|| "UTC".to_string()),

            alert_email: get("ALERT_EMAIL").context("ALERT_EMAIL not set")?,
            smtp_host: get("SMTP_HOST").context("SMTP_HOST not set")?,
            smtp_port: get("SMTP_PORT")
                .unwrap_or_else(|| DEFAULT_SMTP_PORT.to_string())
                .parse()
                .context("SMTP_PORT must be a valid port number")?,
            smtp_user: get("SMTP_USER").context("SMTP_USER not set")?,
            smtp_pass: get("SMTP_PASS").context("SMTP_PASS not set")?,

            advance_on_partial: get("ADVANCE_ON_PARTIAL")
                .map(|s| s.trim().eq_ignore_ascii_case("true") || s.trim() == "1")
                .unwrap_or(true),

            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    /// Create config from a HashMap (convenience for testing)
    #[cfg(test)]
    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_getter(|key| map.get(key).map(|v| v.to_string()))
    }

    /// OAuth token endpoint, derived from the PBX API base URL
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.pbx_api_url.trim_end_matches('/'))
    }

    /// Validate configuration values at startup.
    /// Returns Ok(()) if all validations pass, or Err with details of what failed.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.ring_groups.is_empty() {
            errors.push("RING_GROUPS must list at least one ring group.".to_string());
        }

        if self.ring_times.len() != self.ring_groups.len() {
            errors.push(format!(
                "RING_TIMES has {} entries but RING_GROUPS has {}.",
                self.ring_times.len(),
                self.ring_groups.len()
            ));
        }

        if self.ring_times.iter().any(|&t| t == 0) {
            errors.push("RING_TIMES entries must be greater than 0.".to_string());
        }

        for (name, url) in [
            ("PBX_API_URL", &self.pbx_api_url),
            ("PBX_GQL_URL", &self.pbx_gql_url),
            ("SCHEDULE_URL", &self.schedule_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!("{} '{}' is not an http(s) URL.", name, url));
            }
        }

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(format!(
                "TIMEZONE '{}' is not a valid IANA timezone identifier.",
                self.timezone
            ));
        }

        if !Self::is_plausible_email(&self.alert_email) {
            errors.push(format!(
                "ALERT_EMAIL '{}' does not look like an email address.",
                self.alert_email
            ));
        }

        if self.http_timeout_secs == 0 {
            errors.push("HTTP_TIMEOUT_SECS must be greater than 0.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }

    fn is_plausible_email(addr: &str) -> bool {
        match addr.find('@') {
            Some(pos) => pos > 0 && pos < addr.len() - 1,
            None => false,
        }
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_ring_times(raw: &str) -> Result<Vec<u32>> {
    parse_csv(raw)
        .iter()
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("bad ring time '{}'", s))
        })
        .collect()
}

/// First slot rings longest; later slots get the shorter fallback window.
pub fn default_ring_times(slot_count: usize) -> Vec<u32> {
    (0..slot_count)
        .map(|i| if i == 0 { PRIMARY_RING_TIME } else { FALLBACK_RING_TIME })
        .collect()
}



/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Proves: the default ring-time policy always gives the first slot the
    /// long window and every later slot the short one.
    #[kani::proof]
    #[kani::unwind(9)]
    fn default_ring_times_policy_holds() {
        let count: usize = kani::any();
        kani::assume(count >= 1 && count <= 8);
        let times = default_ring_times(count);
        kani::assert(times[0] == PRIMARY_RING_TIME, "first slot rings longest");
        for t in times.iter().skip(1) {
            kani::assert(*t == FALLBACK_RING_TIME, "later slots use fallback time");
        }
    }
}
