//! Operator alerting over SMTP
//!
//! One email per failure, best-effort: a send failure is logged and never
//! escalated further, so the notifier can never trigger itself.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use tracing::{error, info};

use crate::config::Config;

pub const ALERT_SUBJECT: &str = "Ring group sync error notification";
pub const ALERT_SENDER: &str = "Ring Group Sync <noreply@ringsync.invalid>";

/// Standard implicit-TLS submission port
pub const SMTPS_PORT: u16 = 465;

/// Implicit TLS on 465, STARTTLS on everything else
pub fn uses_implicit_tls(port: u16) -> bool {
    port == SMTPS_PORT
}

/// Plain-text alert body embedding the failure detail and a timestamp
pub fn format_alert_body(message: &str, now: DateTime<Utc>) -> String {
    format!(
        "An error occurred: {}\n\nCurrent time: {}",
        message,
        now.to_rfc2822()
    )
}

/// Seam for delivering operator alerts. The reconciler only depends on
/// this, so tests can swap in a recording implementation.
pub trait Alerter: Send + Sync {
    /// Deliver `message` best-effort; implementations swallow their own
    /// delivery failures.
    fn notify(&self, message: &str) -> impl Future<Output = ()> + Send;
}

pub struct Notifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl Notifier {
    pub fn new(config: &Config) -> Result<Self> {
        let builder = if uses_implicit_tls(config.smtp_port) {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .context("SMTP relay setup failed")?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: ALERT_SENDER
                .parse()
                .context("alert sender address invalid")?,
            to: config
                .alert_email
                .parse()
                .with_context(|| format!("ALERT_EMAIL '{}' is not a mailbox", config.alert_email))?,
        })
    }

    async fn send_alert(&self, message: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(ALERT_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(format_alert_body(message, Utc::now()))
            .context("failed to build alert email")?;

        self.transport
            .send(email)
            .await
            .context("SMTP send failed")?;

        info!("error email sent: {}", message);
        Ok(())
    }
}

impl Alerter for Notifier {
    async fn notify(&self, message: &str) {
        if let Err(e) = self.send_alert(message).await {
            error!("failed to send alert email: {:#}", e);
            // Log the original message so it's not lost
            error!("original alert: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn test_config(port: &str) -> Config {
        let mut m = HashMap::new();
        m.insert("PBX_API_URL", "https://pbx.example.com/admin/api/api");
        m.insert("PBX_GQL_URL", "https://pbx.example.com/admin/api/api/gql");
        m.insert("PBX_CLIENT_ID", "client123");
        m.insert("PBX_CLIENT_SECRET", "secret456");
        m.insert("PBX_SCOPE", "gql");
        m.insert("RING_GROUPS", "600,601,602");
        m.insert("PBX_CID", "5551230000");
        m.insert("SCHEDULE_URL", "https://schedule.example.com/api/oncall");
        m.insert("SCHEDULE_API_KEY", "key789");
        m.insert("CRON_EXPRESSION", "*/5 * * * *");
        m.insert("ALERT_EMAIL", "ops@example.com");
        m.insert("SMTP_HOST", "smtp.example.com");
        m.insert("SMTP_PORT", port);
        m.insert("SMTP_USER", "mailer");
        m.insert("SMTP_PASS", "mailpass");
        Config::from_map(&m).expect("test config should parse")
    }

    #[test]
    fn test_tls_mode_by_port() {
        assert!(uses_implicit_tls(465));
        assert!(!uses_implicit_tls(587));
        assert!(!uses_implicit_tls(25));
        assert!(!uses_implicit_tls(2525));
    }

    #[test]
    fn test_alert_body_embeds_message_and_time() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        let body = format_alert_body("schedule fetch failed: 500", now);
        assert!(body.starts_with("An error occurred: schedule fetch failed: 500"));
        assert!(body.contains("Current time:"));
        assert!(body.contains("2026"));
    }

    #[test]
    fn test_sender_address_parses() {
        let mailbox: Result<Mailbox, _> = ALERT_SENDER.parse();
        assert!(mailbox.is_ok());
    }

    #[tokio::test]
    async fn test_notifier_builds_for_both_tls_modes() {
        for port in ["465", "587"] {
            let config = test_config(port);
            assert!(Notifier::new(&config).is_ok(), "port {} should build", port);
        }
    }

    #[tokio::test]
    async fn test_notifier_rejects_bad_alert_address() {
        let mut config = test_config("587");
        config.alert_email = "not a mailbox".to_string();
        assert!(Notifier::new(&config).is_err());
    }
}
