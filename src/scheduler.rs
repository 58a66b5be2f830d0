//! Cron trigger for reconciliation cycles
//!
//! Thin wrapper over tokio-cron-scheduler: parses the configured timezone,
//! normalizes classic 5-field cron expressions to the 6-field form the
//! scheduler expects, and wires the cycle closure into a repeating job.

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::future::Future;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/// tokio-cron-scheduler expressions carry a leading seconds field.
/// Classic 5-field crontab expressions get one prepended (fire at :00);
/// 6- and 7-field expressions pass through untouched.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("invalid timezone '{}': {}", name, e))
}

/// Start the periodic trigger. `cycle_fn` is invoked once per cron firing;
/// overlapping-run protection is the reconciler's job, not the trigger's.
pub async fn start<F, Fut>(cron_expression: &str, timezone: &str, cycle_fn: F) -> Result<JobScheduler>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let tz = parse_timezone(timezone)?;
    let expr = normalize_cron(cron_expression);

    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("failed to create job scheduler: {}", e))?;

    let job = Job::new_async_tz(expr.as_str(), tz, move |_id, _scheduler| {
        Box::pin(cycle_fn())
    })
    .map_err(|e| anyhow!("invalid cron expression '{}': {}", expr, e))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("failed to add reconciliation job: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("failed to start scheduler: {}", e))?;

    info!(cron = %expr, timezone = %tz, "scheduler started");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_5_field() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron("0 8 * * 1"), "0 0 8 * * 1");
    }

    #[test]
    fn test_normalize_6_field_passthrough() {
        assert_eq!(normalize_cron("30 */5 * * * *"), "30 */5 * * * *");
    }

    #[test]
    fn test_normalize_7_field_passthrough() {
        assert_eq!(normalize_cron("0 0 8 * * 1 2026"), "0 0 8 * * 1 2026");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_cron("  */5 * * * *  "), "0 */5 * * * *");
    }

    #[test]
    fn test_parse_timezone_valid() {
        assert!(parse_timezone("America/New_York").is_ok());
        assert!(parse_timezone("UTC").is_ok());
        assert!(parse_timezone("Europe/Berlin").is_ok());
    }

    #[test]
    fn test_parse_timezone_invalid() {
        let result = parse_timezone("Not/A_Zone");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Not/A_Zone"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Normalization never panics
        #[test]
        fn normalize_never_panics(expr in ".*") {
            let _ = normalize_cron(&expr);
        }

        /// A 5-field expression always becomes a 6-field one firing at :00
        #[test]
        fn five_fields_become_six(expr in "([0-9*]{1,3} ){4}[0-9*]{1,3}") {
            let normalized = normalize_cron(&expr);
            prop_assert_eq!(normalized.split_whitespace().count(), 6);
            prop_assert!(normalized.starts_with("0 "));
        }

        /// Timezone parsing never panics
        #[test]
        fn timezone_parse_never_panics(name in ".*") {
            let _ = parse_timezone(&name);
        }
    }
}
