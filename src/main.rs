mod cli;
mod config;
mod error;
mod notify;
mod pbx;
mod reconciler;
mod redact;
mod schedule;
mod scheduler;
mod token;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use config::Config;
use notify::Notifier;
use pbx::PbxUpdater;
use reconciler::Reconciler;
use schedule::ScheduleSource;
use token::TokenProvider;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    if args.help {
        cli::print_help();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ringsync=info".parse().unwrap()),
        )
        .init();

    info!("ringsync v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Schedule URL: {}", config.schedule_url);
    info!("  Schedule API key: {}", redact::secret(&config.schedule_api_key));
    info!("  PBX GraphQL URL: {}", config.pbx_gql_url);
    info!("  Ring groups: {:?}", config.ring_groups);
    info!("  Ring times: {:?}", config.ring_times);
    info!("  Fixed caller ID: {}", redact::dial_target(&config.pbx_cid));
    info!("  Trigger: '{}' ({})", config.cron_expression, config.timezone);
    info!("  Alert email: {}", redact::email(&config.alert_email));

    // Handle --validate mode
    if args.validate {
        info!("Validating configuration...");
        match config.validate() {
            Ok(()) => {
                info!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    // One HTTP client, explicit timeout, shared across all components
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let source = ScheduleSource::new(
        client.clone(),
        config.schedule_url.clone(),
        config.schedule_api_key.clone(),
    );
    let tokens = TokenProvider::new(
        client.clone(),
        config.token_endpoint(),
        config.pbx_client_id.clone(),
        config.pbx_client_secret.clone(),
        config.pbx_scope.clone(),
    );
    let updater = PbxUpdater::from_config(client, &config);
    let notifier = Notifier::new(&config)?;

    let reconciler = Arc::new(Reconciler::new(
        source,
        tokens,
        updater,
        notifier,
        config.advance_on_partial,
    ));

    // First cycle runs immediately, before the trigger takes over
    reconciler.run().await;

    if args.once {
        info!("Single cycle complete (--once mode)");
        return Ok(());
    }

    let job_reconciler = reconciler.clone();
    let mut sched = scheduler::start(&config.cron_expression, &config.timezone, move || {
        let reconciler = job_reconciler.clone();
        async move {
            reconciler.run().await;
        }
    })
    .await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    sched
        .shutdown()
        .await
        .map_err(|e| anyhow::anyhow!("scheduler shutdown failed: {}", e))?;

    Ok(())
}
