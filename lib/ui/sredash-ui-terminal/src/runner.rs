use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{Instrument, info, info_span, warn};

use sredash_adapter_http::ReqwestTransport;
use sredash_adapter_telemetry::{TelemetryConfig, TracedTransport};
use sredash_application::{Dashboard, ToggleTarget, default_config};
use sredash_domain::ConfigKey;
use sredash_ports::HttpTransport;

use crate::cli::{Cli, Command, forced_state};
use crate::render::summary_lines;

/// Entry point of the `dashboard` binary.
///
/// Telemetry is installed before any backend call so the first load is
/// traced.
pub async fn run(cli: Cli) -> Result<()> {
    dotenv::dotenv().ok();
    let config = default_config(cli.flag_source());
    let telemetry = sredash_adapter_telemetry::install(&TelemetryConfig::resolve(&config))
        .context("failed to install telemetry")?;

    let api_url = config
        .resolve(ConfigKey::ApiUrl)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    info!(sources = ?config.source_names(), %api_url, "configuration resolved");

    let transport = ReqwestTransport::new(api_url.clone())
        .with_context(|| format!("invalid backend url {api_url}"))?;
    let mut dashboard = Dashboard::new(TracedTransport::new(transport));

    dashboard
        .refresh_all()
        .instrument(info_span!("dashboard.load"))
        .await;

    let command = cli.command();
    let outcome = match command {
        Command::Watch { interval } => watch(&mut dashboard, Duration::from_secs(interval.max(1))).await,
        other => {
            for line in execute(&mut dashboard, &other).await? {
                println!("{line}");
            }
            Ok(())
        }
    };

    telemetry.force_flush();
    outcome
}

/// Run a one-shot command against an already loaded dashboard and return
/// the lines to print.
pub async fn execute<T: HttpTransport>(
    dashboard: &mut Dashboard<T>,
    command: &Command,
) -> Result<Vec<String>> {
    let span = info_span!("dashboard.command", command = command.name());
    dispatch(dashboard, command).instrument(span).await
}

async fn dispatch<T: HttpTransport>(
    dashboard: &mut Dashboard<T>,
    command: &Command,
) -> Result<Vec<String>> {
    match command {
        Command::Watch { .. } | Command::Snapshot { json: false } => {}
        Command::Snapshot { json: true } => {
            let json = serde_json::to_string_pretty(dashboard.snapshot())
                .context("failed to encode snapshot")?;
            return Ok(vec![json]);
        }
        Command::ToggleReady { enable, disable } => {
            toggle(dashboard, ToggleTarget::Ready, forced_state(*enable, *disable)).await;
        }
        Command::ToggleLive { enable, disable } => {
            toggle(dashboard, ToggleTarget::Live, forced_state(*enable, *disable)).await;
        }
        Command::Panic => {
            dashboard.trigger_panic().await;
            dashboard.fetch_health().await;
        }
    }
    Ok(summary_lines(dashboard.snapshot()))
}

async fn toggle<T: HttpTransport>(
    dashboard: &mut Dashboard<T>,
    target: ToggleTarget,
    forced: Option<bool>,
) {
    let enable = forced.unwrap_or_else(|| !target.current(&dashboard.health()));
    info!(%target, enable, "toggling");
    dashboard.toggle(target, enable).await;
}

async fn watch<T: HttpTransport>(dashboard: &mut Dashboard<T>, every: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately and the initial load already ran.
    ticker.tick().await;
    print_summary(dashboard);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                dashboard.refresh_all().await;
                print_summary(dashboard);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                info!("stopping");
                return Ok(());
            }
        }
    }
}

fn print_summary<T: HttpTransport>(dashboard: &Dashboard<T>) {
    println!("---");
    for line in summary_lines(dashboard.snapshot()) {
        println!("{line}");
    }
}
