use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use coldstart_bench::config::{BenchMode, Config};
use coldstart_bench::engine::RetryPolicy;
use coldstart_bench::invocation::ActionSpec;
use coldstart_bench::{
    BenchmarkContext, ErrorSignal, InvocationService, InvocationTask, RequestPayload,
    SweepOrchestrator, WhiskClient,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Exit code for a run that finished but saw task failures
const EXIT_ABORTED: u8 = 2;

/// Install the Prometheus recorder and its scrape endpoint
fn setup_prometheus_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}

fn action_spec(config: &Config) -> ActionSpec {
    ActionSpec {
        name: config.action.name.clone(),
        kind: config.action.kind.clone(),
        image: config.action.image.clone(),
        concurrency: config.action.concurrency,
        timeout_ms: config.action.timeout_ms,
    }
}

/// Run the configured mode, returning whether it finished cleanly
async fn run_mode(
    config: &Config,
    orchestrator: &mut SweepOrchestrator,
) -> anyhow::Result<bool> {
    match config.mode {
        BenchMode::Burst => {
            let report = orchestrator
                .burst_until_clean(config.burst.size, config.burst.max_attempts)
                .await?;
            info!(
                "Burst finished after {} attempt(s), clean={}",
                report.attempts.len(),
                report.clean
            );
            Ok(report.clean)
        }
        BenchMode::RateSweep => {
            let sweep = &config.rate_sweep;
            let report = orchestrator
                .rate_sweep(
                    sweep.start_rate,
                    sweep.end_rate,
                    sweep.step,
                    sweep.duration,
                    sweep.warmup_step,
                )
                .await?;
            info!(
                "Rate sweep {:?}: {} steps, {} dispatched, {} failed",
                report.state,
                report.steps.len(),
                report.total_dispatched(),
                report.total_failures()
            );
            info!("JSON: {}", report.to_json());
            Ok(!report.aborted())
        }
        BenchMode::Provisioned => {
            let prov = &config.provisioned;
            let report = orchestrator
                .provisioned_sweep(prov.max_provisioned, prov.cooldown, prov.repetitions)
                .await?;
            info!(
                "Provisioned sweep {:?}: {} levels, {} dispatched, {} failed",
                report.state,
                report.steps.len(),
                report.total_dispatched(),
                report.total_failures()
            );
            info!("JSON: {}", report.to_json());
            Ok(!report.aborted())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coldstart_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: api_host={}, action={}, mode={}",
        config.whisk.api_host,
        config.action.name,
        config.mode.name()
    );
    let RetryPolicy { max_retries, delay } = config.retry;
    info!("Result polling: {} retries, {:?} apart", max_retries, delay);

    if let Some(addr) = config.metrics_addr {
        setup_prometheus_metrics(addr)?;
    }

    // Setup failures below are fatal for the whole run
    let client = WhiskClient::new(&config.whisk).inspect_err(|e| {
        error!("Failed to initialize platform client: {}", e);
    })?;
    let service: Arc<dyn InvocationService> = Arc::new(client);

    let mut payload = RequestPayload::load(&config.payload.path).inspect_err(|e| {
        error!("Failed to load request payload: {}", e);
    })?;
    if let Some(ref addr) = config.payload.key_service_addr {
        info!("Overriding key service address: {}", addr);
        payload = payload.with_key_service_addr(addr.clone());
    }

    if config.action.create {
        info!(
            "Creating action {} ({} {})",
            config.action.name, config.action.kind, config.action.image
        );
        service.create_action(&action_spec(&config)).await?;
    }

    let context = BenchmarkContext::new(Arc::clone(&service), &config.action.name, payload);
    let task = InvocationTask::new(context, config.retry, ErrorSignal::new());
    let mut orchestrator = SweepOrchestrator::new(task);

    let run_id = Uuid::new_v4();
    let span = info_span!("run", id = %run_id, mode = config.mode.name());
    let outcome = run_mode(&config, &mut orchestrator).instrument(span).await;

    if config.action.delete_after
        && let Err(e) = service.delete_action(&config.action.name).await
    {
        warn!("Failed to delete action {}: {}", config.action.name, e);
    }

    if outcome? {
        info!("Run {} completed", run_id);
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Run {} stopped after task failures; see log for details", run_id);
        Ok(ExitCode::from(EXIT_ABORTED))
    }
}
