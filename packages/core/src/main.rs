use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::RwLock;

use traceability_sync::api::{create_router, AppState};
use traceability_sync::cli::Cli;
use traceability_sync::config::Config;
use traceability_sync::error::AppError;
use traceability_sync::feed::{spawn_twin, DigitalTwin, MetricsFeed, SharedTwin};
use traceability_sync::generator::GenerationPolicy;
use traceability_sync::logging::init_logging;
use traceability_sync::metrics::AppMetrics;
use traceability_sync::services::{DataSource, MockDataSource};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run(Cli::parse()).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::from_env()?.apply_cli(&cli)?;
    tracing::info!("Service starting with config: {:?}", config);

    let metrics = Arc::new(
        AppMetrics::new().map_err(|err| AppError::Config(format!("metrics registry: {}", err)))?,
    );

    let mock = MockDataSource::seeded(
        GenerationPolicy::default(),
        config.ledger_size,
        config.ledger_seed,
    )?;
    metrics.ledger_records.set(mock.ledger().read().await.len() as f64);
    let source: Arc<dyn DataSource> = Arc::new(mock);

    let feed = Arc::new(
        MetricsFeed::new(source.clone(), config.feed_interval()).with_metrics(metrics.clone()),
    );

    // Mirror the feed into the service log.
    let log_subscription = feed.subscribe(|update| {
        tracing::info!(
            "Feed update {}: efficiency {:.1}%, defects {:.1}%, {} active materials",
            update.sequence,
            update.metrics.production_efficiency_pct,
            update.metrics.defect_rate_pct,
            update.metrics.active_materials_count,
        );
    });

    let twin: SharedTwin = Arc::new(RwLock::new(DigitalTwin::default()));
    let twin_rng = match config.ledger_seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let twin_task = spawn_twin(twin.clone(), config.twin_interval(), twin_rng);

    let state = AppState::new(source, feed, twin, metrics);
    let app = create_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("cannot bind {}: {}", config.bind_addr, err)))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("Shutdown signal received. Stopping server.");
        })
        .await
        .map_err(|err| AppError::Transport(err.to_string()))?;

    log_subscription.unsubscribe();
    twin_task.abort();
    tracing::info!("Service stopped cleanly");
    Ok(())
}
