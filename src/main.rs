use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use promoshare_relay::{
    AppConfig, HttpFeedClient, HttpWebhookDispatcher, OfferPipeline, OfferScheduler, PipelineSettings,
    SqlStore, logging, metrics,
    web::{self, AppState},
};

#[derive(Debug, Parser)]
#[command(name = "promoshare-relay", version, about = "Relays new catalog offers to messaging groups")]
struct Cli {
    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,

    /// Run the scheduler without the HTTP gateway.
    #[arg(long)]
    no_server: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let _log_guard = logging::init_logging(&config.logging)?;
    metrics::install_exporter(&config.metrics, &config.server.host)?;

    info!("Starting PromoShare relay...");

    let store = SqlStore::connect(&config.database).await?;
    store.run_migrations().await?;
    info!("Database migrations applied");

    let feed = Arc::new(HttpFeedClient::new(&config.feed)?);
    let dispatcher = Arc::new(HttpWebhookDispatcher::new(&config.webhook)?);
    let pipeline = Arc::new(OfferPipeline::new(
        feed.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        dispatcher.clone(),
        PipelineSettings::from_config(&config),
    ));
    let scheduler = Arc::new(OfferScheduler::new(pipeline, &config.scheduler));

    if cli.once {
        let report = scheduler.trigger_now().await?;
        info!(
            external_id = ?report.external_id,
            created = report.created_offer_ids().len(),
            "Single poll cycle finished"
        );
        store.close().await;
        return Ok(());
    }

    if config.scheduler.enabled {
        scheduler.start().await?;
    } else {
        info!("Scheduler disabled by configuration");
    }

    // The timer stops and the running cycle finishes before HTTP stops and
    // the pool closes.
    let patience = Duration::from_secs(config.server.shutdown_timeout);

    if cli.no_server {
        shutdown_signal().await;
        scheduler.shutdown(patience).await?;
    } else {
        let state = AppState {
            store: store.clone(),
            feed,
            dispatcher,
            scheduler: scheduler.clone(),
            config: Arc::new(config.clone()),
        };
        let app = web::create_router(state);

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("Server listening on {}", addr);

        let stopping = scheduler.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                if let Err(e) = stopping.shutdown(patience).await {
                    tracing::error!(error = %e, "Failed to stop the offer scheduler");
                }
            })
            .await?;
    }

    store.close().await;
    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
