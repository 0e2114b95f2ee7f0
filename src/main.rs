//! Post rater entrypoint.
//!
//! Reads newline-delimited JSON items from stdin, rates each one, and writes
//! indicator updates to stdout as JSON lines.

use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;

use rater::{
    CacheChange, Config, FeedExtractor, FileStore, HttpTransport, Item, JsonLinesSink,
    ModelCatalog, PipelineService,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        model = %config.model_id,
        streaming = config.streaming,
        max_retries = config.max_retries,
        store = %config.store_path.display(),
        "rater starting"
    );
    if config.api_key().is_none() {
        tracing::warn!("RATER_API_KEY is not set; every item will end in the error state");
    }

    let store = Arc::new(FileStore::new(config.store_path.clone()));
    let transport = Arc::new(HttpTransport::new(config.completions_url.clone()));
    let catalog = Arc::new(ModelCatalog::new(config.models_url.clone()));
    let feed = Arc::new(FeedExtractor::new());
    let sink = Arc::new(JsonLinesSink::stdout());

    let service = Arc::new(
        PipelineService::new(config, transport, store, Arc::clone(&feed) as _, sink)
            .with_catalog(catalog),
    );

    if std::env::args().any(|arg| arg == "--clear-cache") {
        service.cache().clear().await?;
        tracing::info!("rating cache cleared");
        return Ok(());
    }

    match service.cache().load().await {
        Ok(count) => tracing::info!(entries = count, "rating cache hydrated"),
        Err(e) => tracing::warn!("Failed to load rating cache: {}. Starting empty.", e),
    }
    service.cache().subscribe(Arc::new(|change: &CacheChange| {
        tracing::trace!(?change, "cache changed");
    }));

    let mut tasks = JoinSet::new();
    let interrupted = tokio::select! {
        result = read_items(&service, &feed, &mut tasks) => {
            result?;
            false
        }
        _ = shutdown_signal() => true,
    };

    if interrupted {
        tasks.abort_all();
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined
            && !e.is_cancelled()
        {
            tracing::error!(error = %e, "rating task failed");
        }
    }

    service.flush().await;
    let stats = service.cache().stats();
    tracing::info!(
        finalized = stats.finalized,
        mean_score = ?stats.mean_score,
        "rater shutdown complete"
    );
    Ok(())
}

/// Item discovery: one JSON item per stdin line.
async fn read_items(
    service: &Arc<PipelineService>,
    feed: &FeedExtractor,
    tasks: &mut JoinSet<()>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut item: Item = match serde_json::from_str(&line) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed item line");
                continue;
            }
        };

        feed.observe(item.clone());
        let ancestors = service.advance_thread(&item).await;
        if item.parent_context.is_none() && !item.is_thread_root() {
            item.parent_context = ancestors;
        }

        let service = Arc::clone(service);
        tasks.spawn(async move {
            service.schedule(item).await;
        });
    }

    tracing::info!("end of input, waiting for in-flight ratings");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "rating task failed");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, persisting ratings");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, persisting ratings");
        }
    }
}
