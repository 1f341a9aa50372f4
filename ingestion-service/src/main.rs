use anyhow::Result;
use energy_ingest::{
    bootstrap,
    config::AppConfig,
    http, metrics_server, observability,
    pipeline::{BatchProcessor, Collaborators},
    query_api,
    sources::http_queue,
};
use std::{sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Clients are created once and shared by every batch.
    let table = bootstrap::table_store(&cfg).await?;
    let collaborators = Collaborators {
        blobs: Arc::new(bootstrap::blob_store(&cfg)?),
        table: table.clone(),
        notifier: bootstrap::notifier(&cfg)?,
    };
    let processor = BatchProcessor::new(collaborators, cfg.processor.max_concurrency)
        .with_write_timeout(Duration::from_millis(cfg.table_store.write_timeout_ms));

    let ingest_app = http_queue::router(Arc::new(processor), cfg.source.max_body_bytes);

    match &cfg.query_api {
        Some(api_cfg) => {
            let query_app = query_api::router(table);
            tokio::try_join!(
                http::serve("ingest", &cfg.source.http_bind_addr, ingest_app),
                http::serve("query", &api_cfg.bind_addr, query_app),
            )?;
        }
        None => http::serve("ingest", &cfg.source.http_bind_addr, ingest_app).await?,
    }

    Ok(())
}
