use anyhow::Result;
use energy_ingest::{bootstrap, config::AppConfig, generator, observability};
use time::OffsetDateTime;

/// Generate one reading per site for the current second, upload them to the
/// configured blob store and print one object-created notification per line.
/// The notifications can be fed to `POST /ingest/batch` as message bodies.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let store = bootstrap::blob_store(&cfg)?;

    let timestamp = OffsetDateTime::now_utc().replace_nanosecond(0)?;
    let events = generator::generate_events(&mut rand::thread_rng(), &generator::DEFAULT_SITES, timestamp);
    tracing::info!(records = events.len(), "generated telemetry, uploading");

    let notifications = generator::upload_events(&store, &cfg.blob_store.bucket, &events).await?;
    for n in &notifications {
        println!("{n}");
    }

    tracing::info!(uploaded = notifications.len(), "upload completed");
    Ok(())
}
