//! Builds the remote-service clients described by [`AppConfig`].

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;

use crate::config::{AppConfig, BlobStoreKind, NotifierKind, TableStoreKind};
use crate::sinks::{AnomalyNotifier, LogNotifier, MemoryTableStore, Notifier, PgTableStore, TableStore, WebhookNotifier};
use crate::sources::OpendalBlobStore;

pub fn blob_store(cfg: &AppConfig) -> Result<OpendalBlobStore> {
    let b = &cfg.blob_store;
    let store = match b.kind {
        BlobStoreKind::Memory => OpendalBlobStore::memory(&b.bucket)?,
        BlobStoreKind::Fs => OpendalBlobStore::fs(&b.bucket, b.root.as_deref().unwrap_or("."))?,
        BlobStoreKind::S3 => OpendalBlobStore::s3(
            &b.bucket,
            b.region.as_deref().unwrap_or("us-east-1"),
            b.endpoint.as_deref(),
        )?,
    };
    Ok(store.with_timeout(Duration::from_millis(b.timeout_ms)))
}

pub async fn table_store(cfg: &AppConfig) -> Result<Arc<dyn TableStore>> {
    let t = &cfg.table_store;
    match (t.kind, t.uri.as_deref()) {
        (TableStoreKind::Postgres, Some(uri)) => {
            let pool = PgPoolOptions::new()
                .max_connections(t.max_connections)
                .acquire_timeout(Duration::from_millis(t.acquire_timeout_ms))
                .connect(uri)
                .await?;
            Ok(Arc::new(PgTableStore::new(pool)))
        }
        (TableStoreKind::Postgres, None) => anyhow::bail!("table_store.uri is required for postgres"),
        (TableStoreKind::Memory, _) => {
            tracing::warn!("using in-memory table store; records are lost on exit");
            Ok(Arc::new(MemoryTableStore::new()))
        }
    }
}

pub fn notifier(cfg: &AppConfig) -> Result<AnomalyNotifier> {
    let n = &cfg.notifier;
    let inner: Arc<dyn Notifier> = match (n.kind, n.url.as_deref()) {
        (NotifierKind::Webhook, Some(url)) => {
            Arc::new(WebhookNotifier::new(url, Duration::from_millis(n.timeout_ms))?)
        }
        (NotifierKind::Webhook, None) => anyhow::bail!("notifier.url is required for webhook"),
        (NotifierKind::Log, _) => Arc::new(LogNotifier),
    };
    Ok(AnomalyNotifier::new(inner, n.topic.clone()))
}
