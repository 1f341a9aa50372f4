use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlobStoreKind {
    Memory,
    Fs,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobStoreConfig {
    pub kind: BlobStoreKind,
    pub bucket: String,
    /// Local directory for `fs`.
    pub root: Option<String>,
    /// Required for `s3`.
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// Per-call bound on reads and writes.
    #[serde(default = "default_blob_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableStoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableStoreConfig {
    pub kind: TableStoreKind,
    pub uri: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Log,
    Webhook,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub topic: String,
    pub url: Option<String>,
    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSourceConfig {
    pub http_bind_addr: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryApiConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub blob_store: BlobStoreConfig,
    pub table_store: TableStoreConfig,
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    pub source: HttpSourceConfig,
    pub query_api: Option<QueryApiConfig>,
    pub metrics: Option<MetricsConfig>,
}

fn default_max_connections() -> u32 {
    5
}

fn default_blob_timeout_ms() -> u64 {
    10_000
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_write_timeout_ms() -> u64 {
    5_000
}

fn default_notify_timeout_ms() -> u64 {
    5_000
}

fn default_max_concurrency() -> usize {
    8
}

fn default_max_body_bytes() -> usize {
    4 * 1024 * 1024
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("INGESTION_CONFIG").unwrap_or_else(|_| "ingestion-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Cross-field checks serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        use anyhow::bail;

        if self.blob_store.bucket.trim().is_empty() {
            bail!("blob_store.bucket must not be empty");
        }
        match self.blob_store.kind {
            BlobStoreKind::Fs if self.blob_store.root.is_none() => {
                bail!("blob_store.root is required for kind = \"fs\"")
            }
            BlobStoreKind::S3 if self.blob_store.region.is_none() => {
                bail!("blob_store.region is required for kind = \"s3\"")
            }
            _ => {}
        }
        if self.table_store.kind == TableStoreKind::Postgres && self.table_store.uri.is_none() {
            bail!("table_store.uri is required for kind = \"postgres\"");
        }
        if self.notifier.kind == NotifierKind::Webhook && self.notifier.url.is_none() {
            bail!("notifier.url is required for kind = \"webhook\"");
        }
        if self.blob_store.timeout_ms == 0
            || self.table_store.acquire_timeout_ms == 0
            || self.table_store.write_timeout_ms == 0
            || self.notifier.timeout_ms == 0
        {
            bail!("timeouts must be greater than zero");
        }
        if self.processor.max_concurrency == 0 {
            bail!("processor.max_concurrency must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [blob_store]
        kind = "memory"
        bucket = "energydata2025"

        [table_store]
        kind = "memory"

        [notifier]
        kind = "log"
        topic = "EnergyAnomalies"

        [source]
        http_bind_addr = "0.0.0.0:8080"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.blob_store.kind, BlobStoreKind::Memory);
        assert_eq!(cfg.processor.max_concurrency, 8);
        assert_eq!(cfg.source.max_body_bytes, 4 * 1024 * 1024);
        assert_eq!(cfg.table_store.max_connections, 5);
        assert_eq!(cfg.blob_store.timeout_ms, 10_000);
        assert_eq!(cfg.table_store.acquire_timeout_ms, 5_000);
        assert_eq!(cfg.table_store.write_timeout_ms, 5_000);
        assert!(cfg.query_api.is_none());
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn postgres_without_uri_is_rejected() {
        let raw = MINIMAL.replace("kind = \"memory\"\n\n        [notifier]", "kind = \"postgres\"\n\n        [notifier]");
        let err = AppConfig::from_toml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("table_store.uri"));
    }

    #[test]
    fn webhook_without_url_is_rejected() {
        let raw = MINIMAL.replace("kind = \"log\"", "kind = \"webhook\"");
        let err = AppConfig::from_toml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("notifier.url"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let raw = MINIMAL.replace(
            "bucket = \"energydata2025\"",
            "bucket = \"energydata2025\"\n        timeout_ms = 0",
        );
        let err = AppConfig::from_toml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("timeouts"));
    }

    #[test]
    fn unknown_blob_store_kind_fails_to_parse() {
        let raw = MINIMAL.replacen("kind = \"memory\"", "kind = \"ftp\"", 1);
        assert!(AppConfig::from_toml_str(&raw).is_err());
    }
}
