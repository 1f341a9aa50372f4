use std::time::Duration;

use opendal::{layers::TimeoutLayer, services, ErrorKind, Operator};

use crate::pipeline::PipelineError;
use crate::sources::queue::BlobRef;

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, PipelineError>;
    async fn put(&self, blob: &BlobRef, data: Vec<u8>) -> Result<(), PipelineError>;
}

/// Blob store bound to a single bucket, backed by an OpenDAL operator.
#[derive(Clone)]
pub struct OpendalBlobStore {
    bucket: String,
    operator: Operator,
}

impl OpendalBlobStore {
    pub fn new(bucket: impl Into<String>, operator: Operator) -> Self {
        Self {
            bucket: bucket.into(),
            operator,
        }
    }

    /// Bound every remote call; a stalled read or write fails with a
    /// timeout error instead of hanging the delivery.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let layer = TimeoutLayer::new()
            .with_timeout(timeout)
            .with_io_timeout(timeout);
        Self {
            operator: self.operator.layer(layer),
            ..self
        }
    }

    /// Process-local store, used by tests and single-node setups.
    pub fn memory(bucket: &str) -> anyhow::Result<Self> {
        let operator = Operator::new(services::Memory::default())?.finish();
        Ok(Self::new(bucket, operator))
    }

    /// Objects live under `root/`; the bucket name is not part of the path.
    pub fn fs(bucket: &str, root: &str) -> anyhow::Result<Self> {
        let builder = services::Fs::default().root(root);
        let operator = Operator::new(builder)?.finish();
        Ok(Self::new(bucket, operator))
    }

    pub fn s3(bucket: &str, region: &str, endpoint: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = services::S3::default().bucket(bucket).region(region);
        if let Some(ep) = endpoint {
            builder = builder.endpoint(ep);
        }
        let operator = Operator::new(builder)?.finish();
        Ok(Self::new(bucket, operator))
    }

    fn check_bucket(&self, blob: &BlobRef) -> Result<(), PipelineError> {
        if blob.bucket != self.bucket {
            return Err(PipelineError::Fetch(format!(
                "bucket '{}' is not served by this store (expected '{}')",
                blob.bucket, self.bucket
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlobStore for OpendalBlobStore {
    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, PipelineError> {
        self.check_bucket(blob)?;

        match self.operator.read(&blob.key).await {
            Ok(buf) => {
                metrics::counter!("blob_fetch_bytes_total").increment(buf.len() as u64);
                Ok(buf.to_vec())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PipelineError::Fetch(format!("blob {blob} not found")))
            }
            Err(e) => Err(PipelineError::Fetch(format!("failed to read blob {blob}: {e}"))),
        }
    }

    async fn put(&self, blob: &BlobRef, data: Vec<u8>) -> Result<(), PipelineError> {
        self.check_bucket(blob)?;

        self.operator
            .write(&blob.key, data)
            .await
            .map_err(|e| PipelineError::Storage(format!("failed to write blob {blob}: {e}")))?;
        Ok(())
    }
}
