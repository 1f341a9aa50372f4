use std::time::SystemTime;

pub mod batch;

pub use batch::{BatchProcessor, BatchResult, Collaborators, MessageOutcome};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

/// Failures that abort processing of a single queue message.
///
/// Every variant marks the message as failed so the queue redelivers it.
/// Notification failures are deliberately not represented here; see
/// [`crate::sinks::NotifyError`].
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid queue message: {0}")]
    InvalidMessage(String),
    #[error("blob fetch error: {0}")]
    Fetch(String),
    #[error("malformed event: {0}")]
    Malformed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => "invalid_message",
            Self::Fetch(_) => "fetch",
            Self::Malformed(_) => "malformed",
            Self::Storage(_) => "storage",
        }
    }
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}
