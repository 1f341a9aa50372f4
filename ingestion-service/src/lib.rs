pub mod bootstrap;
pub mod config;
pub mod generator;
pub mod http;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod query_api;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{BatchProcessor, BatchResult, Collaborators, Envelope};
