pub mod blob_store;
pub mod http_queue;
pub mod queue;

pub use blob_store::{BlobStore, OpendalBlobStore};
pub use queue::{parse_blob_refs, BlobRef, QueueMessage};
