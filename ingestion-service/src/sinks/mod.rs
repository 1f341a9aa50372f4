pub mod notifier;
pub mod postgres;
pub mod storage_writer;
pub mod table_store;

pub use notifier::{AnomalyNotifier, LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use postgres::PgTableStore;
pub use storage_writer::StorageWriter;
pub use table_store::{MemoryTableStore, TableStore, TimeRange};
