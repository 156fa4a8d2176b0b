//! Database layer - storage traits and backends

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use traits::{AuditTrailStore, DateRange, NotificationStore, RecordQuery, RecordStore, TextMatch};
