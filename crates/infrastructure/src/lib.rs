pub mod database;
pub mod observability;

pub use database::postgres::PostgresDispatchStore;
pub use observability::MetricsCollector;
