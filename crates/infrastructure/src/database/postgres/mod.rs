mod dispatch_store;

pub use dispatch_store::PostgresDispatchStore;
