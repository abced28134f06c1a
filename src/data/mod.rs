//! Data module - CSV loading, schema resolution and caching

mod cache;
mod loader;
pub mod schema;

pub use cache::TableCache;
pub use loader::{load_tables, LoadError, LoadedTables};
pub use schema::RfmColumns;
