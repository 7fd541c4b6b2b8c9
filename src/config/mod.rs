//! Configuration: YAML schema and layered loading.

pub mod loader;
pub mod schema;

pub use loader::{load, ConfigOverrides};
pub use schema::{AppConfig, DatabaseConfig, JournalMode, LoggingConfig};
