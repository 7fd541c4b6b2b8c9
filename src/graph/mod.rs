//! Graph layer: SQLite-backed store, in-memory store, filters and traversal.

pub mod memory;
pub mod predicate;
pub mod store;
pub mod traversal;
