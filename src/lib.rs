//! entgraph: a user/car/group entity graph.
//!
//! Seeds a small graph of users, the cars they own and the groups they
//! belong to, then answers traversal queries over it. Storage sits behind
//! the [`provider::GraphProvider`] trait, with a SQLite implementation and
//! an in-memory one.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod observability;
pub mod provider;
pub mod service;
pub mod types;
