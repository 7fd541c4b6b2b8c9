//! Database layer: schema DDL and row conversion.

pub mod converters;
pub mod schema;
