//! Error type shared by every layer of entgraph.

use thiserror::Error;

/// Everything that can go wrong while opening, migrating, writing to or
/// querying the entity graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The provider could not be opened (bad path, permissions, locked file).
    #[error("failed opening connection to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Schema creation or verification failed.
    #[error("failed creating schema resources: {0}")]
    Schema(#[source] rusqlite::Error),

    /// A read or write reached a provider whose schema was never ensured.
    #[error("schema not initialized: call ensure_schema first")]
    SchemaNotReady,

    /// Any other read or write failure reported by SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A query that required exactly one result matched none.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A query that required exactly one result matched several.
    #[error("{entity} not singular: expected exactly one, found {count}")]
    NotSingular { entity: &'static str, count: usize },

    /// A create was rejected because it would break a referential invariant.
    #[error("invalid {entity}: {reason}")]
    Constraint {
        entity: &'static str,
        reason: String,
    },

    /// A query failure annotated with the step that issued it.
    #[error("{context}: {source}")]
    Query {
        context: String,
        #[source]
        source: Box<GraphError>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Wrap `self` with a message naming the failed operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        GraphError::Query {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for the connection and schema failures the demo treats as fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GraphError::Connection { .. } | GraphError::Schema(_) | GraphError::SchemaNotReady
        )
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message() {
        let err = GraphError::NotFound { entity: "group" }.context("failed getting cars");
        assert_eq!(err.to_string(), "failed getting cars: group not found");
    }

    #[test]
    fn not_singular_reports_count() {
        let err = GraphError::NotSingular {
            entity: "user",
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "user not singular: expected exactly one, found 3"
        );
    }

    #[test]
    fn only_connection_and_schema_are_fatal() {
        assert!(GraphError::Schema(rusqlite::Error::InvalidQuery).is_fatal());
        assert!(GraphError::SchemaNotReady.is_fatal());
        assert!(!GraphError::Config("bad yaml".into()).is_fatal());
        assert!(GraphError::Connection {
            target: ":memory:".into(),
            source: rusqlite::Error::InvalidQuery,
        }
        .is_fatal());
        assert!(!GraphError::Database(rusqlite::Error::InvalidQuery).is_fatal());
        assert!(!GraphError::NotFound { entity: "car" }
            .context("failed getting cars")
            .is_fatal());
    }
}
