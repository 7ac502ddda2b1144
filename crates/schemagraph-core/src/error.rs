//! Error types for schemagraph

use thiserror::Error;

/// Error reported by a metadata source for a single fetch call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

/// Core error type for crawling and graph operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaGraphError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Structural gap: {0}")]
    StructuralGap(String),

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Graph is sealed: {0}")]
    GraphSealed(String),

    #[error("Failed to {operation} for '{scope}': {source}")]
    SourceFetch {
        operation: String,
        scope: String,
        #[source]
        source: SourceError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SchemaGraphError {
    /// Whether the error is a post-seal mutation attempt
    pub fn is_sealed(&self) -> bool {
        matches!(self, SchemaGraphError::GraphSealed(_))
    }
}

/// Result type alias for schemagraph operations
pub type Result<T> = std::result::Result<T, SchemaGraphError>;

/// Result type alias for metadata source calls
pub type SourceResult<T> = std::result::Result<T, SourceError>;
