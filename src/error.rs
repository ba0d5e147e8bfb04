//! Error types for ansisql.

use thiserror::Error;

/// The main error type for compilation, resolution and DDL generation.
#[derive(Debug, Error)]
pub enum SqlError {
    /// A node was used in a position it has no rendering rule for.
    #[error("Unsupported node kind: {kind} cannot be rendered as {position}")]
    UnsupportedNodeKind {
        kind: &'static str,
        position: &'static str,
    },

    /// A node refers to something that was never rendered (dangling handle or cycle).
    #[error("Unresolved reference to node #{node}: {reason}")]
    UnresolvedReference { node: usize, reason: &'static str },

    /// An override names no registered bind parameter.
    #[error("No such bind param in statement: '{0}'")]
    UnknownBindName(String),

    /// A bind parameter has neither an override nor a default value.
    #[error("No value supplied for bind param '{0}'")]
    MissingBindValue(String),

    /// Failed to parse a bind assignment.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Malformed statement document.
    #[error("Document error: {0}")]
    Document(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create an unsupported node kind error.
    pub fn unsupported(kind: &'static str, position: &'static str) -> Self {
        Self::UnsupportedNodeKind { kind, position }
    }

    /// Create an unresolved reference error.
    pub fn unresolved(node: usize, reason: &'static str) -> Self {
        Self::UnresolvedReference { node, reason }
    }

    /// True for errors the caller can fix by supplying different bind values.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(self, Self::UnknownBindName(_) | Self::MissingBindValue(_))
    }
}

impl From<toml::de::Error> for SqlError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type alias for ansisql operations.
pub type SqlResult<T> = Result<T, SqlError>;
