/// Top-level unitgraph error type.
///
/// All fallible operations in `unitgraph-core` return [`Result<T, GraphError>`](Result).
/// The engine performs no I/O outside snapshot persistence, so most variants
/// describe precondition failures surfaced directly to the caller.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Caller input violates a precondition (empty identifier, bad damping, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A persisted graph is structurally invalid.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem I/O error while saving or loading a snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding of a snapshot failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors in unitgraph configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;
