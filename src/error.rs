use thiserror::Error;

/// Error types for the astromod library.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Model output shape does not agree with the supplied data shape.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The model declines to compute an inverse for the requested output.
    #[error("Model is not invertible: {0}")]
    NotInvertible(String),

    /// Unknown fit, optimization, integration, or contraction method name.
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// An operation needed `(x, y)` data, but none was supplied or stored.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Construction-time parameter, arity, or naming problem.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown registry name or coordinate-transform pair.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// A value or model of the wrong kind was supplied.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A numeric routine failed to converge.
    #[error("Convergence failure: {0}")]
    Convergence(String),

    /// Error during a numeric computation.
    #[error("Computation error: {0}")]
    Computation(String),

    /// Not implemented functionality.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for astromod operations.
pub type Result<T> = std::result::Result<T, ModelError>;

impl From<String> for ModelError {
    fn from(s: String) -> Self {
        ModelError::Computation(s)
    }
}

impl From<&str> for ModelError {
    fn from(s: &str) -> Self {
        ModelError::Computation(s.to_string())
    }
}
