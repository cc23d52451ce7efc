//! Error types for the flowgate library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum GatingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid intensity '{value}' at event {row}, channel '{channel}'")]
    InvalidIntensity {
        value: String,
        row: usize,
        channel: String,
    },

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate channel name '{0}'")]
    DuplicateChannel(String),

    #[error("Gate '{gate}' references channel '{channel}' not present in the event table")]
    MissingChannel { gate: String, channel: String },

    #[error("Polygon gate '{gate}' has {n_vertices} vertices; at least 3 required")]
    InvalidGeometry { gate: String, n_vertices: usize },

    #[error("Empty event table: {0}")]
    EmptyInput(String),

    #[error("Stage '{stage}' received an empty input population")]
    EmptyStageInput { stage: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, GatingError>;
