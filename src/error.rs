use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid route code '{code}': {reason}")]
    InvalidRouteCode { code: String, reason: String },

    #[error("Invalid postal code: {0}")]
    InvalidPostalCode(String),

    #[error("Partition mapping failed for route {route}: {reason}")]
    MappingFailure { route: String, reason: String },

    #[error("Routing service unavailable: {0}")]
    RoutingUnavailable(String),

    #[error("Rate store query failed for {scheme} ({window}): {message}")]
    StoreQuery {
        scheme: String,
        window: String,
        message: String,
    },

    #[error("Failed to persist {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    #[error(
        "Checkpoint does not match route list at position {index}: expected '{expected}', found '{found}'"
    )]
    CheckpointMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
