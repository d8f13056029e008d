//! Fatal error channel.
//!
//! Everything here aborts the run. Recoverable problems (unparseable sources,
//! naming conflicts, validation failures) are logged and never surface as an
//! `AppError`.

use thiserror::Error;

/// Application-level errors for metacrawl.
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Inventory file {0} doesn't exist")]
    MissingInventory(String),

    #[error("Inventory file {path} is not valid: {message}")]
    InvalidInventory { path: String, message: String },

    #[error("Cannot read directory {path}: {message}")]
    Directory { path: String, message: String },

    #[error("Cannot load ontology from {path}: {message}")]
    Ontology { path: String, message: String },

    #[error("Invalid identifier prefix '{prefix}': {message}")]
    IdPrefix { prefix: String, message: String },

    // Resolution setup errors
    #[error("Invalid normalization rule for {range}: {message}")]
    NormalizationRule { range: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Output errors
    #[error("Cannot write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
