//! Error types for WDP

use thiserror::Error;

/// Result type alias for WDP operations
pub type Result<T> = std::result::Result<T, WdpError>;

/// Main error type for WDP shared infrastructure
#[derive(Error, Debug)]
pub enum WdpError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
