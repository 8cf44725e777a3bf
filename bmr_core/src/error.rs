//! Error types for the bmr_core library.

use crate::ProfileId;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bmr_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile creation attempted with the collection already full
    #[error("Maximum of {max} profiles reached. Delete an existing profile to create a new one.")]
    CapacityExceeded { max: usize },

    /// No profile with the given id
    #[error("Profile not found: {0}")]
    NotFound(ProfileId),

    /// Age, height or weight outside the usable domain
    #[error("Invalid metrics: {0}")]
    InvalidMetrics(String),

    /// Profile name empty after trimming
    #[error("Profile name must not be empty")]
    InvalidName,

    /// An operation needed the active profile but none is selected
    #[error("No active profile. Select or create a profile first.")]
    NoActiveProfile,

    /// The advice service rejected the configured API key
    #[error("API key problem: {0}")]
    ApiKey(String),

    /// The advice service request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
