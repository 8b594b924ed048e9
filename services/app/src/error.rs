//! services/app/src/error.rs
//!
//! Defines the primary error type for the litloom service.

use crate::config::ConfigError;
use litloom_core::ports::PortError;
use litloom_core::session::AuthError;

/// The primary error type for the `litloom` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A login or registration attempt failed.
    #[error("{}", .0.user_message())]
    Auth(#[from] AuthError),

    /// Represents an error from the HTTP client while building it.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., creating the data directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The command needs a signed-in user or a valid argument it did not get.
    #[error("{0}")]
    Usage(String),
}
