//! Error types for the alias updater
//!
//! Only real failures live here. "No global prefix present" is a normal
//! outcome and is modelled by [`crate::prefix::PrefixLookup::NotFound`].

use thiserror::Error;

/// Result type alias for alias updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the alias updater
#[derive(Error, Debug)]
pub enum Error {
    /// Failure talking to, or interpreting a response from, the firewall API
    #[error("Remote API error during {operation}: {message}")]
    Remote {
        /// Which API operation failed (e.g. "list_alias_entries")
        operation: String,
        /// What went wrong
        message: String,
    },

    /// Failure enumerating the addresses of a local interface
    #[error("Local address query failed for interface {interface}: {message}")]
    LocalQuery {
        /// Interface that was queried
        interface: String,
        /// What went wrong
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors (reading the configuration file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file syntax errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a remote API error
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a local address query error
    pub fn local_query(interface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LocalQuery {
            interface: interface.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error came from the firewall API
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Whether this error came from local address enumeration
    pub fn is_local_query(&self) -> bool {
        matches!(self, Self::LocalQuery { .. })
    }
}
