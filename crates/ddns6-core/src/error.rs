//! Error types for the IPv6 DDNS updater
//!
//! Every failure after startup is recoverable: the engine logs it and waits
//! for the next poll. Only [`Error::Config`] (and a failed startup lookup)
//! stops the process.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// The monitored interface does not exist
    #[error("interface {0} not found")]
    InterfaceNotFound(String),

    /// The interface exists but carries no public IPv6 address
    #[error("no public IPv6 address found on interface {0}")]
    NoQualifyingAddress(String),

    /// A system call failed (address enumeration, signal setup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The provider answered with `success=false`
    #[error("DNS provider API error: {0}")]
    Api(String),

    /// The provider could not be reached or its response could not be parsed
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an "interface not found" error
    pub fn interface_not_found(interface: impl Into<String>) -> Self {
        Self::InterfaceNotFound(interface.into())
    }

    /// Create a "no qualifying address" error
    pub fn no_qualifying_address(interface: impl Into<String>) -> Self {
        Self::NoQualifyingAddress(interface.into())
    }

    /// Create an API error from the provider's messages
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
