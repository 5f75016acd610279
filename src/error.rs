//! Error handling for the qdsync library
//!
//! Every fallible operation returns [`Result`]. Configuration problems are
//! reported before any state is touched; allocation failures leave the
//! previously valid buffer in place.

use std::collections::TryReserveError;

use thiserror::Error;

/// A specialized Result type for qdsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for qdsync operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid configuration value (sequence length, filter parameters,
    /// buffer length, threshold or search range)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage for the output buffer could not be reserved
    #[error("Could not allocate {len} samples")]
    Allocation {
        len: usize,
        #[source]
        source: TryReserveError,
    },
}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an allocation error for a request of `len` samples
    pub fn allocation(len: usize, source: TryReserveError) -> Self {
        Error::Allocation { len, source }
    }
}
