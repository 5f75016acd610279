//! Synchronizer configuration
//!
//! The receive filter parameters must match the transmitter's pulse shaping.
//! Everything here is fixed once the synchronizer is built; only the output
//! buffer length can be changed later (see
//! [`Synchronizer::set_buf_len`](crate::Synchronizer::set_buf_len)).

use crate::dsp::firdes::FilterType;
use crate::error::{Error, Result};

/// Default number of branches in the timing filter bank.
pub const DEFAULT_NPFB: usize = 256;

/// Default number of symbols handed to the callback per invocation.
pub const DEFAULT_BUF_LEN: usize = 64;

/// Synchronizer parameters.
///
/// # Example
///
/// ```
/// use qdsync::{FilterType, SyncConfig};
///
/// let config = SyncConfig::new(FilterType::Rrc, 2, 7, 0.3).with_buf_len(128);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.npfb, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SyncConfig {
    /// Pulse shape
    pub filter_type: FilterType,
    /// Samples per symbol, at least 2
    pub k: usize,
    /// Filter semi-length (delay) in symbols, at least 1
    pub m: usize,
    /// Excess bandwidth factor in (0, 1]
    pub beta: f32,
    /// Number of timing filter bank branches (default [`DEFAULT_NPFB`])
    pub npfb: usize,
    /// Initial output buffer length (default [`DEFAULT_BUF_LEN`])
    pub buf_len: usize,
}

impl Default for SyncConfig {
    /// Root-raised-cosine, 2 samples/symbol, 7 symbols of delay, rolloff 0.3.
    fn default() -> Self {
        Self {
            filter_type: FilterType::Rrc,
            k: 2,
            m: 7,
            beta: 0.3,
            npfb: DEFAULT_NPFB,
            buf_len: DEFAULT_BUF_LEN,
        }
    }
}

impl SyncConfig {
    /// Create a configuration with the default bank size and buffer length.
    pub fn new(filter_type: FilterType, k: usize, m: usize, beta: f32) -> Self {
        Self {
            filter_type,
            k,
            m,
            beta,
            ..Self::default()
        }
    }

    /// Set the number of timing filter bank branches.
    pub fn with_npfb(mut self, npfb: usize) -> Self {
        self.npfb = npfb;
        self
    }

    /// Set the initial output buffer length.
    pub fn with_buf_len(mut self, buf_len: usize) -> Self {
        self.buf_len = buf_len;
        self
    }

    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.k < 2 {
            return Err(Error::config(format!(
                "samples per symbol ({}) must be at least 2",
                self.k
            )));
        }
        if self.m < 1 {
            return Err(Error::config("filter semi-length must be at least 1"));
        }
        if !(self.beta > 0.0 && self.beta <= 1.0) {
            return Err(Error::config(format!(
                "excess bandwidth factor ({}) must be in (0, 1]",
                self.beta
            )));
        }
        if self.npfb == 0 {
            return Err(Error::config("number of filter bank branches must be greater than 0"));
        }
        if self.buf_len == 0 {
            return Err(Error::config("buffer length must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.npfb, DEFAULT_NPFB);
        assert_eq!(config.buf_len, DEFAULT_BUF_LEN);
    }

    #[test]
    fn test_builder() {
        let config = SyncConfig::new(FilterType::Rect, 4, 3, 0.5)
            .with_npfb(32)
            .with_buf_len(10);
        assert_eq!(config.filter_type, FilterType::Rect);
        assert_eq!(config.k, 4);
        assert_eq!(config.m, 3);
        assert_eq!(config.npfb, 32);
        assert_eq!(config.buf_len, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = SyncConfig::default();
        let cases = [
            SyncConfig { k: 1, ..base },
            SyncConfig { m: 0, ..base },
            SyncConfig { beta: 0.0, ..base },
            SyncConfig { beta: 1.1, ..base },
            SyncConfig { beta: f32::NAN, ..base },
            SyncConfig { npfb: 0, ..base },
            SyncConfig { buf_len: 0, ..base },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "{:?} should be rejected",
                config
            );
        }
    }
}
