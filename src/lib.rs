//! Frame detection and synchronization for linearly modulated signals.
//!
//! `qdsync` finds a known preamble in a stream of complex baseband samples,
//! estimates the carrier frequency, carrier phase, channel gain and
//! fractional timing offsets, and then delivers timing- and carrier-corrected
//! symbols (one per symbol period) to a callback.
//!
//! The processing is purely sample driven: [`Synchronizer::execute`] consumes
//! whatever block of samples the caller has, and the callback runs inline
//! every time a window of [`Synchronizer::buf_len`] symbols is ready.
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use qdsync::dsp::firdes::{design_rnyquist, interp_linear};
//! use qdsync::{CallbackAction, SyncConfig, Synchronizer};
//!
//! fn on_symbols(symbols: &[Complex<f32>], count: &mut usize) -> CallbackAction {
//!     *count += symbols.len();
//!     CallbackAction::Continue
//! }
//!
//! let config = SyncConfig::default().with_buf_len(16);
//!
//! // 64-symbol BPSK preamble followed by 64 payload symbols
//! let mut state = 0x2du8;
//! let symbols: Vec<Complex<f32>> = (0..128)
//!     .map(|_| {
//!         state = ((state << 1) | (((state >> 6) ^ (state >> 5)) & 1)) & 0x7f;
//!         Complex::new(if state & 1 == 1 { 1.0 } else { -1.0 }, 0.0)
//!     })
//!     .collect();
//! let h = design_rnyquist(config.filter_type, config.k, config.m, config.beta)?;
//! let frame = interp_linear(&symbols, &h, config.k, config.k * (symbols.len() + 2 * config.m));
//!
//! let mut sync = Synchronizer::new(&symbols[..64], config, Some(on_symbols), 0usize)?;
//! let mut input = vec![Complex::new(0.0, 0.0); 100];
//! input.extend(frame);
//! sync.execute(&input);
//!
//! assert!(sync.is_open());
//! assert!(*sync.context() > 0);
//! # Ok::<(), qdsync::Error>(())
//! ```

pub mod config;
pub mod dsp;
pub mod error;
pub mod sync;

pub use config::{SyncConfig, DEFAULT_BUF_LEN, DEFAULT_NPFB};
pub use dsp::firdes::FilterType;
pub use dsp::{CarrierMixer, FrameDetector, TimingFilterBank};
pub use error::{Error, Result};
pub use sync::{Callback, CallbackAction, Synchronizer};
