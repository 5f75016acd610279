//! Frame detector and synchronizer
//!
//! Two-stage receiver front end for linearly modulated signals:
//!
//! 1. **Detect**: every sample goes to a [`FrameDetector`] correlating against
//!    the known preamble. On detection it reports a fractional timing offset,
//!    a channel gain and a carrier frequency/phase offset.
//! 2. **Sync**: the estimates program a [`CarrierMixer`] and a
//!    [`TimingFilterBank`]; every sample is mixed down, matched filtered with
//!    the branch closest to the timing offset, and decimated to one symbol
//!    per `k` samples.
//!
//! Symbols are collected in an output buffer and handed to a callback in
//! fixed-size windows. The callback can ask for the synchronizer to be reset,
//! which drops the current frame and returns to the detection stage.
//!
//! # Design
//!
//! The handoff follows liquid-dsp's `qdsync_cccf`:
//! - branch index `round(tau * npfb)`, wrapped into `[0, npfb)` by adding
//!   `npfb` and emitting the next symbol one sample early
//! - decimation counter starting at `k - 2`
//! - filter bank scale `1 / (k * gamma)`
//! - the first `2m` symbols after the handoff are matched-filter ramp-up and
//!   are dropped
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use qdsync::{CallbackAction, SyncConfig, Synchronizer};
//!
//! fn collect(symbols: &[Complex<f32>], out: &mut Vec<Complex<f32>>) -> CallbackAction {
//!     out.extend_from_slice(symbols);
//!     CallbackAction::Continue
//! }
//!
//! let preamble: Vec<Complex<f32>> = (0..32)
//!     .map(|i| Complex::new(if i % 3 == 0 { 1.0 } else { -1.0 }, 0.0))
//!     .collect();
//!
//! let mut sync = Synchronizer::new(&preamble, SyncConfig::default(), Some(collect), Vec::new())?;
//! sync.execute(&vec![Complex::new(0.0, 0.0); 256]);
//! assert!(!sync.is_open());
//! # Ok::<(), qdsync::Error>(())
//! ```

pub mod buffer;

use std::fmt;
use std::mem;

use num_complex::Complex;
use tracing::{debug, trace};

use self::buffer::OutputBuffer;
use crate::config::SyncConfig;
use crate::dsp::firpfb::FirPfb;
use crate::dsp::nco::Nco;
use crate::dsp::qdetector::QDetector;
use crate::dsp::{CarrierMixer, FrameDetector, TimingFilterBank};
use crate::error::{Error, Result};

/// Consumer callback.
///
/// Receives the next window of synchronized symbols and the user context.
/// The window is only valid during the call.
pub type Callback<C> = fn(&[Complex<f32>], &mut C) -> CallbackAction;

/// What the synchronizer should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackAction {
    /// Keep delivering symbols from the current frame
    #[default]
    Continue,
    /// Drop the current frame and go back to searching for a preamble
    Reset,
}

/// Tracking-stage state, created at the detection handoff.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tracking {
    /// Matched filter output timer
    mf_counter: i32,
    /// Filter bank branch
    pfb_index: usize,
    /// Symbols produced since the handoff, including the dropped ramp-up
    symbol_counter: u32,
    /// Carrier frequency installed on the mixer
    dphi: f32,
    /// Carrier phase installed on the mixer
    phi: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Searching for the preamble
    Detect,
    /// Mixing, matched filtering and decimating
    Sync(Tracking),
}

/// Frame detector and synchronizer.
///
/// `C` is the callback context. The detector, mixer and filter bank default
/// to [`QDetector`], [`Nco`] and [`FirPfb`].
///
/// Cloning produces a fully independent synchronizer: every collaborator and
/// the buffered symbols are duplicated, and the context is cloned.
#[derive(Debug, Clone)]
pub struct Synchronizer<C, D = QDetector, M = Nco, F = FirPfb> {
    config: SyncConfig,
    seq_len: usize,

    detector: D,
    mixer: M,
    mf: F,

    state: State,
    buffer: OutputBuffer,
    /// Copy of the detector window, replayed through the tracking stage
    replay: Vec<Complex<f32>>,

    callback: Option<Callback<C>>,
    context: C,
}

impl<C> Synchronizer<C> {
    /// Create a synchronizer for a linearly modulated preamble.
    ///
    /// # Arguments
    ///
    /// * `sequence` - Preamble symbols (must not be empty)
    /// * `config` - Pulse shape and buffer parameters
    /// * `callback` - Consumer of synchronized symbols
    /// * `context` - Value handed to `callback`
    pub fn new(
        sequence: &[Complex<f32>],
        config: SyncConfig,
        callback: Option<Callback<C>>,
        context: C,
    ) -> Result<Self> {
        if sequence.is_empty() {
            return Err(Error::config("sequence length cannot be zero"));
        }
        config.validate()?;

        let detector =
            QDetector::create_linear(sequence, config.filter_type, config.k, config.m, config.beta)?;
        let mixer = Nco::default();
        let mf = FirPfb::create_rnyquist(
            config.filter_type,
            config.npfb,
            config.k,
            config.m,
            config.beta,
        )?;

        Self::from_parts(sequence.len(), config, detector, mixer, mf, callback, context)
    }
}

impl<C, D, M, F> Synchronizer<C, D, M, F>
where
    D: FrameDetector,
    M: CarrierMixer,
    F: TimingFilterBank,
{
    /// Create a synchronizer around caller-supplied collaborators.
    ///
    /// `mf` must provide `config.npfb` branches.
    pub fn from_parts(
        seq_len: usize,
        config: SyncConfig,
        detector: D,
        mixer: M,
        mf: F,
        callback: Option<Callback<C>>,
        context: C,
    ) -> Result<Self> {
        if seq_len == 0 {
            return Err(Error::config("sequence length cannot be zero"));
        }
        config.validate()?;
        if mf.num_filters() != config.npfb {
            return Err(Error::config(format!(
                "filter bank has {} branches, expected {}",
                mf.num_filters(),
                config.npfb
            )));
        }

        let buffer = OutputBuffer::new(config.buf_len)?;

        let mut q = Self {
            config,
            seq_len,
            detector,
            mixer,
            mf,
            state: State::Detect,
            buffer,
            replay: Vec::new(),
            callback,
            context,
        };
        q.reset();
        Ok(q)
    }

    /// Return to the detection stage.
    ///
    /// Re-arms the detector, drops the tracking state and any buffered
    /// symbols, and clears the matched filter history.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.state = State::Detect;
        self.buffer.clear();
        self.mf.reset();
    }

    /// Push a block of samples through the synchronizer.
    ///
    /// The callback runs inline whenever the output buffer fills.
    pub fn execute(&mut self, samples: &[Complex<f32>]) {
        for &x in samples {
            match self.state {
                State::Detect => self.execute_detect(x),
                State::Sync(_) => self.step(x),
            }
        }
    }

    /// Whether a frame is currently being tracked.
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Sync(_))
    }

    /// Detection threshold.
    pub fn threshold(&self) -> f32 {
        self.detector.threshold()
    }

    /// Set the detection threshold; applies from the next detection on.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<()> {
        self.detector.set_threshold(threshold)
    }

    /// Carrier offset search range (radians/sample).
    pub fn range(&self) -> f32 {
        self.detector.range()
    }

    /// Set the carrier offset search range; applies from the next detection on.
    pub fn set_range(&mut self, dphi_max: f32) -> Result<()> {
        self.detector.set_range(dphi_max)
    }

    /// Correlator output of the last detection.
    pub fn rxy(&self) -> f32 {
        self.detector.rxy()
    }

    /// Fractional timing offset estimate of the last detection.
    pub fn tau(&self) -> f32 {
        self.detector.tau()
    }

    /// Channel gain estimate of the last detection.
    pub fn gamma(&self) -> f32 {
        self.detector.gamma()
    }

    /// Carrier frequency offset estimate of the last detection.
    pub fn dphi(&self) -> f32 {
        self.detector.dphi()
    }

    /// Carrier phase offset estimate of the last detection.
    pub fn phi(&self) -> f32 {
        self.detector.phi()
    }

    /// Set the consumer callback. `None` discards delivered windows.
    pub fn set_callback(&mut self, callback: Option<Callback<C>>) {
        self.callback = callback;
    }

    /// Replace the callback context.
    pub fn set_context(&mut self, context: C) {
        self.context = context;
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Consume the synchronizer, returning the callback context.
    pub fn into_context(self) -> C {
        self.context
    }

    /// Number of symbols handed to the callback per invocation.
    pub fn buf_len(&self) -> usize {
        self.buffer.capacity()
    }

    /// Symbols buffered but not yet delivered.
    pub fn buffered(&self) -> &[Complex<f32>] {
        self.buffer.as_slice()
    }

    /// Set the number of symbols handed to the callback per invocation.
    ///
    /// If more symbols than `buf_len` are already buffered, the callback is
    /// invoked immediately with as many full `buf_len` windows as possible;
    /// the rest stays buffered. Callback return values are ignored here: a
    /// reset in the middle of the flush would lose symbols already promised
    /// to the consumer.
    pub fn set_buf_len(&mut self, buf_len: usize) -> Result<()> {
        let callback = self.callback;
        let context = &mut self.context;
        let mut windows = 0usize;
        self.buffer.resize(buf_len, |window| {
            windows += 1;
            if let Some(cb) = callback {
                let _ = cb(window, context);
            }
        })?;
        if windows > 0 {
            trace!(buf_len, windows, "flushed output buffer on resize");
        }
        Ok(())
    }

    /// Immutable configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Preamble length in symbols.
    pub fn sequence_len(&self) -> usize {
        self.seq_len
    }

    /// Symbols produced since the last handoff (0 while detecting).
    pub fn symbol_counter(&self) -> u32 {
        match self.state {
            State::Detect => 0,
            State::Sync(t) => t.symbol_counter,
        }
    }

    /// Selected filter bank branch, if tracking.
    pub fn pfb_index(&self) -> Option<usize> {
        match self.state {
            State::Detect => None,
            State::Sync(t) => Some(t.pfb_index),
        }
    }

    /// Decimation counter, if tracking.
    pub fn mf_counter(&self) -> Option<i32> {
        match self.state {
            State::Detect => None,
            State::Sync(t) => Some(t.mf_counter),
        }
    }

    /// Carrier frequency and phase installed on the mixer at the last
    /// handoff, if tracking.
    pub fn carrier_offset(&self) -> Option<(f32, f32)> {
        match self.state {
            State::Detect => None,
            State::Sync(t) => Some((t.dphi, t.phi)),
        }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    pub fn filterbank(&self) -> &F {
        &self.mf
    }

    fn execute_detect(&mut self, x: Complex<f32>) {
        match self.detector.execute(x) {
            Some(window) => {
                self.replay.clear();
                self.replay.extend_from_slice(window);
            }
            None => return,
        }

        // the wrap below only covers one sample of timing offset
        let tau = self.detector.tau().clamp(-0.5, 0.5);
        let gamma = self.detector.gamma();
        let dphi = self.detector.dphi();
        let phi = self.detector.phi();

        let k = self.config.k as i32;
        let npfb = self.config.npfb as i32;

        // a branch left of zero is the last branch of the previous sample
        let mut mf_counter = k - 2;
        let mut index = (tau * npfb as f32).round() as i32;
        if index < 0 {
            mf_counter += 1;
            index += npfb;
        }
        let index = index.min(npfb - 1);

        debug!(
            tau,
            dphi,
            phi,
            gamma,
            mf_counter,
            pfb_index = index,
            "frame detected"
        );

        self.mf.set_scale(1.0 / (self.config.k as f32 * gamma));
        self.mixer.set_frequency(dphi);
        self.mixer.set_phase(phi);

        self.state = State::Sync(Tracking {
            mf_counter,
            pfb_index: index as usize,
            symbol_counter: 0,
            dphi,
            phi,
        });

        // samples the detector consumed while searching belong to the frame
        let replay = mem::take(&mut self.replay);
        self.execute(&replay);
        self.replay = replay;
    }

    fn step(&mut self, x: Complex<f32>) {
        let State::Sync(tracking) = &mut self.state else {
            return;
        };

        let v = self.mixer.mix_down(x);
        self.mixer.step();

        self.mf.push(v);
        let y = self.mf.execute(tracking.pfb_index);

        tracking.mf_counter += 1;
        if tracking.mf_counter < self.config.k as i32 - 1 {
            return;
        }
        tracking.mf_counter -= self.config.k as i32;

        // matched filter delay
        tracking.symbol_counter = tracking.symbol_counter.saturating_add(1);
        if tracking.symbol_counter <= 2 * self.config.m as u32 {
            return;
        }

        self.buf_append(y);
    }

    fn buf_append(&mut self, y: Complex<f32>) {
        let Some(window) = self.buffer.push(y) else {
            return;
        };
        trace!(len = window.len(), "delivering symbols");

        let action = match self.callback {
            Some(cb) => cb(window, &mut self.context),
            None => CallbackAction::Continue,
        };
        if action == CallbackAction::Reset {
            debug!("reset requested by callback");
            self.reset();
        }
    }
}

impl<C, D, M, F> fmt::Display for Synchronizer<C, D, M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<qdsync seq_len={} ftype={:?} k={} m={} beta={:.3} npfb={} buf_len={} state={}>",
            self.seq_len,
            self.config.filter_type,
            self.config.k,
            self.config.m,
            self.config.beta,
            self.config.npfb,
            self.buffer.capacity(),
            match self.state {
                State::Detect => "detect",
                State::Sync(_) => "sync",
            }
        )
    }
}
