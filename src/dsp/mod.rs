/// Digital Signal Processing (DSP) building blocks used by the synchronizer.
///
/// The synchronizer drives three collaborators, each behind a trait so it can
/// be replaced (for example by a mock in tests, or a detector tuned for a
/// particular preamble):
///
/// ```text
///              ┌──────────────┐ window + estimates
/// samples ──►  │FrameDetector │ ───────────────┐
///   (DETECT)   └──────────────┘                ▼
///   (SYNC) ──► CarrierMixer ──► TimingFilterBank ──► decimate ──► symbols
/// ```
///
/// # Modules
///
/// - [`nco`]: Numerically controlled oscillator ([`CarrierMixer`])
/// - [`firpfb`]: Polyphase matched filter bank ([`TimingFilterBank`])
/// - [`qdetector`]: Correlation-based preamble detector ([`FrameDetector`])
/// - [`firdes`]: Pulse-shaping filter design
///
/// # Thread Safety
///
/// DSP blocks maintain internal state and are **not** synchronized. Each
/// thread should own its own instances.
use num_complex::Complex;

use crate::error::Result;

pub mod firdes;
pub mod firpfb;
pub mod nco;
pub mod qdetector;

/// Preamble detector feeding the synchronizer.
///
/// Estimates are only meaningful once [`FrameDetector::execute`] has returned
/// a window; before that they hold whatever the previous detection left.
pub trait FrameDetector {
    /// Push one sample.
    ///
    /// Returns the buffered window of samples starting at the detected
    /// preamble when a frame is found, `None` otherwise. The detector re-arms
    /// itself after returning a window.
    fn execute(&mut self, x: Complex<f32>) -> Option<&[Complex<f32>]>;

    /// Drop all buffered samples and restart the search.
    fn reset(&mut self);

    /// Detection threshold.
    fn threshold(&self) -> f32;

    /// Set the detection threshold.
    fn set_threshold(&mut self, threshold: f32) -> Result<()>;

    /// Carrier offset search range (radians/sample).
    fn range(&self) -> f32;

    /// Set the carrier offset search range (radians/sample).
    fn set_range(&mut self, dphi_max: f32) -> Result<()>;

    /// Correlator output at the last detection.
    fn rxy(&self) -> f32;

    /// Fractional timing offset estimate, in samples.
    fn tau(&self) -> f32;

    /// Channel gain estimate.
    fn gamma(&self) -> f32;

    /// Carrier frequency offset estimate (radians/sample).
    fn dphi(&self) -> f32;

    /// Carrier phase offset estimate (radians).
    fn phi(&self) -> f32;
}

/// Carrier mixer removing a frequency/phase offset.
pub trait CarrierMixer {
    fn set_frequency(&mut self, frequency: f32);
    fn set_phase(&mut self, phase: f32);
    fn frequency(&self) -> f32;
    fn phase(&self) -> f32;

    /// Rotate `x` by the negative of the current phase.
    fn mix_down(&self, x: Complex<f32>) -> Complex<f32>;

    /// Advance the phase by one sample.
    fn step(&mut self);

    fn reset(&mut self);
}

/// Bank of fractional-delay matched filters sharing one input history.
pub trait TimingFilterBank {
    fn push(&mut self, x: Complex<f32>);

    /// Filter the history with branch `index` and apply the output scale.
    fn execute(&self, index: usize) -> Complex<f32>;

    fn set_scale(&mut self, scale: f32);
    fn scale(&self) -> f32;

    /// Clear the input history.
    fn reset(&mut self);

    /// Number of branches.
    fn num_filters(&self) -> usize;
}
