//! Numerically Controlled Oscillator (NCO)
//!
//! Carrier mixer used by the synchronizer to remove the carrier frequency and
//! phase offsets estimated by the detector.
//!
//! # Design
//!
//! The implementation follows liquid-dsp's `nco_crcf` design:
//! - Phase is in radians, wrapped to [0, 2*PI)
//! - Frequency is in radians per sample
//! - Phase and frequency are kept in `f64` so long runs do not accumulate
//!   rounding error
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use qdsync::dsp::nco::Nco;
//!
//! let mut nco = Nco::new(0.1);
//! nco.set_phase(0.5);
//!
//! let baseband = nco.mix_down(Complex::new(1.0, 0.0));
//! nco.step();
//! # let _ = baseband;
//! ```

use std::f64::consts::TAU;

use num_complex::Complex;

use super::CarrierMixer;

/// Numerically Controlled Oscillator.
#[derive(Debug, Clone, Default)]
pub struct Nco {
    /// Current phase in radians [0, 2*PI)
    phase: f64,

    /// Frequency in radians per sample
    frequency: f64,
}

impl Nco {
    /// Create a new NCO at the given frequency (radians per sample).
    pub fn new(frequency: f32) -> Self {
        Self {
            phase: 0.0,
            frequency: frequency as f64,
        }
    }

    /// Get the current phase in radians [0, 2*PI).
    pub fn get_phase(&self) -> f32 {
        self.phase as f32
    }

    /// Set the phase in radians; wrapped to [0, 2*PI).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap(phase as f64);
    }

    /// Get the current frequency in radians per sample.
    pub fn get_frequency(&self) -> f32 {
        self.frequency as f32
    }

    /// Set the frequency in radians per sample.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency as f64;
    }

    /// Get the current complex phasor exp(j * phase).
    pub fn get_complex(&self) -> Complex<f32> {
        Complex::from_polar(1.0, self.phase as f32)
    }

    /// Step the NCO phase forward by one sample.
    pub fn step(&mut self) {
        self.phase += self.frequency;
        if self.phase >= TAU || self.phase < 0.0 {
            self.phase = wrap(self.phase);
        }
    }

    /// Mix a complex sample down: `x * exp(-j * phase)`.
    pub fn mix_down(&self, x: Complex<f32>) -> Complex<f32> {
        x * self.get_complex().conj()
    }

    /// Reset the NCO phase to 0, retaining the current frequency.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

fn wrap(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

impl CarrierMixer for Nco {
    fn set_frequency(&mut self, frequency: f32) {
        Nco::set_frequency(self, frequency);
    }

    fn set_phase(&mut self, phase: f32) {
        Nco::set_phase(self, phase);
    }

    fn frequency(&self) -> f32 {
        self.get_frequency()
    }

    fn phase(&self) -> f32 {
        self.get_phase()
    }

    fn mix_down(&self, x: Complex<f32>) -> Complex<f32> {
        Nco::mix_down(self, x)
    }

    fn step(&mut self) {
        Nco::step(self);
    }

    fn reset(&mut self) {
        Nco::reset(self);
    }
}
