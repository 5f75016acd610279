//! Polyphase matched filter bank
//!
//! A bank of `npfb` fractional-delay versions of the receive matched filter.
//! Branch `b` samples the matched-filter output `b/npfb` of a sample later
//! than branch 0, which lets the synchronizer correct a fractional timing
//! offset by picking a branch instead of interpolating.
//!
//! # Design
//!
//! The implementation follows liquid-dsp's `firpfb_crcf` design:
//! - The prototype is designed at `k*npfb` samples/symbol
//! - Prototype tap `i` goes to branch `i % npfb`, position `i / npfb`
//! - All branches share one input history
//! - Output is multiplied by a programmable scale
//!
//! # Example
//!
//! ```
//! use num_complex::Complex;
//! use qdsync::dsp::firdes::FilterType;
//! use qdsync::dsp::firpfb::FirPfb;
//!
//! let mut pfb = FirPfb::create_rnyquist(FilterType::Rrc, 32, 2, 3, 0.3).unwrap();
//! pfb.set_scale(0.5);
//! pfb.push(Complex::new(1.0, 0.0));
//! let y = pfb.execute(16);
//! # let _ = y;
//! ```

use num_complex::Complex;

use super::firdes::{design_rnyquist, FilterType};
use super::TimingFilterBank;
use crate::error::{Error, Result};

/// Polyphase filter bank with complex input/output and real coefficients.
#[derive(Debug, Clone)]
pub struct FirPfb {
    /// Number of filter phases
    npfb: usize,
    /// Sub-filter length
    h_sub_len: usize,
    /// Filter coefficients [npfb][h_sub_len]
    filters: Vec<Vec<f32>>,
    /// Input history (ring buffer)
    buffer: Vec<Complex<f32>>,
    /// Write index into buffer
    buf_idx: usize,
    /// Output scale
    scale: f32,
}

impl FirPfb {
    /// Create a filter bank from a prototype filter.
    pub fn new(h: &[f32], npfb: usize) -> Result<Self> {
        if npfb == 0 {
            return Err(Error::config("number of filter phases must be greater than 0"));
        }
        if h.is_empty() {
            return Err(Error::config("prototype filter cannot be empty"));
        }

        let h_sub_len = h.len().div_ceil(npfb);

        let mut filters = vec![vec![0.0f32; h_sub_len]; npfb];
        for (i, &coef) in h.iter().enumerate() {
            filters[i % npfb][i / npfb] = coef;
        }

        Ok(Self {
            npfb,
            h_sub_len,
            filters,
            buffer: vec![Complex::new(0.0, 0.0); h_sub_len],
            buf_idx: 0,
            scale: 1.0,
        })
    }

    /// Create a bank of square-root Nyquist matched filters.
    ///
    /// # Arguments
    ///
    /// * `ftype` - Pulse shape
    /// * `npfb` - Number of filter phases (e.g. 256)
    /// * `k` - Samples per symbol
    /// * `m` - Filter semi-length in symbols
    /// * `beta` - Excess bandwidth factor
    pub fn create_rnyquist(
        ftype: FilterType,
        npfb: usize,
        k: usize,
        m: usize,
        beta: f32,
    ) -> Result<Self> {
        if npfb == 0 {
            return Err(Error::config("number of filter phases must be greater than 0"));
        }
        let h = design_rnyquist(ftype, k * npfb, m, beta)?;
        Self::new(&h, npfb)
    }

    /// Number of filter phases.
    pub fn num_filters(&self) -> usize {
        self.npfb
    }

    /// Length of each branch.
    pub fn sub_len(&self) -> usize {
        self.h_sub_len
    }

    /// Output scale.
    pub fn get_scale(&self) -> f32 {
        self.scale
    }

    /// Set the output scale.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Push a new sample into the shared history.
    pub fn push(&mut self, x: Complex<f32>) {
        self.buffer[self.buf_idx] = x;
        self.buf_idx = (self.buf_idx + 1) % self.h_sub_len;
    }

    /// Execute the filter at the given phase index.
    ///
    /// Indices past the last phase use the last phase.
    pub fn execute(&self, phase: usize) -> Complex<f32> {
        let filter = &self.filters[phase.min(self.npfb - 1)];
        let mut sum = Complex::new(0.0f32, 0.0);

        for (j, &coef) in filter.iter().enumerate() {
            // newest sample first (convolution)
            let idx = (self.buf_idx + self.h_sub_len - 1 - j) % self.h_sub_len;
            sum += self.buffer[idx] * coef;
        }

        sum * self.scale
    }

    /// Clear the filter history. The scale is kept.
    pub fn reset(&mut self) {
        self.buffer.fill(Complex::new(0.0, 0.0));
        self.buf_idx = 0;
    }
}

impl TimingFilterBank for FirPfb {
    fn push(&mut self, x: Complex<f32>) {
        FirPfb::push(self, x);
    }

    fn execute(&self, index: usize) -> Complex<f32> {
        FirPfb::execute(self, index)
    }

    fn set_scale(&mut self, scale: f32) {
        FirPfb::set_scale(self, scale);
    }

    fn scale(&self) -> f32 {
        self.get_scale()
    }

    fn reset(&mut self) {
        FirPfb::reset(self);
    }

    fn num_filters(&self) -> usize {
        FirPfb::num_filters(self)
    }
}
