//! Correlation-based preamble detector
//!
//! Looks for a known, pulse-shaped sequence in a stream of baseband samples
//! and, once found, estimates the impairments the synchronizer has to undo.
//!
//! # Design
//!
//! The detector keeps the most recent `n + 1` samples (`n` being the template
//! length) contiguous in a double-written ring, so the correlation window is
//! always a plain slice and no sample is ever copied per step.
//!
//! The template is split in two halves and correlated separately:
//!
//! ```text
//! r1 = sum x[i] * conj(s[i])        i in [0, h)
//! r2 = sum x[i] * conj(s[i])        i in [h, n)
//! rxy = (|r1| + |r2|) / sqrt(Ex * Es)
//! ```
//!
//! Combining the halves non-coherently keeps `rxy` high under a moderate
//! carrier offset, while the phase step between `r1` and `r2`, divided by
//! the distance between the energy centroids of the two halves, gives the
//! offset itself. `rxy` is in [0, 1] and reaches 1 on a noiseless,
//! offset-free, exactly aligned copy of the template.
//!
//! The first value above threshold arms a peak tracker. The peak is declared
//! on the first sample whose metric falls below the tracked maximum, and the
//! fractional timing offset comes from a parabola through the metric at the
//! peak and its two neighbours.

use num_complex::Complex;
use tracing::debug;

use super::firdes::{design_rnyquist, interp_linear, FilterType};
use super::FrameDetector;
use crate::error::{Error, Result};

const DEFAULT_THRESHOLD: f32 = 0.5;
const DEFAULT_RANGE: f32 = 0.3;

#[derive(Debug, Clone, Copy)]
struct Peak {
    rxy: f32,
    rxy_left: f32,
    r1: Complex<f32>,
    r2: Complex<f32>,
}

/// Preamble detector with carrier, phase, gain and timing estimation.
#[derive(Debug, Clone)]
pub struct QDetector {
    /// Expected preamble waveform
    template: Vec<Complex<f32>>,
    /// Length of the first template half
    half: usize,
    /// Template energy
    es: f32,
    /// Energy centroid of the first half, in samples
    centroid: f32,
    /// Distance between the energy centroids of the two halves, in samples
    lag: f32,

    /// Sample history, `2 * (n + 1)` long, written twice
    history: Vec<Complex<f32>>,
    /// Next write position in [0, n + 1)
    write: usize,
    /// Samples pushed since the last reset, saturating at n
    filled: usize,
    /// Window handed out on detection
    window: Vec<Complex<f32>>,

    threshold: f32,
    dphi_max: f32,

    rxy_prev: f32,
    peak: Option<Peak>,

    // estimates from the last detection
    rxy: f32,
    tau: f32,
    gamma: f32,
    dphi: f32,
    phi: f32,
}

impl QDetector {
    /// Create a detector for an arbitrary expected waveform.
    pub fn new(template: Vec<Complex<f32>>) -> Result<Self> {
        if template.len() < 2 {
            return Err(Error::config("detector template needs at least 2 samples"));
        }
        let es: f32 = template.iter().map(|s| s.norm_sqr()).sum();
        if es <= 0.0 {
            return Err(Error::config("detector template has no energy"));
        }

        let n = template.len();
        let half = n / 2;
        let centroid_of = |offset: usize, part: &[Complex<f32>]| -> Option<f32> {
            let energy: f32 = part.iter().map(|s| s.norm_sqr()).sum();
            let moment: f32 = part
                .iter()
                .enumerate()
                .map(|(i, s)| (offset + i) as f32 * s.norm_sqr())
                .sum();
            (energy > 0.0).then(|| moment / energy)
        };
        let (c1, c2) = match (
            centroid_of(0, &template[..half]),
            centroid_of(half, &template[half..]),
        ) {
            (Some(c1), Some(c2)) => (c1, c2),
            // one half is silent; fall back to the geometric centers
            _ => ((half as f32 - 1.0) / 2.0, (half + n - 1) as f32 / 2.0),
        };

        Ok(Self {
            half,
            es,
            centroid: c1,
            lag: c2 - c1,
            history: vec![Complex::new(0.0, 0.0); 2 * (n + 1)],
            write: 0,
            filled: 0,
            window: vec![Complex::new(0.0, 0.0); n + 1],
            threshold: DEFAULT_THRESHOLD,
            dphi_max: DEFAULT_RANGE,
            rxy_prev: 0.0,
            peak: None,
            rxy: 0.0,
            tau: 0.0,
            gamma: 0.0,
            dphi: 0.0,
            phi: 0.0,
            template,
        })
    }

    /// Create a detector for a linearly modulated symbol sequence.
    ///
    /// The template is the sequence interpolated at `k` samples/symbol with
    /// the given pulse shape, `k * (sequence.len() + 2m)` samples long so it
    /// includes the filter ramp-down.
    ///
    /// # Arguments
    ///
    /// * `sequence` - Preamble symbols
    /// * `ftype` - Pulse shape
    /// * `k` - Samples per symbol
    /// * `m` - Filter semi-length in symbols
    /// * `beta` - Excess bandwidth factor
    pub fn create_linear(
        sequence: &[Complex<f32>],
        ftype: FilterType,
        k: usize,
        m: usize,
        beta: f32,
    ) -> Result<Self> {
        if sequence.is_empty() {
            return Err(Error::config("sequence length cannot be zero"));
        }
        let h = design_rnyquist(ftype, k, m, beta)?;
        let n = k * (sequence.len() + 2 * m);
        Self::new(interp_linear(sequence, &h, k, n))
    }

    /// Expected preamble waveform.
    pub fn template(&self) -> &[Complex<f32>] {
        &self.template
    }

    /// Number of samples in a detection window (template length + 1).
    pub fn window_len(&self) -> usize {
        self.template.len() + 1
    }

    fn push(&mut self, x: Complex<f32>) {
        let len = self.window_len();
        self.history[self.write] = x;
        self.history[self.write + len] = x;
        self.write = (self.write + 1) % len;
        if self.filled < self.template.len() {
            self.filled += 1;
        }
    }

    /// Correlate the latest `n` samples against the template.
    fn correlate(&self) -> (f32, Complex<f32>, Complex<f32>) {
        let len = self.window_len();
        let recent = &self.history[self.write + 1..self.write + len];
        let (x1, x2) = recent.split_at(self.half);
        let (s1, s2) = self.template.split_at(self.half);

        let dot = |x: &[Complex<f32>], s: &[Complex<f32>]| -> Complex<f32> {
            x.iter().zip(s).map(|(a, b)| a * b.conj()).sum()
        };
        let r1 = dot(x1, s1);
        let r2 = dot(x2, s2);
        let ex: f32 = recent.iter().map(|x| x.norm_sqr()).sum();

        let rxy = if ex > 0.0 {
            (r1.norm() + r2.norm()) / (ex * self.es).sqrt()
        } else {
            0.0
        };
        (rxy, r1, r2)
    }

    fn estimate(&mut self, peak: Peak, rxy_right: f32) {
        let (y0, y1, y2) = (peak.rxy_left, peak.rxy, rxy_right);
        let denom = y0 - 2.0 * y1 + y2;
        self.tau = if denom < -1e-9 {
            (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        self.rxy = peak.rxy;
        self.gamma = (peak.r1.norm() + peak.r2.norm()) / self.es;

        self.dphi =
            ((peak.r2 * peak.r1.conj()).arg() / self.lag).clamp(-self.dphi_max, self.dphi_max);
        self.phi = peak.r1.arg() - self.dphi * self.centroid;
    }

    fn rearm(&mut self) {
        self.filled = 0;
        self.peak = None;
        self.rxy_prev = 0.0;
    }
}

impl FrameDetector for QDetector {
    fn execute(&mut self, x: Complex<f32>) -> Option<&[Complex<f32>]> {
        self.push(x);
        if self.filled < self.template.len() {
            return None;
        }

        let (rxy, r1, r2) = self.correlate();
        let rxy_left = self.rxy_prev;
        self.rxy_prev = rxy;

        match self.peak {
            Some(peak) if rxy <= peak.rxy => {
                self.estimate(peak, rxy);
                debug!(
                    rxy = self.rxy,
                    tau = self.tau,
                    gamma = self.gamma,
                    dphi = self.dphi,
                    phi = self.phi,
                    "preamble detected"
                );

                let len = self.window_len();
                self.window
                    .copy_from_slice(&self.history[self.write..self.write + len]);
                self.rearm();
                Some(self.window.as_slice())
            }
            Some(_) => {
                self.peak = Some(Peak { rxy, rxy_left, r1, r2 });
                None
            }
            None => {
                if rxy > self.threshold {
                    self.peak = Some(Peak { rxy, rxy_left, r1, r2 });
                }
                None
            }
        }
    }

    fn reset(&mut self) {
        self.history.fill(Complex::new(0.0, 0.0));
        self.write = 0;
        self.rearm();
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f32) -> Result<()> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(Error::config(format!(
                "threshold ({threshold}) must be in (0, 1]"
            )));
        }
        self.threshold = threshold;
        Ok(())
    }

    fn range(&self) -> f32 {
        self.dphi_max
    }

    fn set_range(&mut self, dphi_max: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&dphi_max) {
            return Err(Error::config(format!(
                "carrier offset search range ({dphi_max}) must be in [0, 1]"
            )));
        }
        self.dphi_max = dphi_max;
        Ok(())
    }

    fn rxy(&self) -> f32 {
        self.rxy
    }

    fn tau(&self) -> f32 {
        self.tau
    }

    fn gamma(&self) -> f32 {
        self.gamma
    }

    fn dphi(&self) -> f32 {
        self.dphi
    }

    fn phi(&self) -> f32 {
        self.phi
    }
}
