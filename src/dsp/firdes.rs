//! Pulse-shaping filter design
//!
//! Square-root Nyquist prototypes for the transmit side (used to build the
//! detector template) and the receive side (matched filter bank).
//!
//! Coefficients follow liquid-dsp's `liquid_firdes_rrcos()`: the filter spans
//! `2*k*m + 1` taps, is centered on tap `k*m`, and is *not* normalized. Its
//! energy is roughly `k`, which is why the synchronizer scales matched-filter
//! output by `1/k`.

use std::f32::consts::PI;

use num_complex::Complex;

use crate::error::{Error, Result};

/// Pulse shape used on both ends of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FilterType {
    /// Root-raised-cosine
    #[default]
    Rrc,
    /// Rectangular pulse, one symbol wide (`beta` is ignored)
    Rect,
}

/// Design a square-root Nyquist filter with `2*k*m + 1` taps.
///
/// # Arguments
///
/// * `ftype` - Pulse shape
/// * `k` - Samples per symbol
/// * `m` - Filter semi-length in symbols
/// * `beta` - Excess bandwidth factor in (0, 1]
pub fn design_rnyquist(ftype: FilterType, k: usize, m: usize, beta: f32) -> Result<Vec<f32>> {
    if k == 0 {
        return Err(Error::config("samples per symbol must be greater than 0"));
    }
    if m == 0 {
        return Err(Error::config("filter semi-length must be greater than 0"));
    }
    if !(beta > 0.0 && beta <= 1.0) {
        return Err(Error::config(format!(
            "excess bandwidth factor ({beta}) must be in (0, 1]"
        )));
    }

    Ok(match ftype {
        FilterType::Rrc => design_rrc_filter(k, m, beta),
        FilterType::Rect => design_rect_filter(k, m),
    })
}

/// Root-raised-cosine filter design.
fn design_rrc_filter(k: usize, m: usize, beta: f32) -> Vec<f32> {
    let h_len = 2 * k * m + 1;
    let mut h = vec![0.0f32; h_len];

    let kf = k as f32;
    let mf = m as f32;

    for (n, coef) in h.iter_mut().enumerate() {
        let nf = n as f32;
        // normalized time in symbol periods, centered at m
        let z = nf / kf - mf;

        if z.abs() < 1e-5 {
            *coef = 1.0 - beta + 4.0 * beta / PI;
        } else {
            let g = 1.0 - 16.0 * beta * beta * z * z;
            let g_squared = g * g;

            // 16*beta^2*z^2 == 1
            if g_squared < 1e-5 {
                let g1 = 1.0 + 2.0 / PI;
                let g2 = (0.25 * PI / beta).sin();
                let g3 = 1.0 - 2.0 / PI;
                let g4 = (0.25 * PI / beta).cos();
                *coef = beta / 2.0_f32.sqrt() * (g1 * g2 + g3 * g4);
            } else {
                let t1 = ((1.0 + beta) * PI * z).cos();
                let t2 = ((1.0 - beta) * PI * z).sin();
                let t3 = 1.0 / (4.0 * beta * z);
                let t4 = 4.0 * beta / (PI * g);
                *coef = t4 * (t1 + t2 * t3);
            }
        }
    }

    h
}

/// Rectangular pulse of `k` unit taps centered on tap `k*m`.
fn design_rect_filter(k: usize, m: usize) -> Vec<f32> {
    let h_len = 2 * k * m + 1;
    let center = (k * m) as f32;
    let half = k as f32 / 2.0;
    (0..h_len)
        .map(|n| {
            let d = n as f32 - center;
            if d >= -half && d < half {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Interpolate a symbol sequence with the pulse `h` at `k` samples/symbol.
///
/// Returns the first `len` samples of the full convolution; symbols beyond
/// the end of `symbols` are treated as zero so the filter tail is flushed.
pub fn interp_linear(
    symbols: &[Complex<f32>],
    h: &[f32],
    k: usize,
    len: usize,
) -> Vec<Complex<f32>> {
    let mut y = vec![Complex::new(0.0, 0.0); len];
    for (i, &sym) in symbols.iter().enumerate() {
        let start = i * k;
        if start >= len {
            break;
        }
        for (out, &coef) in y[start..].iter_mut().zip(h) {
            *out += sym * coef;
        }
    }
    y
}
