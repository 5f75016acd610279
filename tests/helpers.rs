//! Test helper utilities for generating synthetic framed baseband signals

#![allow(dead_code)]

use num_complex::Complex;
use qdsync::dsp::firdes::{design_rnyquist, interp_linear};
use qdsync::SyncConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Generate a BPSK symbol sequence from a 7-bit maximal-length LFSR
///
/// # Arguments
/// * `seed` - Initial register state (low 7 bits, must be non-zero)
/// * `num_symbols` - Number of symbols to generate
///
/// # Returns
/// Vector of symbols at +1 or -1 on the real axis
pub fn bpsk_sequence(seed: u8, num_symbols: usize) -> Vec<Complex<f32>> {
    let mut state = seed & 0x7f;
    assert_ne!(state, 0, "LFSR seed must be non-zero");

    (0..num_symbols)
        .map(|_| {
            state = ((state << 1) | (((state >> 6) ^ (state >> 5)) & 1)) & 0x7f;
            Complex::new(if state & 1 == 1 { 1.0 } else { -1.0 }, 0.0)
        })
        .collect()
}

/// Pulse-shape a symbol sequence with the filter described by `config`
///
/// # Returns
/// `k * (symbols.len() + 2m)` samples, so the tail of the last pulse is included
pub fn modulate(symbols: &[Complex<f32>], config: &SyncConfig) -> Vec<Complex<f32>> {
    let h = design_rnyquist(config.filter_type, config.k, config.m, config.beta)
        .expect("valid filter parameters");
    let len = config.k * (symbols.len() + 2 * config.m);
    interp_linear(symbols, &h, config.k, len)
}

/// Pulse-shape a symbol sequence and sample it off the integer grid
///
/// The pulse is designed at `k * oversample` samples/symbol and output
/// sample `n` is taken at time `n + advance / oversample`.
///
/// # Returns
/// `k * (symbols.len() + 2m)` samples
pub fn modulate_fractional(
    symbols: &[Complex<f32>],
    config: &SyncConfig,
    oversample: usize,
    advance: usize,
) -> Vec<Complex<f32>> {
    let h = design_rnyquist(config.filter_type, config.k * oversample, config.m, config.beta)
        .expect("valid filter parameters");
    let step = config.k * oversample;
    let len = config.k * (symbols.len() + 2 * config.m);

    (0..len)
        .map(|n| {
            let t = n * oversample + advance;
            symbols
                .iter()
                .enumerate()
                .filter_map(|(s, &sym)| {
                    let offset = t.checked_sub(s * step)?;
                    h.get(offset).map(|&c| sym * c)
                })
                .sum()
        })
        .collect()
}

/// Channel impairments applied by [`apply_channel`]
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub gain: f32,
    /// Carrier frequency offset in radians/sample
    pub dphi: f32,
    /// Carrier phase at the first sample, in radians
    pub phi: f32,
    /// Standard deviation of the complex Gaussian noise (per component)
    pub noise_std: f32,
    pub seed: u64,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            gain: 1.0,
            dphi: 0.0,
            phi: 0.0,
            noise_std: 0.0,
            seed: 1,
        }
    }
}

/// Apply gain, carrier offset and additive noise to a signal
pub fn apply_channel(signal: &[Complex<f32>], channel: &Channel) -> Vec<Complex<f32>> {
    let mut rng = StdRng::seed_from_u64(channel.seed);
    let noise = Normal::new(0.0f32, channel.noise_std.max(f32::MIN_POSITIVE))
        .expect("valid noise deviation");

    signal
        .iter()
        .enumerate()
        .map(|(n, &x)| {
            let theta = channel.phi + channel.dphi * n as f32;
            let mut y = x * Complex::from_polar(channel.gain, theta);
            if channel.noise_std > 0.0 {
                y += Complex::new(noise.sample(&mut rng), noise.sample(&mut rng));
            }
            y
        })
        .collect()
}

/// Build a transmission: `lead` zero samples, the modulated frame, then `tail` zero samples
pub fn transmission(
    symbols: &[Complex<f32>],
    config: &SyncConfig,
    lead: usize,
    tail: usize,
) -> Vec<Complex<f32>> {
    let zero = Complex::new(0.0, 0.0);
    let mut signal = vec![zero; lead];
    signal.extend(modulate(symbols, config));
    signal.extend(vec![zero; tail]);
    signal
}

/// Install a test-friendly tracing subscriber, honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpsk_sequence_is_balanced() {
        let symbols = bpsk_sequence(0x2d, 127);
        let ones = symbols.iter().filter(|s| s.re > 0.0).count();
        // a full m-sequence period has one more 1 than 0
        assert_eq!(ones, 64);
    }

    #[test]
    fn test_modulate_length() {
        let config = SyncConfig::default();
        let symbols = bpsk_sequence(0x2d, 20);
        let signal = modulate(&symbols, &config);
        assert_eq!(signal.len(), config.k * (20 + 2 * config.m));
    }

    #[test]
    fn test_channel_gain_and_phase() {
        let signal = vec![Complex::new(1.0, 0.0); 4];
        let channel = Channel {
            gain: 0.5,
            phi: std::f32::consts::FRAC_PI_2,
            ..Channel::default()
        };
        let out = apply_channel(&signal, &channel);
        assert!(out[0].re.abs() < 1e-6);
        assert!((out[0].im - 0.5).abs() < 1e-6);
    }
}
