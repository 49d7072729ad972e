// src/analysis/filter.rs
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterKind {
    Notch { freq_hz: f64, q: f64 },
    Highpass { cutoff_hz: f64, q: f64 },
    Lowpass { cutoff_hz: f64, q: f64 },
}

/// Pre-filter applied to every channel before spectral estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefilter {
    pub highpass_hz: Option<f64>,
    pub lowpass_hz: Option<f64>,
    /// Mains notch, e.g. 50 or 60 Hz.
    pub notch_hz: Option<f64>,
}

impl Default for Prefilter {
    fn default() -> Self {
        Self {
            highpass_hz: Some(1.0),
            lowpass_hz: Some(50.0),
            notch_hz: None,
        }
    }
}

impl Prefilter {
    pub fn kinds(&self) -> Vec<FilterKind> {
        let mut kinds = Vec::new();
        if let Some(cutoff_hz) = self.highpass_hz {
            kinds.push(FilterKind::Highpass {
                cutoff_hz,
                q: FRAC_1_SQRT_2,
            });
        }
        if let Some(cutoff_hz) = self.lowpass_hz {
            kinds.push(FilterKind::Lowpass {
                cutoff_hz,
                q: FRAC_1_SQRT_2,
            });
        }
        if let Some(freq_hz) = self.notch_hz {
            kinds.push(FilterKind::Notch { freq_hz, q: 30.0 });
        }
        kinds
    }
}

#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}

/// Cascade of biquad sections. State starts at zero for every channel.
#[derive(Clone, Default, Debug)]
pub struct FilterChain {
    sections: Vec<BiquadFilter>,
}

impl FilterChain {
    pub fn from_kinds(sample_rate_hz: f64, kinds: &[FilterKind]) -> Self {
        let sections = kinds
            .iter()
            .map(|kind| BiquadFilter::new(design(sample_rate_hz, *kind)))
            .collect();
        Self { sections }
    }
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
    pub fn process_sample(&mut self, mut value: f64) -> f64 {
        for section in &mut self.sections {
            value = section.process(value);
        }
        value
    }
    /// Filters a whole channel with a fresh copy of the chain.
    pub fn apply(&self, channel: &[f64]) -> Vec<f64> {
        let mut chain = self.clone();
        channel.iter().map(|&v| chain.process_sample(v)).collect()
    }
}

fn design(sample_rate_hz: f64, kind: FilterKind) -> BiquadCoeffs {
    let nyquist = sample_rate_hz * 0.5;
    match kind {
        FilterKind::Notch { freq_hz, q } => notch(nyquist_clamp(freq_hz, nyquist), sample_rate_hz, q),
        FilterKind::Highpass { cutoff_hz, q } => {
            highpass(nyquist_clamp(cutoff_hz, nyquist), sample_rate_hz, q)
        }
        FilterKind::Lowpass { cutoff_hz, q } => {
            lowpass(nyquist_clamp(cutoff_hz, nyquist), sample_rate_hz, q)
        }
    }
}

fn nyquist_clamp(freq_hz: f64, nyquist: f64) -> f64 {
    freq_hz.clamp(0.01, (nyquist - 0.01).max(0.01))
}

fn lowpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 - cos_w0) * 0.5;
    let b1 = 1.0 - cos_w0;
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}

fn highpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 + cos_w0) * 0.5;
    let b1 = -(1.0 + cos_w0);
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}

fn notch(center_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * center_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = 1.0;
    let b1 = -2.0 * cos_w0;
    let b2 = 1.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}

fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadCoeffs {
    let a0_inv = 1.0 / a0;
    BiquadCoeffs {
        b0: b0 * a0_inv,
        b1: b1 * a0_inv,
        b2: b2 * a0_inv,
        a1: a1 * a0_inv,
        a2: a2 * a0_inv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
    }

    fn sine(freq_hz: f64, rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn highpass_removes_dc() {
        let chain = FilterChain::from_kinds(
            250.0,
            &[FilterKind::Highpass {
                cutoff_hz: 1.0,
                q: FRAC_1_SQRT_2,
            }],
        );
        let out = chain.apply(&vec![5.0; 5000]);
        assert!(out[4999].abs() < 1e-3);
    }

    #[test]
    fn lowpass_attenuates_above_cutoff() {
        let chain = FilterChain::from_kinds(
            250.0,
            &[FilterKind::Lowpass {
                cutoff_hz: 20.0,
                q: FRAC_1_SQRT_2,
            }],
        );
        let passed = chain.apply(&sine(5.0, 250.0, 2500));
        let blocked = chain.apply(&sine(100.0, 250.0, 2500));
        assert!(rms(&passed[500..]) > 0.6);
        assert!(rms(&blocked[500..]) < 0.1);
    }

    #[test]
    fn apply_does_not_leak_state_between_channels() {
        let chain = FilterChain::from_kinds(128.0, &Prefilter::default().kinds());
        let a = chain.apply(&sine(10.0, 128.0, 256));
        let b = chain.apply(&sine(10.0, 128.0, 256));
        assert_eq!(a, b);
    }

    #[test]
    fn default_prefilter_is_one_to_fifty_hz() {
        let kinds = Prefilter::default().kinds();
        assert_eq!(kinds.len(), 2);
        assert!(matches!(kinds[0], FilterKind::Highpass { cutoff_hz, .. } if cutoff_hz == 1.0));
        assert!(matches!(kinds[1], FilterKind::Lowpass { cutoff_hz, .. } if cutoff_hz == 50.0));
    }
}
