// src/analysis/spectrum.rs
use std::borrow::Cow;
use std::f64::consts::PI;

use log::debug;
use ndarray::{Array1, Array2, Axis};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::analysis::filter::{FilterChain, Prefilter};
use crate::analysis::{RawSignal, ScreeningError};
use crate::config::ScreeningConfig;

/// How the Welch segment length is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SegmentPolicy {
    /// Fit `cycles` periods of the lowest band edge into one segment.
    Auto { cycles: f64 },
    /// Explicit segment length in seconds.
    Fixed { window_seconds: f64 },
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        SegmentPolicy::Auto { cycles: 2.0 }
    }
}

/// Taper applied to each segment before its FFT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Rectangular,
}

impl WindowKind {
    /// Periodic (DFT-even) window coefficients of length `len`.
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / len as f64;
                match self {
                    WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowKind::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// One-sided power spectral density restricted to `[fmin, fmax]`.
///
/// Built only through the validating constructors, so frequencies are ascending and
/// every power row has one value per frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralEstimate {
    sampling_rate_hz: f64,
    frequencies_hz: Vec<f64>,
    // channel average, one value per frequency
    power: Vec<f64>,
    channel_power: Array2<f64>, // channel -> bins
    resolution_hz: f64,
    segment_length: usize,
    segment_count: usize,
}

impl SpectralEstimate {
    /// Wraps an already-averaged spectrum, e.g. one produced outside the core.
    pub fn from_spectrum(
        frequencies_hz: Vec<f64>,
        power: Vec<f64>,
        resolution_hz: f64,
    ) -> Result<Self, ScreeningError> {
        let channel_power = Array2::from_shape_vec((1, power.len()), power)
            .map_err(|e| ScreeningError::invalid_input(e.to_string()))?;
        Self::from_channels(frequencies_hz, channel_power, 0.0, resolution_hz, 0, 0)
    }

    /// Builds an estimate from one power row per channel; the average is computed here.
    pub fn from_channels(
        frequencies_hz: Vec<f64>,
        channel_power: Array2<f64>,
        sampling_rate_hz: f64,
        resolution_hz: f64,
        segment_length: usize,
        segment_count: usize,
    ) -> Result<Self, ScreeningError> {
        if channel_power.nrows() == 0 {
            return Err(ScreeningError::invalid_input("spectrum has no channel rows"));
        }
        if frequencies_hz.len() != channel_power.ncols() {
            return Err(ScreeningError::invalid_input(format!(
                "{} frequencies but {} power values per channel",
                frequencies_hz.len(),
                channel_power.ncols()
            )));
        }
        if frequencies_hz.windows(2).any(|w| w[1] <= w[0])
            || frequencies_hz.iter().any(|f| !f.is_finite() || *f < 0.0)
        {
            return Err(ScreeningError::invalid_input(
                "frequencies must be non-negative and strictly ascending",
            ));
        }
        if channel_power.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ScreeningError::invalid_input(
                "power values must be finite and non-negative",
            ));
        }
        if !(resolution_hz.is_finite() && resolution_hz >= 0.0) {
            return Err(ScreeningError::invalid_input(format!(
                "frequency resolution must be finite, got {resolution_hz}"
            )));
        }
        // Reduce: sum over channels, then a single division.
        let power = (channel_power.sum_axis(Axis(0)) / channel_power.nrows() as f64).to_vec();
        Ok(Self {
            sampling_rate_hz,
            frequencies_hz,
            power,
            channel_power,
            resolution_hz,
            segment_length,
            segment_count,
        })
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn frequencies_hz(&self) -> &[f64] {
        &self.frequencies_hz
    }

    /// Channel-averaged power, aligned with [`Self::frequencies_hz`].
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn channel_power(&self) -> &Array2<f64> {
        &self.channel_power
    }

    pub fn resolution_hz(&self) -> f64 {
        self.resolution_hz
    }

    pub fn segment_length(&self) -> usize {
        self.segment_length
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn channel_count(&self) -> usize {
        self.channel_power.nrows()
    }

    /// Width the trapezoidal rule gives bin `index`: half the distance to each
    /// neighbour, so an edge bin only gets the inner half.
    pub fn bin_width_hz(&self, index: usize) -> f64 {
        let freqs = &self.frequencies_hz;
        let Some(&f) = freqs.get(index) else {
            return 0.0;
        };
        let below = index.checked_sub(1).map_or(0.0, |i| f - freqs[i]);
        let above = freqs.get(index + 1).map_or(0.0, |&next| next - f);
        (below + above) * 0.5
    }

    /// Trapezoidal integral of the averaged spectrum over every kept bin.
    pub fn total_power(&self) -> f64 {
        trapezoid(&self.frequencies_hz, &self.power)
    }

    /// Frequency of the largest averaged power value.
    pub fn peak_frequency_hz(&self) -> Option<f64> {
        self.power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies_hz[i])
    }
}

/// Trapezoidal rule over paired samples. Fewer than two points integrate to `+0.0`.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .fold(0.0, |acc, (xs, ys)| acc + (xs[1] - xs[0]) * (ys[0] + ys[1]) * 0.5)
}

/// Strategy for turning a recording into one representative spectrum.
pub trait SpectralEstimator {
    fn estimate(&self, signal: &RawSignal) -> Result<SpectralEstimate, ScreeningError>;
}

/// Welch's method: 50% overlapping, windowed, mean-detrended segments.
#[derive(Clone, Debug)]
pub struct WelchEstimator {
    fmin_hz: f64,
    fmax_hz: f64,
    segment: SegmentPolicy,
    window: WindowKind,
    prefilter: Option<Prefilter>,
    lowest_edge_hz: f64,
}

impl WelchEstimator {
    pub fn from_config(config: &ScreeningConfig) -> Self {
        Self {
            fmin_hz: config.spectral.fmin_hz,
            fmax_hz: config.spectral.fmax_hz,
            segment: config.spectral.segment,
            window: config.spectral.window,
            prefilter: config.spectral.prefilter,
            lowest_edge_hz: config.bands.lowest_edge_hz().unwrap_or(config.spectral.fmin_hz),
        }
    }

    /// Segment length in samples for the given rate.
    pub fn segment_length(&self, sampling_rate_hz: f64) -> Result<usize, ScreeningError> {
        let seconds = match self.segment {
            SegmentPolicy::Fixed { window_seconds } => window_seconds,
            SegmentPolicy::Auto { cycles } => {
                if self.lowest_edge_hz <= 0.0 {
                    return Err(ScreeningError::InvalidConfig(
                        "automatic segment length needs a positive lowest band edge".into(),
                    ));
                }
                cycles / self.lowest_edge_hz
            }
        };
        let length = (seconds * sampling_rate_hz).round();
        if !length.is_finite() || length < 2.0 {
            return Err(ScreeningError::insufficient(format!(
                "segment of {seconds} s at {sampling_rate_hz} Hz is shorter than two samples"
            )));
        }
        Ok(length as usize)
    }

    fn channel_psd(
        &self,
        fft: &dyn Fft<f64>,
        channel: &[f64],
        taper: &[f64],
        scale: f64,
    ) -> Vec<f64> {
        let n = taper.len();
        let step = n - n / 2;
        let segments = (channel.len() - n) / step + 1;
        let bins = n / 2 + 1;
        let mut acc = vec![0.0; bins];
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        for seg in 0..segments {
            let segment = &channel[seg * step..seg * step + n];
            let mean = segment.iter().sum::<f64>() / n as f64;
            for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(taper) {
                *slot = Complex64::new((x - mean) * w, 0.0);
            }
            fft.process_with_scratch(&mut buffer, &mut scratch);
            for (a, c) in acc.iter_mut().zip(&buffer) {
                *a += c.norm_sqr();
            }
        }
        // One-sided: double everything except DC and, for even n, Nyquist.
        let doubled_end = if n % 2 == 0 { bins - 1 } else { bins };
        acc.iter()
            .enumerate()
            .map(|(k, &a)| {
                let one_sided = if k > 0 && k < doubled_end { 2.0 } else { 1.0 };
                a / segments as f64 * scale * one_sided
            })
            .collect()
    }
}

impl SpectralEstimator for WelchEstimator {
    fn estimate(&self, signal: &RawSignal) -> Result<SpectralEstimate, ScreeningError> {
        signal.validate()?;
        let fs = signal.sampling_rate_hz;
        let nyquist = fs * 0.5;
        if self.fmax_hz > nyquist {
            return Err(ScreeningError::insufficient(format!(
                "fmax {} Hz exceeds the Nyquist frequency {nyquist} Hz",
                self.fmax_hz
            )));
        }
        let n = self.segment_length(fs)?;
        let available = signal.samples_per_channel();
        if n > available {
            return Err(ScreeningError::insufficient(format!(
                "segment length {n} exceeds the {available} available samples"
            )));
        }
        let resolution_hz = fs / n as f64;
        let keep: Vec<usize> = (0..=n / 2)
            .filter(|&k| {
                let f = k as f64 * resolution_hz;
                f >= self.fmin_hz && f <= self.fmax_hz
            })
            .collect();
        if keep.is_empty() {
            return Err(ScreeningError::insufficient(format!(
                "no frequency bin at {resolution_hz} Hz resolution falls inside [{}, {}] Hz",
                self.fmin_hz, self.fmax_hz
            )));
        }
        let frequencies_hz: Vec<f64> = keep.iter().map(|&k| k as f64 * resolution_hz).collect();

        let taper = self.window.coefficients(n);
        let scale = 1.0 / (fs * taper.iter().map(|w| w * w).sum::<f64>());
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let filters = self
            .prefilter
            .map(|p| FilterChain::from_kinds(fs, &p.kinds()))
            .unwrap_or_default();

        // Map: one periodogram row per channel.
        let mut channel_power = Array2::<f64>::zeros((signal.channel_count(), keep.len()));
        for (mut row, channel) in channel_power.rows_mut().into_iter().zip(&signal.samples) {
            let channel: Cow<'_, [f64]> = if filters.is_empty() {
                Cow::Borrowed(channel.as_slice())
            } else {
                Cow::Owned(filters.apply(channel))
            };
            let psd = self.channel_psd(fft.as_ref(), &channel, &taper, scale);
            row.assign(&keep.iter().map(|&k| psd[k]).collect::<Array1<f64>>());
        }

        let step = n - n / 2;
        let segment_count = (available - n) / step + 1;
        debug!(
            "welch: {} channel(s), segment {n} samples, {segment_count} segment(s), resolution {resolution_hz:.4} Hz, {} bins kept",
            signal.channel_count(),
            keep.len()
        );
        SpectralEstimate::from_channels(
            frequencies_hz,
            channel_power,
            fs,
            resolution_hz,
            n,
            segment_count,
        )
    }
}
