// src/analysis/source.rs
use std::borrow::Cow;
use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::ScreeningError;

/// One multichannel recording handed to the core by an ingestion adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSignal {
    pub sampling_rate_hz: f64,
    pub samples: Vec<Vec<f64>>, // channels x samples
    pub channel_labels: Vec<String>,
}

impl RawSignal {
    /// Builds a validated signal. Empty `channel_labels` get `Ch1..ChN` defaults.
    pub fn new(
        samples: Vec<Vec<f64>>,
        sampling_rate_hz: f64,
        channel_labels: Vec<String>,
    ) -> Result<Self, ScreeningError> {
        let channel_labels = if channel_labels.is_empty() {
            (1..=samples.len()).map(|i| format!("Ch{i}")).collect()
        } else {
            channel_labels
        };
        let signal = Self {
            sampling_rate_hz,
            samples,
            channel_labels,
        };
        signal.validate()?;
        Ok(signal)
    }

    pub fn validate(&self) -> Result<(), ScreeningError> {
        if self.samples.is_empty() {
            return Err(ScreeningError::invalid_input("signal has no channels"));
        }
        if !self.sampling_rate_hz.is_finite() || self.sampling_rate_hz <= 0.0 {
            return Err(ScreeningError::insufficient(format!(
                "sampling rate must be greater than zero, got {}",
                self.sampling_rate_hz
            )));
        }
        if self.channel_labels.len() != self.samples.len() {
            return Err(ScreeningError::invalid_input(format!(
                "channel label count mismatch: expected {}, got {}",
                self.samples.len(),
                self.channel_labels.len()
            )));
        }
        let expected = self.samples[0].len();
        if expected == 0 {
            return Err(ScreeningError::invalid_input("channels contain no samples"));
        }
        for (idx, channel) in self.samples.iter().enumerate() {
            if channel.len() != expected {
                return Err(ScreeningError::invalid_input(format!(
                    "channel {idx} has {} samples, expected {expected}",
                    channel.len()
                )));
            }
            if channel.iter().any(|v| !v.is_finite()) {
                return Err(ScreeningError::invalid_input(format!(
                    "channel {idx} contains non-finite samples"
                )));
            }
        }
        Ok(())
    }

    pub fn channel_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sampling_rate_hz <= 0.0 {
            return 0.0;
        }
        self.samples_per_channel() as f64 / self.sampling_rate_hz
    }

    /// Restricts the signal to the selected channels. `All` borrows without copying.
    pub fn select(&self, selection: &ChannelSelection) -> Result<Cow<'_, RawSignal>, ScreeningError> {
        let indices: Vec<usize> = match selection {
            ChannelSelection::All => return Ok(Cow::Borrowed(self)),
            ChannelSelection::Indices(indices) => {
                if let Some(&bad) = indices.iter().find(|&&i| i >= self.channel_count()) {
                    return Err(ScreeningError::invalid_input(format!(
                        "channel index {bad} out of range ({} channels)",
                        self.channel_count()
                    )));
                }
                indices.clone()
            }
            ChannelSelection::Labels(labels) => labels
                .iter()
                .map(|label| {
                    self.channel_labels
                        .iter()
                        .position(|l| l == label)
                        .ok_or_else(|| {
                            ScreeningError::invalid_input(format!("unknown channel label {label:?}"))
                        })
                })
                .collect::<Result<_, _>>()?,
        };
        if indices.is_empty() {
            return Err(ScreeningError::invalid_input("channel selection is empty"));
        }
        Ok(Cow::Owned(RawSignal {
            sampling_rate_hz: self.sampling_rate_hz,
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
            channel_labels: indices
                .iter()
                .map(|&i| self.channel_labels[i].clone())
                .collect(),
        }))
    }
}

/// Which channels of a recording enter spectral estimation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    #[default]
    All,
    Indices(Vec<usize>),
    Labels(Vec<String>),
}

/// Trait implemented by file decoders and other producers of recordings.
pub trait SignalSource {
    fn next_signal(&mut self) -> Result<Option<RawSignal>, ScreeningError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<RawSignal>,
}

impl ManualSource {
    pub fn new(signals: impl IntoIterator<Item = RawSignal>) -> Self {
        Self {
            queue: signals.into_iter().collect(),
        }
    }
}

impl SignalSource for ManualSource {
    fn next_signal(&mut self) -> Result<Option<RawSignal>, ScreeningError> {
        Ok(self.queue.pop_front())
    }
}

/// A sinusoidal component of a synthetic recording.
#[derive(Clone, Copy, Debug)]
pub struct Tone {
    pub freq_hz: f64,
    pub amplitude_uv: f64,
}

/// Seeded generator of sum-of-sines recordings with uniform noise.
pub struct SyntheticSource {
    rng: StdRng,
    sampling_rate_hz: f64,
    channel_count: usize,
    duration_seconds: f64,
    tones: Vec<Tone>,
    noise_uv: f64,
    remaining: usize,
}

impl SyntheticSource {
    pub fn new(seed: u64, sampling_rate_hz: f64, channel_count: usize, duration_seconds: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sampling_rate_hz,
            channel_count,
            duration_seconds,
            tones: Vec::new(),
            noise_uv: 0.0,
            remaining: 1,
        }
    }

    pub fn with_tone(mut self, freq_hz: f64, amplitude_uv: f64) -> Self {
        self.tones.push(Tone {
            freq_hz,
            amplitude_uv,
        });
        self
    }

    pub fn with_noise(mut self, noise_uv: f64) -> Self {
        self.noise_uv = noise_uv.abs();
        self
    }

    pub fn with_recordings(mut self, count: usize) -> Self {
        self.remaining = count;
        self
    }

    /// Generates one recording regardless of the remaining count.
    pub fn generate(&mut self) -> Result<RawSignal, ScreeningError> {
        if !self.noise_uv.is_finite() {
            return Err(ScreeningError::invalid_input(format!(
                "noise amplitude must be finite, got {}",
                self.noise_uv
            )));
        }
        if !(self.sampling_rate_hz.is_finite() && self.sampling_rate_hz > 0.0) {
            return Err(ScreeningError::insufficient(format!(
                "sampling rate must be positive, got {}",
                self.sampling_rate_hz
            )));
        }
        if !(self.duration_seconds.is_finite() && self.duration_seconds >= 0.0) {
            return Err(ScreeningError::invalid_input(format!(
                "duration must be finite and non-negative, got {} s",
                self.duration_seconds
            )));
        }
        let len = (self.duration_seconds * self.sampling_rate_hz).round().max(0.0) as usize;
        let mut samples = Vec::with_capacity(self.channel_count);
        for ch in 0..self.channel_count {
            // Small per-channel phase shift so channels are not identical.
            let phase = ch as f64 * 0.37;
            let channel: Vec<f64> = (0..len)
                .map(|i| {
                    let t = i as f64 / self.sampling_rate_hz;
                    let clean: f64 = self
                        .tones
                        .iter()
                        .map(|tone| tone.amplitude_uv * (2.0 * PI * tone.freq_hz * t + phase).sin())
                        .sum();
                    let noise = if self.noise_uv > 0.0 {
                        self.rng.gen_range(-self.noise_uv..self.noise_uv)
                    } else {
                        0.0
                    };
                    clean + noise
                })
                .collect();
            samples.push(channel);
        }
        RawSignal::new(samples, self.sampling_rate_hz, Vec::new())
    }
}

impl SignalSource for SyntheticSource {
    fn next_signal(&mut self) -> Result<Option<RawSignal>, ScreeningError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.generate().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_channels_is_invalid_input() {
        let err = RawSignal::new(Vec::new(), 256.0, Vec::new()).unwrap_err();
        assert!(matches!(err, ScreeningError::InvalidInput(_)));
    }

    #[test]
    fn non_positive_rate_is_insufficient_data() {
        let err = RawSignal::new(vec![vec![0.0; 16]], 0.0, Vec::new()).unwrap_err();
        assert!(matches!(err, ScreeningError::InsufficientData(_)));
    }

    #[test]
    fn ragged_channels_are_rejected() {
        let err = RawSignal::new(vec![vec![0.0; 16], vec![0.0; 15]], 128.0, Vec::new()).unwrap_err();
        assert!(matches!(err, ScreeningError::InvalidInput(_)));
    }

    #[test]
    fn default_labels_and_duration() {
        let signal = RawSignal::new(vec![vec![0.0; 512], vec![1.0; 512]], 256.0, Vec::new()).unwrap();
        assert_eq!(signal.channel_labels, vec!["Ch1".to_string(), "Ch2".to_string()]);
        assert_eq!(signal.channel_count(), 2);
        assert!((signal.duration_seconds() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn selection_by_label_and_index() {
        let signal = RawSignal::new(
            vec![vec![0.0; 8], vec![1.0; 8], vec![2.0; 8]],
            100.0,
            vec!["Fp1".into(), "Fp2".into(), "Cz".into()],
        )
        .unwrap();
        let all = signal.select(&ChannelSelection::All).unwrap();
        assert!(matches!(all, Cow::Borrowed(_)));
        let cz = signal
            .select(&ChannelSelection::Labels(vec!["Cz".into()]))
            .unwrap();
        assert_eq!(cz.samples, vec![vec![2.0; 8]]);
        let first = signal.select(&ChannelSelection::Indices(vec![0])).unwrap();
        assert_eq!(first.channel_labels, vec!["Fp1".to_string()]);
        assert!(signal.select(&ChannelSelection::Indices(vec![3])).is_err());
        assert!(signal
            .select(&ChannelSelection::Labels(vec!["O1".into()]))
            .is_err());
    }

    #[test]
    fn synthetic_source_is_seeded_and_finite() {
        let mut a = SyntheticSource::new(7, 128.0, 2, 4.0)
            .with_tone(10.0, 20.0)
            .with_noise(2.0)
            .with_recordings(1);
        let mut b = SyntheticSource::new(7, 128.0, 2, 4.0)
            .with_tone(10.0, 20.0)
            .with_noise(2.0);
        let sa = a.next_signal().unwrap().unwrap();
        let sb = b.next_signal().unwrap().unwrap();
        assert_eq!(sa, sb);
        assert_eq!(sa.samples_per_channel(), 512);
        assert!(a.next_signal().unwrap().is_none());
    }

    #[test]
    fn manual_source_drains_in_order() {
        let s1 = RawSignal::new(vec![vec![0.0; 4]], 10.0, Vec::new()).unwrap();
        let s2 = RawSignal::new(vec![vec![1.0; 4]], 10.0, Vec::new()).unwrap();
        let mut source = ManualSource::new(vec![s1.clone(), s2.clone()]);
        assert_eq!(source.next_signal().unwrap(), Some(s1));
        assert_eq!(source.next_signal().unwrap(), Some(s2));
        assert_eq!(source.next_signal().unwrap(), None);
    }

    #[test]
    fn non_finite_generator_settings_are_errors() {
        for noise in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = SyntheticSource::new(1, 128.0, 1, 1.0)
                .with_tone(10.0, 1.0)
                .with_noise(noise)
                .generate()
                .unwrap_err();
            assert!(matches!(err, ScreeningError::InvalidInput(_)));
        }
        let mut source = SyntheticSource::new(1, 128.0, 1, f64::INFINITY);
        assert!(matches!(source.next_signal(), Err(ScreeningError::InvalidInput(_))));
        let mut source = SyntheticSource::new(1, f64::NAN, 1, 1.0);
        assert!(matches!(source.generate(), Err(ScreeningError::InsufficientData(_))));
    }
}
