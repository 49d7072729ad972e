// src/config.rs
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    BandTable, ChannelSelection, EegScoreModel, FusionConfig, Prefilter, RatioThresholds,
    ScreeningError, SegmentPolicy, TierBoundaries, WindowKind,
};

/// Spectral estimation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub fmin_hz: f64,
    pub fmax_hz: f64,
    pub segment: SegmentPolicy,
    pub window: WindowKind,
    // `null` in JSON disables pre-filtering
    pub prefilter: Option<Prefilter>,
    pub channels: ChannelSelection,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            fmin_hz: 0.5,
            fmax_hz: 45.0,
            segment: SegmentPolicy::default(),
            window: WindowKind::Hann,
            prefilter: Some(Prefilter::default()),
            channels: ChannelSelection::All,
        }
    }
}

/// Full configuration of one assessment pipeline. Read-only once the pipeline is built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub bands: BandTable,
    pub spectral: SpectralConfig,
    pub ratio: RatioThresholds,
    pub eeg_score: EegScoreModel,
    pub fusion: FusionConfig,
    pub tiers: TierBoundaries,
}

impl ScreeningConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ScreeningError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScreeningError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ScreeningError> {
        let spectral = &self.spectral;
        if !(spectral.fmin_hz >= 0.0 && spectral.fmin_hz < spectral.fmax_hz) {
            return Err(ScreeningError::InvalidConfig(format!(
                "frequency range [{}, {}] is empty",
                spectral.fmin_hz, spectral.fmax_hz
            )));
        }
        match spectral.segment {
            SegmentPolicy::Auto { cycles } if !(cycles > 0.0 && cycles.is_finite()) => {
                return Err(ScreeningError::InvalidConfig(format!(
                    "segment cycles must be positive, got {cycles}"
                )));
            }
            SegmentPolicy::Fixed { window_seconds }
                if !(window_seconds > 0.0 && window_seconds.is_finite()) =>
            {
                return Err(ScreeningError::InvalidConfig(format!(
                    "segment window must be positive, got {window_seconds} s"
                )));
            }
            _ => {}
        }
        self.bands.validate()?;
        if matches!(spectral.segment, SegmentPolicy::Auto { .. })
            && self.bands.lowest_edge_hz().map_or(true, |f| f <= 0.0)
        {
            return Err(ScreeningError::InvalidConfig(
                "automatic segment length needs a positive lowest band edge".into(),
            ));
        }
        if !(self.fusion.eeg_weight >= 0.0 && self.fusion.eeg_weight.is_finite()) {
            return Err(ScreeningError::InvalidConfig(format!(
                "eeg weight must be non-negative, got {}",
                self.fusion.eeg_weight
            )));
        }
        self.ratio.validate()?;
        self.eeg_score.validate()?;
        self.tiers.validate()
    }
}
