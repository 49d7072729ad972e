// src/analysis/pipeline.rs
use log::{debug, info};

use crate::analysis::error::ScreeningError;
use crate::analysis::report::{CompositeResult, ReportAssembler, SignalMetadata};
use crate::analysis::source::{RawSignal, SignalSource};
use crate::analysis::spectrum::{SpectralEstimate, SpectralEstimator, WelchEstimator};
use crate::analysis::{BandPowers, ExternalScore, FusionEngine, RatioAssessment};
use crate::config::ScreeningConfig;

/// Everything derived from one recording before fusion.
#[derive(Clone, Debug, PartialEq)]
pub struct EegAnalysis {
    pub metadata: SignalMetadata,
    pub estimate: SpectralEstimate,
    pub band_powers: BandPowers,
    pub ratios: RatioAssessment,
    pub eeg_score: f64,
}

/// Linear assessment chain: spectrum, bands, ratios, fusion, report.
pub struct ScreeningPipeline<E: SpectralEstimator = WelchEstimator> {
    config: ScreeningConfig,
    estimator: E,
    fusion: FusionEngine,
}

impl ScreeningPipeline<WelchEstimator> {
    pub fn new(config: ScreeningConfig) -> Result<Self, ScreeningError> {
        let estimator = WelchEstimator::from_config(&config);
        Self::with_estimator(config, estimator)
    }
}

impl<E: SpectralEstimator> ScreeningPipeline<E> {
    pub fn with_estimator(config: ScreeningConfig, estimator: E) -> Result<Self, ScreeningError> {
        config.validate()?;
        let fusion = FusionEngine::new(config.fusion, config.tiers);
        Ok(Self {
            config,
            estimator,
            fusion,
        })
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    pub fn analyze(&self, signal: &RawSignal) -> Result<EegAnalysis, ScreeningError> {
        signal.validate()?;
        let selected = signal.select(&self.config.spectral.channels)?;
        let estimate = self.estimator.estimate(&selected)?;
        let band_powers = self.config.bands.integrate(&estimate);
        let ratios = RatioAssessment::classify(&band_powers, &self.config.ratio);
        let eeg_score = self.config.eeg_score.score(&ratios)?;
        debug!("eeg score {eeg_score:.2}");
        Ok(EegAnalysis {
            metadata: SignalMetadata::describe(&selected, &estimate),
            estimate,
            band_powers,
            ratios,
            eeg_score,
        })
    }

    /// Runs one session. `signal` may be absent only under the renormalize policy.
    pub fn assess(
        &self,
        signal: Option<&RawSignal>,
        external: &[ExternalScore],
    ) -> Result<CompositeResult, ScreeningError> {
        let analysis = signal.map(|s| self.analyze(s)).transpose()?;
        let outcome = self
            .fusion
            .fuse(analysis.as_ref().map(|a| a.eeg_score), external)?;
        let result = ReportAssembler::assemble(analysis.as_ref(), external, outcome);
        info!(
            "assessment assembled: composite {:.2} ({}), {} external score(s)",
            result.composite_index(),
            result.tier(),
            external.len()
        );
        Ok(result)
    }

    /// Pulls the next recording from `source` and assesses it.
    pub fn assess_next<S: SignalSource>(
        &self,
        source: &mut S,
        external: &[ExternalScore],
    ) -> Result<Option<CompositeResult>, ScreeningError> {
        let Some(signal) = source.next_signal()? else {
            return Ok(None);
        };
        self.assess(Some(&signal), external).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        ChannelSelection, ManualSource, MissingEegPolicy, SegmentPolicy, SyntheticSource,
    };
    use crate::types::{BandName, CognitiveFlag, DepressionFlag, RiskTier};

    fn recording(seed: u64, tones: &[(f64, f64)]) -> RawSignal {
        let mut source = SyntheticSource::new(seed, 256.0, 4, 30.0).with_noise(1.5);
        for &(freq, amp) in tones {
            source = source.with_tone(freq, amp);
        }
        source.generate().unwrap()
    }

    fn externals() -> Vec<ExternalScore> {
        vec![
            ExternalScore::questionnaire(60.0, 0.3),
            ExternalScore::cognitive(40.0, 0.2),
        ]
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let pipeline = ScreeningPipeline::new(ScreeningConfig::default()).unwrap();
        let signal = recording(5, &[(10.0, 20.0), (6.0, 8.0), (20.0, 6.0)]);
        let a = pipeline.analyze(&signal).unwrap();
        let b = pipeline.analyze(&signal).unwrap();
        assert_eq!(a.band_powers, b.band_powers);
        assert_eq!(a.ratios, b.ratios);
        assert_eq!(a.eeg_score.to_bits(), b.eeg_score.to_bits());
    }

    #[test]
    fn alpha_dominant_recording_is_typical() {
        let pipeline = ScreeningPipeline::new(ScreeningConfig::default()).unwrap();
        let signal = recording(8, &[(10.0, 30.0), (5.0, 5.0), (18.0, 25.0)]);
        let analysis = pipeline.analyze(&signal).unwrap();
        assert_eq!(analysis.ratios.dominant_band, Some(BandName::Alpha));
        assert_eq!(analysis.ratios.depression_flag, DepressionFlag::Typical);
        assert_eq!(analysis.ratios.cognitive_flag, CognitiveFlag::Typical);
        assert!(analysis.eeg_score < 40.0);
        assert_eq!(analysis.metadata.segment_length, 1024);
        assert!((analysis.metadata.frequency_resolution_hz - 0.25).abs() < 1e-12);
    }

    #[test]
    fn theta_dominant_recording_is_elevated() {
        let pipeline = ScreeningPipeline::new(ScreeningConfig::default()).unwrap();
        let signal = recording(9, &[(6.0, 30.0), (10.0, 10.0)]);
        let result = pipeline.assess(Some(&signal), &externals()).unwrap();
        let ratios = result.ratios().unwrap();
        assert_eq!(ratios.depression_flag, DepressionFlag::Elevated);
        assert_eq!(ratios.cognitive_flag, CognitiveFlag::PossibleConcern);
        assert!(ratios.theta_exceeds_alpha);
        assert_eq!(result.eeg_score(), Some(100.0));
        // 100 * 0.5 + 60 * 0.3 + 40 * 0.2 = 76
        assert!((result.composite_index() - 76.0).abs() < 1e-9);
        assert_eq!(result.tier(), RiskTier::High);
    }

    #[test]
    fn empty_recording_fails_before_spectral_work() {
        let pipeline = ScreeningPipeline::new(ScreeningConfig::default()).unwrap();
        let signal = RawSignal {
            sampling_rate_hz: 256.0,
            samples: Vec::new(),
            channel_labels: Vec::new(),
        };
        let err = pipeline.assess(Some(&signal), &externals()).unwrap_err();
        assert!(matches!(err, ScreeningError::InvalidInput(_)));
    }

    #[test]
    fn short_recording_is_insufficient_not_truncated() {
        let mut config = ScreeningConfig::default();
        config.spectral.segment = SegmentPolicy::Fixed {
            window_seconds: 8.0,
        };
        let pipeline = ScreeningPipeline::new(config).unwrap();
        let signal = SyntheticSource::new(1, 256.0, 2, 4.0)
            .with_tone(10.0, 5.0)
            .generate()
            .unwrap();
        let err = pipeline.assess(Some(&signal), &externals()).unwrap_err();
        assert!(matches!(err, ScreeningError::InsufficientData(_)));
    }

    #[test]
    fn missing_signal_follows_configured_policy() {
        let refuse = ScreeningPipeline::new(ScreeningConfig::default()).unwrap();
        assert!(matches!(
            refuse.assess(None, &externals()).unwrap_err(),
            ScreeningError::MissingPrimaryInput
        ));

        let mut config = ScreeningConfig::default();
        config.fusion.missing_eeg = MissingEegPolicy::Renormalize;
        let renormalize = ScreeningPipeline::new(config).unwrap();
        let result = renormalize.assess(None, &externals()).unwrap();
        assert!(result.band_powers().is_none());
        assert!((result.composite_index() - 52.0).abs() < 1e-9);
    }

    #[test]
    fn channel_selection_limits_estimation() {
        let mut config = ScreeningConfig::default();
        config.spectral.channels = ChannelSelection::Indices(vec![0]);
        let pipeline = ScreeningPipeline::new(config).unwrap();
        let signal = recording(2, &[(10.0, 10.0)]);
        let analysis = pipeline.analyze(&signal).unwrap();
        assert_eq!(analysis.metadata.channel_count, 1);
        assert_eq!(analysis.estimate.channel_count(), 1);
    }

    struct FlatEstimator;

    impl SpectralEstimator for FlatEstimator {
        fn estimate(&self, _signal: &RawSignal) -> Result<SpectralEstimate, ScreeningError> {
            let freqs: Vec<f64> = (1..=90).map(|k| k as f64 * 0.5).collect();
            let power = vec![1.0; freqs.len()];
            SpectralEstimate::from_spectrum(freqs, power, 0.5)
        }
    }

    #[test]
    fn estimator_strategy_can_be_swapped() {
        let pipeline =
            ScreeningPipeline::with_estimator(ScreeningConfig::default(), FlatEstimator).unwrap();
        let signal = recording(4, &[(10.0, 10.0)]);
        let analysis = pipeline.analyze(&signal).unwrap();
        // Flat unit spectrum: theta spans [4, 7.5], alpha [8, 12.5], beta [13, 29.5].
        assert!((analysis.band_powers.power(BandName::Theta) - 3.5).abs() < 1e-12);
        assert!((analysis.band_powers.power(BandName::Alpha) - 4.5).abs() < 1e-12);
        assert!((analysis.band_powers.power(BandName::Beta) - 16.5).abs() < 1e-12);
    }

    #[test]
    fn assess_next_drains_source() {
        let pipeline = ScreeningPipeline::new(ScreeningConfig::default()).unwrap();
        let mut source = ManualSource::new(vec![recording(6, &[(10.0, 10.0)])]);
        let first = pipeline.assess_next(&mut source, &externals()).unwrap();
        assert!(first.is_some());
        assert!(pipeline
            .assess_next(&mut source, &externals())
            .unwrap()
            .is_none());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = ScreeningConfig::default();
        config.spectral.fmin_hz = 50.0;
        assert!(matches!(
            ScreeningPipeline::new(config),
            Err(ScreeningError::InvalidConfig(_))
        ));
        let mut config = ScreeningConfig::default();
        config.eeg_score.beta_alpha_weight = f64::NEG_INFINITY;
        assert!(matches!(
            ScreeningPipeline::new(config),
            Err(ScreeningError::InvalidConfig(_))
        ));
    }

    #[test]
    fn coarse_segments_still_flag_a_theta_heavy_recording() {
        // 0.25 s segments at 256 Hz give 4 Hz bins, so theta holds the 4 Hz bin alone.
        let mut config = ScreeningConfig::default();
        config.spectral.segment = SegmentPolicy::Fixed {
            window_seconds: 0.25,
        };
        config.spectral.prefilter = None;
        let pipeline = ScreeningPipeline::new(config).unwrap();
        let signal = SyntheticSource::new(3, 256.0, 1, 20.0)
            .with_tone(4.0, 40.0)
            .with_tone(10.0, 5.0)
            .generate()
            .unwrap();
        let analysis = pipeline.analyze(&signal).unwrap();
        assert!((analysis.metadata.frequency_resolution_hz - 4.0).abs() < 1e-12);
        let theta = analysis
            .band_powers
            .entries()
            .iter()
            .find(|e| e.band == BandName::Theta)
            .unwrap();
        assert_eq!(theta.bins, 1);
        assert!(theta.power > 0.0);
        assert!(analysis.ratios.theta_exceeds_alpha);
        assert_eq!(analysis.ratios.depression_flag, DepressionFlag::Elevated);
        assert_eq!(analysis.ratios.dominant_band, Some(BandName::Theta));
        assert!(analysis
            .band_powers
            .entries()
            .iter()
            .all(|e| e.power.is_sign_positive()));
    }
}
