// src/analysis/report.rs
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::analysis::{
    BandPowers, EegAnalysis, ExternalScore, FusionOutcome, RatioAssessment, RawSignal,
    SpectralEstimate, WeightedScore,
};
use crate::types::RiskTier;

pub const DISCLAIMER: &str =
    "Research screening aid only. This index is not a diagnosis and has no clinical validity.";

/// Recording and estimator parameters the band powers depend on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignalMetadata {
    pub channel_count: usize,
    pub channel_labels: Vec<String>,
    pub sampling_rate_hz: f64,
    pub samples_per_channel: usize,
    pub duration_seconds: f64,
    pub frequency_resolution_hz: f64,
    pub segment_length: usize,
    pub segment_count: usize,
    pub fmin_hz: f64,
    pub fmax_hz: f64,
}

impl SignalMetadata {
    pub fn describe(signal: &RawSignal, estimate: &SpectralEstimate) -> Self {
        Self {
            channel_count: signal.channel_count(),
            channel_labels: signal.channel_labels.clone(),
            sampling_rate_hz: signal.sampling_rate_hz,
            samples_per_channel: signal.samples_per_channel(),
            duration_seconds: signal.duration_seconds(),
            frequency_resolution_hz: estimate.resolution_hz(),
            segment_length: estimate.segment_length(),
            segment_count: estimate.segment_count(),
            fmin_hz: estimate.frequencies_hz().first().copied().unwrap_or(0.0),
            fmax_hz: estimate.frequencies_hz().last().copied().unwrap_or(0.0),
        }
    }
}

/// Result of one assessment session. Immutable once assembled; field names are
/// the contract report renderers rely on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompositeResult {
    #[serde(serialize_with = "unix_millis")]
    generated_at: SystemTime,
    signal: Option<SignalMetadata>,
    band_powers: Option<BandPowers>,
    ratios: Option<RatioAssessment>,
    eeg_score: Option<f64>,
    external_scores: Vec<ExternalScore>,
    contributions: Vec<WeightedScore>,
    composite_index: f64,
    tier: RiskTier,
    disclaimer: &'static str,
}

impl CompositeResult {
    pub fn generated_at(&self) -> SystemTime {
        self.generated_at
    }
    pub fn signal(&self) -> Option<&SignalMetadata> {
        self.signal.as_ref()
    }
    pub fn band_powers(&self) -> Option<&BandPowers> {
        self.band_powers.as_ref()
    }
    pub fn ratios(&self) -> Option<&RatioAssessment> {
        self.ratios.as_ref()
    }
    pub fn eeg_score(&self) -> Option<f64> {
        self.eeg_score
    }
    pub fn external_scores(&self) -> &[ExternalScore] {
        &self.external_scores
    }
    pub fn contributions(&self) -> &[WeightedScore] {
        &self.contributions
    }
    pub fn composite_index(&self) -> f64 {
        self.composite_index
    }
    pub fn tier(&self) -> RiskTier {
        self.tier
    }
    pub fn disclaimer(&self) -> &'static str {
        self.disclaimer
    }
}

fn unix_millis<S: Serializer>(at: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let millis = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    serializer.serialize_u64(millis)
}

/// Packages stage outputs into a [`CompositeResult`]. Does not render anything.
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(
        analysis: Option<&EegAnalysis>,
        external: &[ExternalScore],
        fusion: FusionOutcome,
    ) -> CompositeResult {
        Self::assemble_at(SystemTime::now(), analysis, external, fusion)
    }

    pub fn assemble_at(
        generated_at: SystemTime,
        analysis: Option<&EegAnalysis>,
        external: &[ExternalScore],
        fusion: FusionOutcome,
    ) -> CompositeResult {
        CompositeResult {
            generated_at,
            signal: analysis.map(|a| a.metadata.clone()),
            band_powers: analysis.map(|a| a.band_powers.clone()),
            ratios: analysis.map(|a| a.ratios),
            eeg_score: analysis.map(|a| a.eeg_score),
            external_scores: external.to_vec(),
            contributions: fusion.contributions,
            composite_index: fusion.composite,
            tier: fusion.tier,
            disclaimer: DISCLAIMER,
        }
    }
}
