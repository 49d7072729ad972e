// src/analysis/mod.rs
// Numerical core: spectrum -> bands -> ratios -> fusion -> report
pub mod bands;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod pipeline;
pub mod ratio;
pub mod report;
pub mod source;
pub mod spectrum;
// Re-export the stage types so callers can use `analysis::X`
pub use bands::{BandPower, BandPowers, BandTable, FrequencyBand};
pub use error::ScreeningError;
pub use filter::{FilterChain, FilterKind, Prefilter};
pub use fusion::{
    EegScoreModel, ExternalScore, FusionConfig, FusionEngine, FusionOutcome, MissingEegPolicy,
    TierBoundaries, WeightedScore,
};
pub use pipeline::{EegAnalysis, ScreeningPipeline};
pub use ratio::{RatioAssessment, RatioThresholds, ALPHA_EPSILON};
pub use report::{CompositeResult, ReportAssembler, SignalMetadata, DISCLAIMER};
pub use source::{ChannelSelection, ManualSource, RawSignal, SignalSource, SyntheticSource, Tone};
pub use spectrum::{SegmentPolicy, SpectralEstimate, SpectralEstimator, WelchEstimator, WindowKind};
