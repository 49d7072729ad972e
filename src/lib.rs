// src/lib.rs
//! Spectral band-power extraction and composite risk scoring for multichannel EEG.
//!
//! A research/demo screening aid, not a diagnostic system. One session is a single
//! synchronous call chain:
//!
//! ```text
//! RawSignal -> WelchEstimator -> BandTable::integrate -> RatioAssessment
//!           -> FusionEngine (+ questionnaire / cognitive scores) -> CompositeResult
//! ```
//!
//! All thresholds, band edges and weights come from [`ScreeningConfig`].
pub mod analysis;
pub mod config;
pub mod types;

pub use analysis::{
    CompositeResult, ExternalScore, RawSignal, ScreeningError, ScreeningPipeline, SignalSource,
};
pub use config::ScreeningConfig;
pub use types::{BandName, CognitiveFlag, DepressionFlag, RiskTier, ScoreSource};
