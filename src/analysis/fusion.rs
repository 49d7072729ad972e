// src/analysis/fusion.rs
//! Fusion of the EEG-derived score with questionnaire and cognitive-test scores.
//!
//! All inputs live on a common 0..=100 scale. The composite is the weighted mean
//! `Σ(score·weight) / Σ(weight)`, clamped to `[0, 100]`, and then bucketed into a
//! [`RiskTier`] by [`TierBoundaries`].

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::{RatioAssessment, ScreeningError};
use crate::types::{RiskTier, ScoreSource};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Linear map from the two ratios to an EEG score, clamped to `[0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EegScoreModel {
    pub theta_alpha_weight: f64,
    pub beta_alpha_weight: f64,
    pub intercept: f64,
}

impl Default for EegScoreModel {
    fn default() -> Self {
        Self {
            theta_alpha_weight: 50.0,
            beta_alpha_weight: -20.0,
            intercept: 30.0,
        }
    }
}

impl EegScoreModel {
    pub fn validate(&self) -> Result<(), ScreeningError> {
        let coefficients = [
            ("theta_alpha_weight", self.theta_alpha_weight),
            ("beta_alpha_weight", self.beta_alpha_weight),
            ("intercept", self.intercept),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() {
                return Err(ScreeningError::InvalidConfig(format!(
                    "eeg score {name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Fails instead of guessing when the linear map is undefined.
    pub fn score(&self, ratios: &RatioAssessment) -> Result<f64, ScreeningError> {
        let raw = self.intercept
            + self.theta_alpha_weight * ratios.theta_alpha
            + self.beta_alpha_weight * ratios.beta_alpha;
        if raw.is_nan() {
            return Err(ScreeningError::invalid_input(format!(
                "eeg score is undefined for theta/alpha {} and beta/alpha {}",
                ratios.theta_alpha, ratios.beta_alpha
            )));
        }
        Ok(raw.clamp(SCORE_MIN, SCORE_MAX))
    }
}

/// What fusion does when no EEG score is available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEegPolicy {
    /// Fail with `MissingPrimaryInput`.
    #[default]
    Refuse,
    /// Drop the EEG term and re-normalize over the remaining weights.
    Renormalize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub eeg_weight: f64,
    pub missing_eeg: MissingEegPolicy,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            eeg_weight: 0.5,
            missing_eeg: MissingEegPolicy::Refuse,
        }
    }
}

/// Lower bounds (inclusive) of the Moderate and High tiers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBoundaries {
    pub moderate_from: f64,
    pub high_from: f64,
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            moderate_from: 40.0,
            high_from: 70.0,
        }
    }
}

impl TierBoundaries {
    pub fn tier(&self, composite: f64) -> RiskTier {
        if composite >= self.high_from {
            RiskTier::High
        } else if composite >= self.moderate_from {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    pub fn validate(&self) -> Result<(), ScreeningError> {
        let ordered = SCORE_MIN <= self.moderate_from
            && self.moderate_from < self.high_from
            && self.high_from <= SCORE_MAX;
        if !ordered {
            return Err(ScreeningError::InvalidConfig(format!(
                "tier boundaries must satisfy 0 <= moderate ({}) < high ({}) <= 100",
                self.moderate_from, self.high_from
            )));
        }
        Ok(())
    }
}

/// A score supplied by a questionnaire or cognitive-test collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalScore {
    pub label: String,
    pub source: ScoreSource,
    pub value: f64,
    pub weight: f64,
}

impl ExternalScore {
    pub fn new(label: impl Into<String>, source: ScoreSource, value: f64, weight: f64) -> Self {
        Self {
            label: label.into(),
            source,
            value,
            weight,
        }
    }

    pub fn questionnaire(value: f64, weight: f64) -> Self {
        Self::new("questionnaire", ScoreSource::Questionnaire, value, weight)
    }

    pub fn cognitive(value: f64, weight: f64) -> Self {
        Self::new("cognitive", ScoreSource::Cognitive, value, weight)
    }
}

/// One term of the weighted sum as it entered fusion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeightedScore {
    pub label: String,
    pub source: ScoreSource,
    pub value: f64,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionOutcome {
    pub composite: f64,
    pub tier: RiskTier,
    pub contributions: Vec<WeightedScore>,
    pub eeg_included: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FusionEngine {
    config: FusionConfig,
    tiers: TierBoundaries,
}

impl FusionEngine {
    pub fn new(config: FusionConfig, tiers: TierBoundaries) -> Self {
        Self { config, tiers }
    }

    pub fn fuse(
        &self,
        eeg_score: Option<f64>,
        external: &[ExternalScore],
    ) -> Result<FusionOutcome, ScreeningError> {
        check_weight("eeg", self.config.eeg_weight)?;
        for score in external {
            check_weight(&score.label, score.weight)?;
            check_value(&score.label, score.value)?;
        }

        let mut contributions = Vec::with_capacity(external.len() + 1);
        match eeg_score {
            Some(value) => {
                check_value("eeg", value)?;
                contributions.push(WeightedScore {
                    label: "eeg".into(),
                    source: ScoreSource::Eeg,
                    value,
                    weight: self.config.eeg_weight,
                });
            }
            None => match self.config.missing_eeg {
                MissingEegPolicy::Refuse => return Err(ScreeningError::MissingPrimaryInput),
                MissingEegPolicy::Renormalize => {
                    warn!("no EEG score supplied; fusing over external scores only");
                }
            },
        }
        contributions.extend(external.iter().map(|s| WeightedScore {
            label: s.label.clone(),
            source: s.source,
            value: s.value,
            weight: s.weight,
        }));

        let total_weight: f64 = contributions.iter().map(|c| c.weight).sum();
        if total_weight <= 0.0 {
            return Err(ScreeningError::invalid_weight(format!(
                "weights of {} input(s) sum to zero",
                contributions.len()
            )));
        }
        let weighted: f64 = contributions.iter().map(|c| c.value * c.weight).sum();
        let composite = (weighted / total_weight).clamp(SCORE_MIN, SCORE_MAX);
        let tier = self.tiers.tier(composite);
        info!("composite index {composite:.2} -> {tier}");
        Ok(FusionOutcome {
            composite,
            tier,
            contributions,
            eeg_included: eeg_score.is_some(),
        })
    }
}

fn check_weight(label: &str, weight: f64) -> Result<(), ScreeningError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ScreeningError::invalid_weight(format!(
            "weight for {label} must be finite and non-negative, got {weight}"
        )));
    }
    Ok(())
}

fn check_value(label: &str, value: f64) -> Result<(), ScreeningError> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(ScreeningError::invalid_input(format!(
            "score for {label} must lie in [0, 100], got {value}"
        )));
    }
    Ok(())
}
