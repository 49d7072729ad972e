// src/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

// Named EEG frequency bands, in canonical order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandName {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl BandName {
    pub const ALL: [BandName; 5] = [
        BandName::Delta,
        BandName::Theta,
        BandName::Alpha,
        BandName::Beta,
        BandName::Gamma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BandName::Delta => "delta",
            BandName::Theta => "theta",
            BandName::Alpha => "alpha",
            BandName::Beta => "beta",
            BandName::Gamma => "gamma",
        }
    }
}

impl fmt::Display for BandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Theta/alpha pattern label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepressionFlag {
    Typical,
    Elevated,
}

impl fmt::Display for DepressionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepressionFlag::Typical => f.write_str("typical"),
            DepressionFlag::Elevated => f.write_str("elevated"),
        }
    }
}

// Beta/alpha pattern label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveFlag {
    Typical,
    PossibleConcern,
}

impl fmt::Display for CognitiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CognitiveFlag::Typical => f.write_str("typical"),
            CognitiveFlag::PossibleConcern => f.write_str("possible concern"),
        }
    }
}

// Tier of the fused composite index
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => f.write_str("Low"),
            RiskTier::Moderate => f.write_str("Moderate"),
            RiskTier::High => f.write_str("High"),
        }
    }
}

// Who produced a score that enters fusion
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Eeg,
    Questionnaire,
    Cognitive,
    Other,
}
