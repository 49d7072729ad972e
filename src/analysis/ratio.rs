// src/analysis/ratio.rs
use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::{BandPowers, ScreeningError};
use crate::types::{BandName, CognitiveFlag, DepressionFlag};

/// Floor applied to alpha power before it is used as a divisor.
pub const ALPHA_EPSILON: f64 = 1e-9;

/// Demo heuristics for the qualitative labels. Not clinically validated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioThresholds {
    /// theta/alpha strictly above this is flagged `Elevated`.
    pub theta_alpha_elevated: f64,
    /// beta/alpha strictly below this is flagged `PossibleConcern`.
    pub beta_alpha_concern: f64,
}

impl Default for RatioThresholds {
    fn default() -> Self {
        Self {
            theta_alpha_elevated: 0.8,
            beta_alpha_concern: 0.5,
        }
    }
}

impl RatioThresholds {
    pub fn validate(&self) -> Result<(), ScreeningError> {
        if !(self.theta_alpha_elevated.is_finite() && self.beta_alpha_concern.is_finite()) {
            return Err(ScreeningError::InvalidConfig(format!(
                "ratio thresholds must be finite, got theta/alpha {} and beta/alpha {}",
                self.theta_alpha_elevated, self.beta_alpha_concern
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RatioAssessment {
    pub theta_alpha: f64,
    pub beta_alpha: f64,
    pub depression_flag: DepressionFlag,
    pub cognitive_flag: CognitiveFlag,
    /// Plain theta > alpha comparison.
    pub theta_exceeds_alpha: bool,
    pub dominant_band: Option<BandName>,
}

impl RatioAssessment {
    pub fn classify(powers: &BandPowers, thresholds: &RatioThresholds) -> Self {
        let theta = powers.power(BandName::Theta);
        let alpha = powers.power(BandName::Alpha);
        let beta = powers.power(BandName::Beta);
        let divisor = alpha.max(ALPHA_EPSILON);
        let theta_alpha = theta / divisor;
        let beta_alpha = beta / divisor;

        let depression_flag = if theta_alpha > thresholds.theta_alpha_elevated {
            DepressionFlag::Elevated
        } else {
            DepressionFlag::Typical
        };
        let cognitive_flag = if beta_alpha < thresholds.beta_alpha_concern {
            CognitiveFlag::PossibleConcern
        } else {
            CognitiveFlag::Typical
        };
        debug!(
            "ratios: theta/alpha={theta_alpha:.4} ({depression_flag}), beta/alpha={beta_alpha:.4} ({cognitive_flag})"
        );
        Self {
            theta_alpha,
            beta_alpha,
            depression_flag,
            cognitive_flag,
            theta_exceeds_alpha: theta > alpha,
            dominant_band: powers.dominant(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BandTable, SpectralEstimate};

    // Builds band powers by integrating a flat two-bin step inside each band.
    fn powers(theta: f64, alpha: f64, beta: f64) -> BandPowers {
        let est = SpectralEstimate::from_spectrum(
            vec![5.0, 6.0, 9.0, 10.0, 15.0, 16.0],
            vec![theta, theta, alpha, alpha, beta, beta],
            1.0,
        )
        .unwrap();
        BandTable::default().integrate(&est)
    }

    #[test]
    fn equal_theta_and_alpha_is_elevated() {
        let r = RatioAssessment::classify(&powers(2.0, 2.0, 2.0), &RatioThresholds::default());
        assert_eq!(r.theta_alpha, 1.0);
        assert_eq!(r.depression_flag, DepressionFlag::Elevated);
        assert!(!r.theta_exceeds_alpha);
    }

    #[test]
    fn zero_theta_is_typical() {
        let r = RatioAssessment::classify(&powers(0.0, 2.0, 2.0), &RatioThresholds::default());
        assert_eq!(r.theta_alpha, 0.0);
        assert_eq!(r.depression_flag, DepressionFlag::Typical);
        assert_eq!(r.cognitive_flag, CognitiveFlag::Typical);
    }

    #[test]
    fn low_beta_is_possible_concern() {
        let r = RatioAssessment::classify(&powers(1.0, 4.0, 1.0), &RatioThresholds::default());
        assert_eq!(r.beta_alpha, 0.25);
        assert_eq!(r.cognitive_flag, CognitiveFlag::PossibleConcern);
        assert_eq!(r.dominant_band, Some(BandName::Alpha));
    }

    #[test]
    fn zero_alpha_uses_epsilon_floor() {
        let r = RatioAssessment::classify(&powers(1.0, 0.0, 1.0), &RatioThresholds::default());
        assert!(r.theta_alpha.is_finite());
        assert!((r.theta_alpha - 1.0 / ALPHA_EPSILON).abs() < 1.0);
        assert!(r.theta_exceeds_alpha);
    }

    #[test]
    fn thresholds_are_strict_and_overridable() {
        let at_threshold = powers(0.8, 1.0, 0.5);
        let r = RatioAssessment::classify(&at_threshold, &RatioThresholds::default());
        assert_eq!(r.depression_flag, DepressionFlag::Typical);
        assert_eq!(r.cognitive_flag, CognitiveFlag::Typical);

        let strict = RatioThresholds {
            theta_alpha_elevated: 0.5,
            beta_alpha_concern: 0.6,
        };
        let r = RatioAssessment::classify(&at_threshold, &strict);
        assert_eq!(r.depression_flag, DepressionFlag::Elevated);
        assert_eq!(r.cognitive_flag, CognitiveFlag::PossibleConcern);
    }

    #[test]
    fn non_finite_thresholds_are_rejected() {
        assert!(RatioThresholds::default().validate().is_ok());
        let nan = RatioThresholds {
            theta_alpha_elevated: f64::NAN,
            ..RatioThresholds::default()
        };
        assert!(matches!(nan.validate(), Err(ScreeningError::InvalidConfig(_))));
        let inf = RatioThresholds {
            beta_alpha_concern: f64::INFINITY,
            ..RatioThresholds::default()
        };
        assert!(inf.validate().is_err());
    }
}
