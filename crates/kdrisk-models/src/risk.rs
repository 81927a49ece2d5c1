//! Risk tiering

use kdrisk_core::{PredictionResult, RiskTier};

/// Probability above which a prediction is high risk
pub const HIGH_THRESHOLD: f64 = 0.7;

/// Probability above which a prediction is at least moderate risk
pub const MODERATE_THRESHOLD: f64 = 0.3;

/// Map a probability to a tier. Both cuts are strict: exactly 0.7 is
/// Moderate and exactly 0.3 is Low.
pub fn classify(probability: f64) -> RiskTier {
    if probability > HIGH_THRESHOLD {
        RiskTier::High
    } else if probability > MODERATE_THRESHOLD {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    }
}

/// Pair a probability with its tier
pub fn assess(probability: f64) -> PredictionResult {
    PredictionResult {
        probability,
        risk_tier: classify(probability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(classify(0.71), RiskTier::High);
        assert_eq!(classify(0.70), RiskTier::Moderate);
        assert_eq!(classify(0.31), RiskTier::Moderate);
        assert_eq!(classify(0.30), RiskTier::Low);
        assert_eq!(classify(0.0), RiskTier::Low);
        assert_eq!(classify(1.0), RiskTier::High);
    }

    #[test]
    fn test_assess() {
        let result = assess(0.42);
        assert_eq!(result.probability, 0.42);
        assert_eq!(result.risk_tier, RiskTier::Moderate);
    }
}
