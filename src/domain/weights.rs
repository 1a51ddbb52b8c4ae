//! Weight profiles over the five scoring dimensions.

use crate::domain::error::SiftError;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Dimension weights applied to sub-scores. Non-negative, summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightProfile {
    pub technical: f64,
    pub momentum: f64,
    pub volume: f64,
    pub volatility: f64,
    pub sentiment: f64,
}

impl WeightProfile {
    pub const fn new(
        technical: f64,
        momentum: f64,
        volume: f64,
        volatility: f64,
        sentiment: f64,
    ) -> Self {
        Self {
            technical,
            momentum,
            volume,
            volatility,
            sentiment,
        }
    }

    pub fn sum(&self) -> f64 {
        self.technical + self.momentum + self.volume + self.volatility + self.sentiment
    }

    /// Configuration-error check: weights must be non-negative and sum to
    /// 1.0 within tolerance.
    pub fn validate(&self) -> Result<(), SiftError> {
        let components = [
            ("technical", self.technical),
            ("momentum", self.momentum),
            ("volume", self.volume),
            ("volatility", self.volatility),
            ("sentiment", self.sentiment),
        ];
        for (name, value) in components {
            if !value.is_finite() || value < 0.0 {
                return Err(SiftError::InvalidWeights {
                    reason: format!("{name} weight must be a non-negative number, got {value}"),
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(SiftError::InvalidWeights {
                reason: format!("weights must sum to 1.0, got {sum}"),
            });
        }
        Ok(())
    }
}

impl Default for WeightProfile {
    /// The general-purpose profile used when a strategy does not override.
    fn default() -> Self {
        WeightProfile::new(0.40, 0.25, 0.20, 0.10, 0.05)
    }
}
