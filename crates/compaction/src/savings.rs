//! Mapping from sampled entropy to expected savings

use serde::{Deserialize, Serialize};

/// Upper bound of any savings estimate or threshold, in percent
pub const MAX_SAVINGS_PERCENT: f64 = 90.0;

/// Threshold used when a caller supplies nothing usable
pub const DEFAULT_MIN_SAVINGS_PERCENT: f64 = 10.0;

/// Linear savings model
///
/// Entropy 0 maps to `max_savings_percent`, `incompressible_entropy` and
/// above map to 0%. Output is always inside `[0, MAX_SAVINGS_PERCENT]` and
/// never increases with entropy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsModel {
    pub max_savings_percent: f64,
    pub incompressible_entropy: f64,
}

impl Default for SavingsModel {
    fn default() -> Self {
        Self {
            max_savings_percent: MAX_SAVINGS_PERCENT,
            incompressible_entropy: 8.0,
        }
    }
}

impl SavingsModel {
    /// Estimated savings percentage for an average entropy in bits/byte
    pub fn estimate(&self, average_entropy: f64) -> f64 {
        let ceiling = if self.max_savings_percent.is_finite() {
            self.max_savings_percent.clamp(0.0, MAX_SAVINGS_PERCENT)
        } else {
            MAX_SAVINGS_PERCENT
        };
        let zero_at = if self.incompressible_entropy.is_finite() && self.incompressible_entropy > 0.0
        {
            self.incompressible_entropy
        } else {
            8.0
        };
        if average_entropy.is_nan() {
            return 0.0;
        }

        let fraction = (1.0 - average_entropy / zero_at).clamp(0.0, 1.0);
        (ceiling * fraction).clamp(0.0, MAX_SAVINGS_PERCENT)
    }
}

/// Clamp a caller-supplied threshold into `[0, 90]`
pub fn clamp_savings_percent(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_MIN_SAVINGS_PERCENT;
    }
    value.clamp(0.0, MAX_SAVINGS_PERCENT)
}
