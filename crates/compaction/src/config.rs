//! Tunables for planning and analysis runs

use crate::analysis::{AnalyseRequest, REPORTABLE_DIRECTORY_MIN_BYTES};
use crate::entropy::SamplingConfig;
use crate::planner::PlanRequest;
use crate::savings::{DEFAULT_MIN_SAVINGS_PERCENT, SavingsModel};
use serde::{Deserialize, Serialize};

/// Planner settings as stored in a config file
///
/// Every field has a default, so a partial table is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub min_savings_percent: f64,
    pub sampling: SamplingConfig,
    pub savings: SavingsModel,
    /// Dry-run directories below this size are not reported
    pub report_threshold_bytes: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_savings_percent: DEFAULT_MIN_SAVINGS_PERCENT,
            sampling: SamplingConfig::default(),
            savings: SavingsModel::default(),
            report_threshold_bytes: REPORTABLE_DIRECTORY_MIN_BYTES,
        }
    }
}

impl PlannerConfig {
    pub fn plan_request(&self) -> PlanRequest {
        PlanRequest {
            min_savings_percent: self.min_savings_percent,
            sampling: self.sampling,
            savings: self.savings,
            ..Default::default()
        }
    }

    pub fn analyse_request(&self) -> AnalyseRequest {
        AnalyseRequest {
            min_savings_percent: self.min_savings_percent,
            sampling: self.sampling,
            savings: self.savings,
            report_threshold_bytes: self.report_threshold_bytes,
            ..Default::default()
        }
    }
}
