//! Product-limit curve of the censoring/competing attrition only.
//!
//! Events of interest never enter the factor; they are counted separately by the
//! MCC accumulator, weighted by the survival value *before* the current step.

use crate::error::EstimationError;
use crate::risk_set::RiskState;
use crate::types::GroupKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivalPoint {
    pub time: f64,
    /// `1 - competing_weight / at_risk_previous` at this time.
    pub factor: f64,
    pub cum_survival: f64,
    /// Cumulative product before this step's factor was applied.
    pub cum_survival_previous: f64,
}

/// Folds the survival factors of one group in time order, starting from 1.0.
pub fn build_survival_curve(
    group: GroupKey,
    states: &[RiskState],
) -> Result<Vec<SurvivalPoint>, EstimationError> {
    let mut cum_survival = 1.0;
    states
        .iter()
        .map(|state| {
            if state.at_risk_previous <= 0.0 {
                return Err(EstimationError::NonPositiveAtRisk {
                    group,
                    time: state.time(),
                    at_risk: state.at_risk_previous,
                });
            }
            let factor = 1.0 - state.bucket.competing_weight / state.at_risk_previous;
            let cum_survival_previous = cum_survival;
            cum_survival *= factor;
            Ok(SurvivalPoint {
                time: state.time(),
                factor,
                cum_survival,
                cum_survival_previous,
            })
        })
        .collect()
}
