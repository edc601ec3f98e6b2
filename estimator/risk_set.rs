//! Running attrition and at-risk weights for one (resample, arm) group.
//!
//! The fold is strictly sequential: every step needs the at-risk value left by the
//! previous step, so a group is never split across threads.

use crate::error::EstimationError;
use crate::event_table::TimeBucket;
use crate::types::GroupKey;

/// Relative slack allowed on the at-risk weight before attrition counts as exceeding
/// the starting population. Absorbs summation rounding only.
const ATTRITION_TOLERANCE: f64 = 1e-9;

/// Risk-set bookkeeping at one observed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskState {
    pub bucket: TimeBucket,
    /// Censoring weight summed over all times up to and including this one.
    pub cum_censor: f64,
    /// Competing-event weight summed over all times up to and including this one.
    pub cum_competing: f64,
    pub at_risk: f64,
    /// At-risk weight left by the previous step, or the arm total on the first step.
    pub at_risk_previous: f64,
}

impl RiskState {
    pub fn time(&self) -> f64 {
        self.bucket.time
    }
}

/// Accumulator reset at the start of each group and advanced once per time bucket.
#[derive(Debug, Clone)]
pub struct RiskSetAccumulator {
    group: GroupKey,
    total: f64,
    cum_censor: f64,
    cum_competing: f64,
    at_risk: f64,
}

impl RiskSetAccumulator {
    pub fn new(group: GroupKey, total: f64) -> Self {
        Self {
            group,
            total,
            cum_censor: 0.0,
            cum_competing: 0.0,
            at_risk: total,
        }
    }

    fn tolerance(&self) -> f64 {
        ATTRITION_TOLERANCE * self.total.max(1.0)
    }

    /// Advances the fold by one bucket. Buckets must arrive in ascending time order.
    pub fn step(&mut self, bucket: &TimeBucket) -> Result<RiskState, EstimationError> {
        let at_risk_previous = self.at_risk;
        if at_risk_previous <= self.tolerance() {
            return Err(EstimationError::NonPositiveAtRisk {
                group: self.group,
                time: bucket.time,
                at_risk: at_risk_previous,
            });
        }

        self.cum_censor += bucket.censor_weight;
        self.cum_competing += bucket.competing_weight;
        let at_risk = self.total - self.cum_censor - self.cum_competing;
        if at_risk < -self.tolerance() {
            return Err(EstimationError::AttritionExceedsPopulation {
                group: self.group,
                time: bucket.time,
                total: self.total,
                at_risk,
            });
        }
        self.at_risk = at_risk;

        Ok(RiskState {
            bucket: *bucket,
            cum_censor: self.cum_censor,
            cum_competing: self.cum_competing,
            at_risk,
            at_risk_previous,
        })
    }
}

/// Runs the risk-set fold over a group's time-ordered buckets.
pub fn accumulate_risk_sets(
    group: GroupKey,
    total: f64,
    buckets: &[TimeBucket],
) -> Result<Vec<RiskState>, EstimationError> {
    let mut accumulator = RiskSetAccumulator::new(group, total);
    buckets.iter().map(|bucket| accumulator.step(bucket)).collect()
}
