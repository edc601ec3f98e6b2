//! Symmetric normal-approximation intervals around the resample-0 estimates.

use crate::bootstrap::{BootstrapSpread, Metric};
use crate::contrast::ContrastCurve;
use crate::error::EstimationError;
use crate::types::POINT_ESTIMATE_RESAMPLE;

/// Two-sided 95% standard normal critical value.
pub const NORMAL_CRITICAL_VALUE: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub estimate: f64,
    pub standard_error: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn normal(estimate: f64, standard_error: f64) -> Self {
        let half_width = NORMAL_CRITICAL_VALUE * standard_error;
        Self {
            estimate,
            standard_error,
            lower: estimate - half_width,
            upper: estimate + half_width,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// One row of the final output table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalEstimate {
    pub time: u32,
    pub mcc_reference: Interval,
    pub mcc_treated: Interval,
    pub difference: Interval,
    pub ratio: Interval,
}

impl FinalEstimate {
    pub fn interval(&self, metric: Metric) -> &Interval {
        match metric {
            Metric::MccReference => &self.mcc_reference,
            Metric::MccTreated => &self.mcc_treated,
            Metric::Difference => &self.difference,
            Metric::Ratio => &self.ratio,
        }
    }
}

/// Combines the point-estimate curve with the bootstrap spread, time by time.
pub fn build_confidence_intervals(
    point_estimate: &ContrastCurve,
    spread: &BootstrapSpread,
) -> Result<Vec<FinalEstimate>, EstimationError> {
    if point_estimate.resample != POINT_ESTIMATE_RESAMPLE {
        return Err(EstimationError::UnexpectedReplicate {
            resample: point_estimate.resample,
            expected: POINT_ESTIMATE_RESAMPLE,
        });
    }
    if point_estimate.points.len() != spread.standard_errors.len() {
        return Err(EstimationError::GridMismatch {
            resample: point_estimate.resample,
            expected: spread.standard_errors.len(),
            found: point_estimate.points.len(),
        });
    }

    Ok(point_estimate
        .points
        .iter()
        .zip(&spread.standard_errors)
        .map(|(point, se)| FinalEstimate {
            time: point.time,
            mcc_reference: Interval::normal(point.mcc_reference, se.mcc_reference),
            mcc_treated: Interval::normal(point.mcc_treated, se.mcc_treated),
            difference: Interval::normal(point.difference, se.difference),
            ratio: Interval::normal(point.ratio, se.ratio),
        })
        .collect())
}
