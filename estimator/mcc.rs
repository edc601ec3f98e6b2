//! Mean cumulative count step function for one (resample, arm) group.

use crate::error::EstimationError;
use crate::risk_set::RiskState;
use crate::survival::SurvivalPoint;
use crate::types::GroupKey;

/// Time of the fixed origin every curve starts from.
pub const ORIGIN_TIME: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MccPoint {
    pub time: f64,
    pub increment: f64,
    pub mcc: f64,
}

/// A group's MCC curve. The first point is always the origin `{time: 0, mcc: 0}`;
/// the remaining points follow the observed times in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct MccCurve {
    pub group: GroupKey,
    pub points: Vec<MccPoint>,
}

impl MccCurve {
    /// MCC value at the last observed time.
    pub fn final_value(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.mcc)
    }
}

/// Running-sum accumulator, reset at the start of each group.
#[derive(Debug, Clone, Default)]
struct MccAccumulator {
    mcc: f64,
}

impl MccAccumulator {
    fn step(&mut self, state: &RiskState, survival: &SurvivalPoint) -> MccPoint {
        let increment =
            state.bucket.event_weight / state.at_risk_previous * survival.cum_survival_previous;
        self.mcc += increment;
        MccPoint {
            time: state.time(),
            increment,
            mcc: self.mcc,
        }
    }
}

/// Accumulates the MCC increments of one group. `states` and `survival` must come
/// from the same group and be aligned step for step.
pub fn accumulate_mcc(
    group: GroupKey,
    states: &[RiskState],
    survival: &[SurvivalPoint],
) -> Result<MccCurve, EstimationError> {
    let mut points = Vec::with_capacity(states.len() + 1);
    points.push(MccPoint {
        time: ORIGIN_TIME,
        increment: 0.0,
        mcc: 0.0,
    });

    let mut accumulator = MccAccumulator::default();
    for (state, point) in states.iter().zip(survival) {
        if state.at_risk_previous <= 0.0 {
            return Err(EstimationError::NonPositiveAtRisk {
                group,
                time: state.time(),
                at_risk: state.at_risk_previous,
            });
        }
        points.push(accumulator.step(state, point));
    }

    Ok(MccCurve { group, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_table::TimeBucket;
    use crate::risk_set::accumulate_risk_sets;
    use crate::survival::build_survival_curve;
    use crate::types::Arm;
    use approx::assert_abs_diff_eq;

    fn curve_for(total: f64, buckets: &[TimeBucket]) -> MccCurve {
        let group = GroupKey::new(0, Arm::Reference);
        let states = accumulate_risk_sets(group, total, buckets).unwrap();
        let survival = build_survival_curve(group, &states).unwrap();
        accumulate_mcc(group, &states, &survival).unwrap()
    }

    #[test]
    fn two_subject_recurrent_events() {
        let buckets = [
            TimeBucket {
                time: 5.0,
                censor_weight: 0.0,
                event_weight: 2.0,
                competing_weight: 0.0,
            },
            TimeBucket {
                time: 10.0,
                censor_weight: 0.0,
                event_weight: 1.0,
                competing_weight: 0.0,
            },
        ];
        let curve = curve_for(2.0, &buckets);
        let values: Vec<(f64, f64)> = curve.points.iter().map(|p| (p.time, p.mcc)).collect();
        assert_eq!(values, vec![(0.0, 0.0), (5.0, 1.0), (10.0, 1.5)]);
        assert_abs_diff_eq!(curve.final_value(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn competing_event_discounts_later_increments() {
        // Four subjects: one dies at t=1, then one event among the remaining three.
        let buckets = [
            TimeBucket {
                time: 1.0,
                censor_weight: 0.0,
                event_weight: 0.0,
                competing_weight: 1.0,
            },
            TimeBucket {
                time: 2.0,
                censor_weight: 0.0,
                event_weight: 1.0,
                competing_weight: 0.0,
            },
        ];
        let curve = curve_for(4.0, &buckets);
        // (1/3) * 0.75
        assert_abs_diff_eq!(curve.points[2].increment, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.final_value(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn event_at_time_zero_follows_the_origin() {
        let buckets = [TimeBucket {
            time: 0.0,
            censor_weight: 0.0,
            event_weight: 1.0,
            competing_weight: 0.0,
        }];
        let curve = curve_for(4.0, &buckets);
        assert_eq!(curve.points.len(), 2);
        assert_eq!(curve.points[0].mcc, 0.0);
        assert_abs_diff_eq!(curve.points[1].mcc, 0.25, epsilon = 1e-12);
    }
}
