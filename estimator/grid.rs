//! Dense integer time grid with last-observation-carried-forward filling.
//!
//! Two named transforms keep the missing-value handling explicit:
//! [`align_to_grid`] places a sparse curve onto `[0, end_of_followup]` leaving
//! unobserved slots as `None`, and [`carry_forward`] fills those slots from the
//! most recent observed value.

use crate::error::EstimationError;
use crate::mcc::MccCurve;
use crate::types::{ArmPair, GroupKey, ResampleIndex};

/// Both arms' MCC step functions evaluated at every integer time `0..=end_of_followup`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveGrid {
    pub resample: ResampleIndex,
    pub mcc: ArmPair<Vec<f64>>,
}

impl CurveGrid {
    pub fn len(&self) -> usize {
        self.mcc.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Places each curve point in the slot of the first grid time at or after it, so
/// that slot `g` holds the last point with `time <= g` that falls in `(g - 1, g]`.
/// Points beyond the grid are dropped.
pub fn align_to_grid(curve: &MccCurve, end_of_followup: u32) -> Vec<Option<f64>> {
    let mut slots = vec![None; end_of_followup as usize + 1];
    for point in &curve.points {
        let slot = point.time.ceil();
        if slot > end_of_followup as f64 {
            break;
        }
        // Later points in the same slot overwrite earlier ones.
        slots[slot as usize] = Some(point.mcc);
    }
    slots
}

/// Fills every `None` with the most recent `Some` before it. A leading `None`
/// means the curve had no origin, which is an error.
pub fn carry_forward(
    group: GroupKey,
    sparse: Vec<Option<f64>>,
) -> Result<Vec<f64>, EstimationError> {
    let mut last: Option<f64> = None;
    sparse
        .into_iter()
        .enumerate()
        .map(|(time, value)| {
            last = value.or(last);
            last.ok_or(EstimationError::MissingOrigin {
                group,
                time: time as u32,
            })
        })
        .collect()
}

/// Normalizes both arms of one resample onto the shared grid. A non-integer
/// observation time takes effect at the next integer grid time.
pub fn normalize_curves(
    resample: ResampleIndex,
    curves: &ArmPair<MccCurve>,
    end_of_followup: u32,
) -> Result<CurveGrid, EstimationError> {
    let mcc = ArmPair::try_from_fn(|arm| {
        let group = GroupKey::new(resample, arm);
        carry_forward(group, align_to_grid(&curves[arm], end_of_followup))
    })?;
    Ok(CurveGrid { resample, mcc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcc::MccPoint;
    use crate::types::Arm;

    fn curve(points: &[(f64, f64)]) -> MccCurve {
        MccCurve {
            group: GroupKey::new(0, Arm::Reference),
            points: points
                .iter()
                .map(|&(time, mcc)| MccPoint {
                    time,
                    increment: 0.0,
                    mcc,
                })
                .collect(),
        }
    }

    #[test]
    fn plateaus_fill_gaps() {
        let c = curve(&[(0.0, 0.0), (5.0, 1.0), (10.0, 1.5)]);
        let sparse = align_to_grid(&c, 10);
        assert_eq!(sparse[0], Some(0.0));
        assert_eq!(sparse[4], None);
        assert_eq!(sparse[5], Some(1.0));

        let dense = carry_forward(c.group, sparse).unwrap();
        let expected = vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.5];
        assert_eq!(dense, expected);
    }

    #[test]
    fn fractional_times_take_effect_at_the_next_integer() {
        let c = curve(&[(0.0, 0.0), (2.5, 0.5), (2.75, 0.75), (3.0, 1.0), (3.2, 1.2)]);
        let dense = carry_forward(c.group, align_to_grid(&c, 4)).unwrap();
        assert_eq!(dense, vec![0.0, 0.0, 0.0, 1.0, 1.2]);
    }

    #[test]
    fn normalized_arms_share_the_next_integer_rule() {
        let curves = ArmPair::new(
            curve(&[(0.0, 0.0), (1.5, 1.0)]),
            curve(&[(0.0, 0.0), (0.25, 2.0)]),
        );
        let grid = normalize_curves(3, &curves, 2).unwrap();
        assert_eq!(grid.resample, 3);
        assert_eq!(grid.mcc[Arm::Reference], vec![0.0, 0.0, 1.0]);
        assert_eq!(grid.mcc[Arm::Treated], vec![0.0, 2.0, 2.0]);
    }

    #[test]
    fn points_past_followup_are_dropped() {
        let c = curve(&[(0.0, 0.0), (2.0, 1.0), (8.0, 2.0)]);
        let dense = carry_forward(c.group, align_to_grid(&c, 5)).unwrap();
        assert_eq!(dense, vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn observation_at_zero_overrides_the_origin() {
        let c = curve(&[(0.0, 0.0), (0.0, 0.5)]);
        let dense = carry_forward(c.group, align_to_grid(&c, 2)).unwrap();
        assert_eq!(dense, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn curve_without_origin_is_rejected() {
        let c = curve(&[(3.0, 1.0)]);
        match carry_forward(c.group, align_to_grid(&c, 4)) {
            Err(EstimationError::MissingOrigin { time, .. }) => assert_eq!(time, 0),
            other => panic!("expected MissingOrigin, got {other:?}"),
        }
    }
}
