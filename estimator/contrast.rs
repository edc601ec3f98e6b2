//! Arm contrasts on the normalized grid: difference and ratio of MCC.

use crate::grid::CurveGrid;
use crate::types::ResampleIndex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastPoint {
    pub time: u32,
    pub mcc_reference: f64,
    pub mcc_treated: f64,
    /// `mcc_treated - mcc_reference`.
    pub difference: f64,
    /// `mcc_treated / mcc_reference`, or 1.0 where that ratio is undefined.
    pub ratio: f64,
}

/// One resample's contrasts at every grid time, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastCurve {
    pub resample: ResampleIndex,
    pub points: Vec<ContrastPoint>,
}

/// Ratio with the unity convention: any zero, missing or non-finite quotient
/// resolves to 1.0. This also maps `x / 0` with `x > 0` to 1.0.
pub fn ratio_or_unity(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(num), Some(den)) if den != 0.0 => {
            let ratio = num / den;
            if ratio.is_finite() { ratio } else { 1.0 }
        }
        _ => 1.0,
    }
}

pub fn compute_contrasts(grid: &CurveGrid) -> ContrastCurve {
    let points = grid
        .mcc
        .reference
        .iter()
        .zip(&grid.mcc.treated)
        .enumerate()
        .map(|(time, (&reference, &treated))| ContrastPoint {
            time: time as u32,
            mcc_reference: reference,
            mcc_treated: treated,
            difference: treated - reference,
            ratio: ratio_or_unity(Some(treated), Some(reference)),
        })
        .collect();
    ContrastCurve {
        resample: grid.resample,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArmPair;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_denominator_resolves_to_one() {
        assert_eq!(ratio_or_unity(Some(0.0), Some(0.0)), 1.0);
        assert_eq!(ratio_or_unity(Some(2.0), Some(0.0)), 1.0);
        assert_eq!(ratio_or_unity(None, Some(1.0)), 1.0);
        assert_eq!(ratio_or_unity(Some(1.0), None), 1.0);
        assert_eq!(ratio_or_unity(Some(f64::NAN), Some(1.0)), 1.0);
        assert_abs_diff_eq!(ratio_or_unity(Some(3.0), Some(2.0)), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn contrasts_follow_grid_order() {
        let grid = CurveGrid {
            resample: 7,
            mcc: ArmPair::new(vec![0.0, 0.5, 1.0], vec![0.0, 0.25, 1.5]),
        };
        let curve = compute_contrasts(&grid);
        assert_eq!(curve.resample, 7);
        assert_eq!(curve.points.len(), 3);
        assert_eq!(curve.points[0].ratio, 1.0);
        assert_eq!(curve.points[0].difference, 0.0);
        assert_abs_diff_eq!(curve.points[1].difference, -0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.points[1].ratio, 0.5, epsilon = 1e-12);
        assert_eq!(curve.points[2].time, 2);
        assert_abs_diff_eq!(curve.points[2].ratio, 1.5, epsilon = 1e-12);
    }
}
