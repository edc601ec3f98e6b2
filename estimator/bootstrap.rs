//! Bootstrap spread of the replicate curves.
//!
//! Only resamples `1..=B` take part; resample 0 supplies the point estimate and is
//! rejected here. Every replicate must cover the full grid, so the standard
//! deviation at every time is taken over exactly `B` values.

use crate::contrast::{ContrastCurve, ContrastPoint};
use crate::error::EstimationError;
use crate::types::ResampleIndex;
use ndarray::{Array1, Array2, Axis};

/// The four reported quantities at each grid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    MccReference,
    MccTreated,
    Difference,
    Ratio,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::MccReference,
        Metric::MccTreated,
        Metric::Difference,
        Metric::Ratio,
    ];

    pub fn of(self, point: &ContrastPoint) -> f64 {
        match self {
            Self::MccReference => point.mcc_reference,
            Self::MccTreated => point.mcc_treated,
            Self::Difference => point.difference,
            Self::Ratio => point.ratio,
        }
    }

    /// Column name used in output tables.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::MccReference => "MCC_arm0",
            Self::MccTreated => "MCC_arm1",
            Self::Difference => "MCCD",
            Self::Ratio => "MCCR",
        }
    }
}

/// Bootstrap standard deviation of each metric at one grid time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StandardErrors {
    pub mcc_reference: f64,
    pub mcc_treated: f64,
    pub difference: f64,
    pub ratio: f64,
}

impl StandardErrors {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::MccReference => self.mcc_reference,
            Metric::MccTreated => self.mcc_treated,
            Metric::Difference => self.difference,
            Metric::Ratio => self.ratio,
        }
    }

    fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::MccReference => self.mcc_reference = value,
            Metric::MccTreated => self.mcc_treated = value,
            Metric::Difference => self.difference = value,
            Metric::Ratio => self.ratio = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSpread {
    /// Number of replicates the deviations were taken over (`B`).
    pub replicate_count: usize,
    /// Set when `B == 1`: the Bessel divisor is zero, so every deviation is
    /// reported as 0 rather than computed.
    pub degenerate: bool,
    /// One entry per grid time, ascending.
    pub standard_errors: Vec<StandardErrors>,
}

/// Orders the replicates by resample index after checking that exactly the
/// resamples `1..=resample_count` are present, once each, each covering the grid.
fn order_replicates(
    replicates: &[ContrastCurve],
    resample_count: u32,
    grid_len: usize,
) -> Result<Vec<&ContrastCurve>, EstimationError> {
    let mut slots: Vec<Option<&ContrastCurve>> = vec![None; resample_count as usize];

    for curve in replicates {
        let resample = curve.resample;
        if resample == 0 || resample > resample_count {
            return Err(EstimationError::UnexpectedReplicate {
                resample,
                expected: resample_count,
            });
        }
        check_grid_coverage(curve, grid_len)?;
        let slot = &mut slots[resample as usize - 1];
        if slot.is_some() {
            return Err(EstimationError::DuplicateReplicate { resample });
        }
        *slot = Some(curve);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.ok_or(EstimationError::MissingReplicate {
                resample: idx as ResampleIndex + 1,
                expected: resample_count,
            })
        })
        .collect()
}

fn check_grid_coverage(curve: &ContrastCurve, grid_len: usize) -> Result<(), EstimationError> {
    if curve.points.len() > grid_len {
        return Err(EstimationError::GridMismatch {
            resample: curve.resample,
            expected: grid_len,
            found: curve.points.len(),
        });
    }
    for expected_time in 0..grid_len {
        match curve.points.get(expected_time) {
            Some(point) if point.time as usize == expected_time => {}
            _ => {
                return Err(EstimationError::IncompleteReplicate {
                    resample: curve.resample,
                    time: expected_time as u32,
                });
            }
        }
    }
    Ok(())
}

/// Computes the Bessel-corrected standard deviation of every metric at every grid
/// time across the `B` replicates.
pub fn aggregate_replicates(
    replicates: &[ContrastCurve],
    resample_count: u32,
    grid_len: usize,
) -> Result<BootstrapSpread, EstimationError> {
    let ordered = order_replicates(replicates, resample_count, grid_len)?;
    let replicate_count = ordered.len();
    let mut standard_errors = vec![StandardErrors::default(); grid_len];

    if replicate_count < 2 {
        log::warn!(
            "Only {replicate_count} bootstrap replicate supplied; the B-1 divisor is zero, so standard errors are reported as 0 and intervals collapse to the point estimates"
        );
        return Ok(BootstrapSpread {
            replicate_count,
            degenerate: true,
            standard_errors,
        });
    }

    for metric in Metric::ALL {
        let values = Array2::from_shape_fn((replicate_count, grid_len), |(row, time)| {
            metric.of(&ordered[row].points[time])
        });
        let deviations: Array1<f64> = values.std_axis(Axis(0), 1.0);
        for (entry, &sd) in standard_errors.iter_mut().zip(deviations.iter()) {
            entry.set(metric, sd);
        }
    }

    Ok(BootstrapSpread {
        replicate_count,
        degenerate: false,
        standard_errors,
    })
}
