//! Initial risk-set sizes: the total weight of distinct subjects per arm.
//!
//! This pass runs over the full record set of a resample before any time-indexed
//! work, because every at-risk value downstream is derived from it.

use crate::error::EstimationError;
use crate::types::{Arm, ArmPair, EventRecord, ResampleIndex};
use ahash::AHashSet;

/// Starting risk-set weight for both arms of one resample. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmWeightTotals {
    pub resample: ResampleIndex,
    pub weight: ArmPair<f64>,
    pub subjects: ArmPair<usize>,
}

impl ArmWeightTotals {
    pub fn total(&self, arm: Arm) -> f64 {
        self.weight[arm]
    }
}

/// Sums the weight of each distinct subject once, using the subject's first record
/// in the slice for both its arm and its weight.
///
/// Fails if either arm ends up with no subjects.
pub fn total_arm_weights(
    resample: ResampleIndex,
    records: &[EventRecord],
) -> Result<ArmWeightTotals, EstimationError> {
    let mut seen: AHashSet<&str> = AHashSet::with_capacity(records.len());
    let mut weight = ArmPair::new(0.0, 0.0);
    let mut subjects = ArmPair::new(0usize, 0usize);

    for record in records {
        if seen.insert(record.subject_id.as_str()) {
            weight[record.arm] += record.weight;
            subjects[record.arm] += 1;
        }
    }

    for arm in Arm::BOTH {
        if subjects[arm] == 0 {
            return Err(EstimationError::DegenerateArm { resample, arm });
        }
    }

    log::debug!(
        "resample {resample}: arm 0 total weight {:.4} over {} subjects, arm 1 total weight {:.4} over {} subjects",
        weight.reference,
        subjects.reference,
        weight.treated,
        subjects.treated
    );

    Ok(ArmWeightTotals {
        resample,
        weight,
        subjects,
    })
}
