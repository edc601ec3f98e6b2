use crate::types::{Arm, GroupKey, ResampleIndex};
use thiserror::Error;

/// Fatal conditions raised by the estimator core. Any of these aborts the whole
/// run; no partial table is produced.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("resample {resample}: arm {arm} has no subjects, so no at-risk denominator exists")]
    DegenerateArm { resample: ResampleIndex, arm: Arm },

    #[error(
        "{group}: at-risk weight before time {time} is {at_risk}, leaving no valid denominator; check the supplied weights"
    )]
    NonPositiveAtRisk {
        group: GroupKey,
        time: f64,
        at_risk: f64,
    },

    #[error(
        "{group}: cumulative censoring and competing weight at time {time} exceeds the starting total {total} (at-risk weight {at_risk})"
    )]
    AttritionExceedsPopulation {
        group: GroupKey,
        time: f64,
        total: f64,
        at_risk: f64,
    },

    #[error("{group}: grid time {time} precedes every point of the curve, including its origin")]
    MissingOrigin { group: GroupKey, time: u32 },

    #[error("resample {resample} has no records in the input table")]
    MissingResample { resample: ResampleIndex },

    #[error("bootstrap replicate {resample} was not supplied; exactly {expected} replicates are required")]
    MissingReplicate {
        resample: ResampleIndex,
        expected: u32,
    },

    #[error("bootstrap replicate {resample} was supplied more than once")]
    DuplicateReplicate { resample: ResampleIndex },

    #[error("resample {resample} is not a bootstrap replicate in 1..={expected}")]
    UnexpectedReplicate {
        resample: ResampleIndex,
        expected: u32,
    },

    #[error("resample {resample} has no value at grid time {time}")]
    IncompleteReplicate { resample: ResampleIndex, time: u32 },

    #[error("resample {resample}: expected a grid of {expected} points but found {found}")]
    GridMismatch {
        resample: ResampleIndex,
        expected: usize,
        found: usize,
    },

    #[error("resample {resample}, subject '{subject_id}': {reason}")]
    InvalidRecord {
        resample: ResampleIndex,
        subject_id: String,
        reason: String,
    },
}
