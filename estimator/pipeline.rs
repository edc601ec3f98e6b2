// ========================================================================================
//
//                       THE RESAMPLE PIPELINE AND ITS ORCHESTRATION
//
// ========================================================================================
//
// Each resample index owns an independent pipeline (weight totals, event table,
// risk-set fold, survival fold, MCC fold, grid normalization, contrasts). These
// pipelines share nothing and run on the rayon pool. Inside a pipeline every
// (resample, arm) fold is sequential. Aggregation waits for all pipelines, then runs
// once on the calling thread.

use crate::bootstrap::{BootstrapSpread, aggregate_replicates};
use crate::config::EstimatorConfig;
use crate::contrast::{ContrastCurve, compute_contrasts};
use crate::error::EstimationError;
use crate::event_table::build_event_table;
use crate::grid::{CurveGrid, normalize_curves};
use crate::interval::{FinalEstimate, build_confidence_intervals};
use crate::mcc::{MccCurve, accumulate_mcc};
use crate::progress::ResampleProgress;
use crate::risk_set::accumulate_risk_sets;
use crate::survival::build_survival_curve;
use crate::totals::{ArmWeightTotals, total_arm_weights};
use crate::types::{Arm, ArmPair, EventRecord, GroupKey, POINT_ESTIMATE_RESAMPLE, ResampleIndex};
use ahash::AHashMap;
use rayon::prelude::*;

/// Everything one resample pipeline produces.
#[derive(Debug, Clone)]
pub struct ResampleEstimate {
    pub resample: ResampleIndex,
    pub totals: ArmWeightTotals,
    pub curves: ArmPair<MccCurve>,
    pub grid: CurveGrid,
    pub contrasts: ContrastCurve,
}

/// The complete result of a run.
#[derive(Debug, Clone)]
pub struct EstimationReport {
    pub config: EstimatorConfig,
    /// Arm weight totals of the original cohort.
    pub point_totals: ArmWeightTotals,
    pub point_estimate: ContrastCurve,
    /// Contrast curves of resamples `1..=B`, ascending by index.
    pub replicates: Vec<ContrastCurve>,
    pub spread: BootstrapSpread,
    pub estimates: Vec<FinalEstimate>,
}

/// Checks per-record domains, and that each subject keeps the arm of its first
/// record throughout the resample.
fn validate_records(
    resample: ResampleIndex,
    records: &[EventRecord],
) -> Result<(), EstimationError> {
    let mut subject_arms: AHashMap<&str, Arm> = AHashMap::with_capacity(records.len());
    for record in records {
        let first_arm = *subject_arms
            .entry(record.subject_id.as_str())
            .or_insert(record.arm);
        let reason = if record.resample != resample {
            Some(format!("record tagged with resample {}", record.resample))
        } else if !record.time.is_finite() || record.time < 0.0 {
            Some(format!("time {} is not a finite non-negative value", record.time))
        } else if !record.weight.is_finite() || record.weight < 0.0 {
            Some(format!(
                "weight {} is not a finite non-negative value",
                record.weight
            ))
        } else if record.arm != first_arm {
            Some(format!(
                "arm {} differs from arm {first_arm} of the subject's first record",
                record.arm
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(EstimationError::InvalidRecord {
                resample,
                subject_id: record.subject_id.clone(),
                reason,
            });
        }
    }
    Ok(())
}

/// Runs every per-resample stage for one resample's records.
pub fn estimate_resample(
    resample: ResampleIndex,
    records: &[EventRecord],
    end_of_followup: u32,
) -> Result<ResampleEstimate, EstimationError> {
    validate_records(resample, records)?;
    let totals = total_arm_weights(resample, records)?;
    let table = build_event_table(resample, records);

    let curves = ArmPair::try_from_fn(|arm| {
        let group = GroupKey::new(resample, arm);
        let states = accumulate_risk_sets(group, totals.total(arm), &table.buckets[arm])?;
        let survival = build_survival_curve(group, &states)?;
        accumulate_mcc(group, &states, &survival)
    })?;

    let grid = normalize_curves(resample, &curves, end_of_followup)?;
    let contrasts = compute_contrasts(&grid);

    log::debug!(
        "resample {resample}: final MCC arm 0 = {:.4}, arm 1 = {:.4}",
        curves.reference.final_value(),
        curves.treated.final_value()
    );

    Ok(ResampleEstimate {
        resample,
        totals,
        curves,
        grid,
        contrasts,
    })
}

/// Splits the stacked table into one record list per resample `0..=resample_count`,
/// keeping input order within each. Higher indices are ignored.
pub fn partition_by_resample(
    records: Vec<EventRecord>,
    resample_count: u32,
) -> Result<Vec<Vec<EventRecord>>, EstimationError> {
    let mut partitions: Vec<Vec<EventRecord>> = vec![Vec::new(); resample_count as usize + 1];
    let mut ignored = 0usize;
    for record in records {
        match partitions.get_mut(record.resample as usize) {
            Some(partition) => partition.push(record),
            None => ignored += 1,
        }
    }
    if ignored > 0 {
        log::warn!(
            "Ignoring {ignored} records tagged with resample indices above {resample_count}"
        );
    }
    if let Some(resample) = partitions.iter().position(|p| p.is_empty()) {
        return Err(EstimationError::MissingResample {
            resample: resample as ResampleIndex,
        });
    }
    Ok(partitions)
}

/// Runs the full estimation: all resample pipelines in parallel, then the bootstrap
/// aggregation and interval construction. The first failing resample aborts the run.
pub fn run_estimation(
    records: Vec<EventRecord>,
    config: &EstimatorConfig,
    progress: &dyn ResampleProgress,
) -> Result<EstimationReport, EstimationError> {
    let partitions = partition_by_resample(records, config.resample_count)?;
    log::info!(
        "Estimating MCC for the original cohort and {} bootstrap replicates on times 0..={}",
        config.resample_count,
        config.end_of_followup
    );

    progress.on_start(partitions.len());
    let end_of_followup = config.end_of_followup;
    let results = partitions
        .into_par_iter()
        .enumerate()
        .map(|(idx, records)| {
            let resample = idx as ResampleIndex;
            let estimate = estimate_resample(resample, &records, end_of_followup)?;
            progress.on_resample_finished(resample);
            Ok((estimate.totals, estimate.contrasts))
        })
        .collect::<Result<Vec<_>, EstimationError>>();
    progress.on_finish();
    let mut results = results?.into_iter();

    let (point_totals, point_estimate) =
        results
            .next()
            .ok_or(EstimationError::MissingResample {
                resample: POINT_ESTIMATE_RESAMPLE,
            })?;
    let replicates: Vec<ContrastCurve> = results.map(|(_, contrasts)| contrasts).collect();

    let spread = aggregate_replicates(&replicates, config.resample_count, config.grid_len())?;
    let estimates = build_confidence_intervals(&point_estimate, &spread)?;

    log::info!(
        "Estimation complete: {} grid times, {} replicates{}",
        estimates.len(),
        spread.replicate_count,
        if spread.degenerate {
            " (degenerate spread)"
        } else {
            ""
        }
    );

    Ok(EstimationReport {
        config: *config,
        point_totals,
        point_estimate,
        replicates,
        spread,
        estimates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;
    use crate::types::{Arm, EventStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(
        resample: ResampleIndex,
        subject: &str,
        arm: Arm,
        time: f64,
        status: EventStatus,
    ) -> EventRecord {
        EventRecord {
            resample,
            subject_id: subject.to_string(),
            time,
            status,
            arm,
            weight: 1.0,
        }
    }

    fn cohort(resample: ResampleIndex) -> Vec<EventRecord> {
        vec![
            record(resample, "a", Arm::Reference, 2.0, EventStatus::Event),
            record(resample, "a", Arm::Reference, 4.0, EventStatus::Censored),
            record(resample, "b", Arm::Reference, 3.0, EventStatus::Competing),
            record(resample, "c", Arm::Treated, 1.0, EventStatus::Event),
            record(resample, "c", Arm::Treated, 2.0, EventStatus::Event),
            record(resample, "c", Arm::Treated, 5.0, EventStatus::Censored),
            record(resample, "d", Arm::Treated, 5.0, EventStatus::Censored),
        ]
    }

    #[test]
    fn partitions_require_every_index() {
        let mut records = cohort(0);
        records.extend(cohort(2));
        let err = partition_by_resample(records, 2).unwrap_err();
        assert!(matches!(err, EstimationError::MissingResample { resample: 1 }));
    }

    #[test]
    fn partitions_ignore_indices_above_the_requested_count() {
        let mut records = cohort(0);
        records.extend(cohort(1));
        records.extend(cohort(2));
        let partitions = partition_by_resample(records, 1).unwrap();
        assert_eq!(partitions.len(), 2);
        assert!(partitions[1].iter().all(|r| r.resample == 1));
    }

    #[test]
    fn resample_pipeline_produces_full_grid() {
        let estimate = estimate_resample(0, &cohort(0), 6).unwrap();
        assert_eq!(estimate.grid.len(), 7);
        assert_eq!(estimate.contrasts.points.len(), 7);
        // Arm 0: one event among two subjects at t=2.
        assert_eq!(estimate.grid.mcc[Arm::Reference][2], 0.5);
        // Arm 1: events at t=1 and t=2 among two subjects.
        assert_eq!(estimate.grid.mcc[Arm::Treated][1], 0.5);
        assert_eq!(estimate.grid.mcc[Arm::Treated][6], 1.0);
        assert_eq!(estimate.contrasts.points[6].ratio, 2.0);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut records = cohort(0);
        records[1].weight = -1.0;
        let err = estimate_resample(0, &records, 6).unwrap_err();
        assert!(matches!(err, EstimationError::InvalidRecord { resample: 0, .. }));
    }

    #[test]
    fn subject_switching_arm_is_rejected() {
        let mut records = cohort(0);
        let moved = records
            .iter()
            .position(|r| r.subject_id == "a" && r.time == 4.0)
            .unwrap();
        records[moved].arm = Arm::Treated;
        match estimate_resample(0, &records, 6).unwrap_err() {
            EstimationError::InvalidRecord {
                resample,
                subject_id,
                reason,
            } => {
                assert_eq!(resample, 0);
                assert_eq!(subject_id, "a");
                assert!(reason.contains("arm 1"), "reason was: {reason}");
            }
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    struct CountingProgress(AtomicUsize);

    impl ResampleProgress for CountingProgress {
        fn on_resample_finished(&self, resample: u32) {
            let _ = resample;
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn identical_replicates_give_zero_spread() {
        let mut records = Vec::new();
        for resample in 0..=3 {
            records.extend(cohort(resample));
        }
        let config = EstimatorConfig::new(3, 6).unwrap();
        let progress = CountingProgress(AtomicUsize::new(0));
        let report = run_estimation(records, &config, &progress).unwrap();

        assert_eq!(progress.0.load(Ordering::Relaxed), 4);
        assert_eq!(report.replicates.len(), 3);
        assert_eq!(report.estimates.len(), 7);
        assert!(report.estimates.iter().all(|row| row.difference.width() == 0.0));
        assert_eq!(report.point_totals.weight, ArmPair::new(2.0, 2.0));
    }

    #[test]
    fn failing_replicate_aborts_the_run() {
        let mut records = cohort(0);
        let mut broken = cohort(1);
        broken.retain(|r| r.arm == Arm::Treated);
        records.extend(broken);
        let config = EstimatorConfig::new(1, 6).unwrap();
        let err = run_estimation(records, &config, &NoopProgress).unwrap_err();
        assert!(matches!(
            err,
            EstimationError::DegenerateArm {
                resample: 1,
                arm: Arm::Reference
            }
        ));
    }
}
