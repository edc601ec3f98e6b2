//! Sparse per-time weighted totals of censoring, events and competing events.
//!
//! Only times that carry at least one record appear; the dense grid is restored
//! much later by the grid normalizer.

use crate::types::{Arm, ArmPair, EventRecord, EventStatus, ResampleIndex};
use itertools::Itertools;

/// Weighted totals of every status observed at one time in one arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBucket {
    pub time: f64,
    pub censor_weight: f64,
    pub event_weight: f64,
    pub competing_weight: f64,
}

impl TimeBucket {
    fn empty(time: f64) -> Self {
        Self {
            time,
            censor_weight: 0.0,
            event_weight: 0.0,
            competing_weight: 0.0,
        }
    }

    fn add(&mut self, status: EventStatus, weight: f64) {
        match status {
            EventStatus::Censored => self.censor_weight += weight,
            EventStatus::Event => self.event_weight += weight,
            EventStatus::Competing => self.competing_weight += weight,
        }
    }
}

/// Time buckets for both arms of a resample, each strictly ascending in time.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTable {
    pub resample: ResampleIndex,
    pub buckets: ArmPair<Vec<TimeBucket>>,
}

/// Groups a resample's records by (arm, time) and sums weight per status.
pub fn build_event_table(resample: ResampleIndex, records: &[EventRecord]) -> EventTable {
    let buckets = ArmPair::from_fn(|arm| buckets_for_arm(arm, records));
    EventTable { resample, buckets }
}

fn buckets_for_arm(arm: Arm, records: &[EventRecord]) -> Vec<TimeBucket> {
    let mut arm_records: Vec<&EventRecord> = records.iter().filter(|r| r.arm == arm).collect();
    arm_records.sort_by(|a, b| a.time.total_cmp(&b.time));

    arm_records
        .into_iter()
        .chunk_by(|r| r.time)
        .into_iter()
        .map(|(time, group)| {
            group.fold(TimeBucket::empty(time), |mut bucket, r| {
                bucket.add(r.status, r.weight);
                bucket
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn record(arm: Arm, time: f64, status: EventStatus, weight: f64) -> EventRecord {
        EventRecord {
            resample: 2,
            subject_id: format!("s{time}"),
            time,
            status,
            arm,
            weight,
        }
    }

    #[test]
    fn buckets_are_sorted_and_unique() {
        let records = vec![
            record(Arm::Reference, 10.0, EventStatus::Event, 1.0),
            record(Arm::Reference, 5.0, EventStatus::Event, 1.0),
            record(Arm::Reference, 5.0, EventStatus::Event, 2.0),
            record(Arm::Reference, 5.0, EventStatus::Censored, 0.5),
            record(Arm::Reference, 7.5, EventStatus::Competing, 1.25),
            record(Arm::Treated, 3.0, EventStatus::Censored, 4.0),
        ];
        let table = build_event_table(2, &records);
        let reference = &table.buckets[Arm::Reference];
        let times: Vec<f64> = reference.iter().map(|b| b.time).collect();
        assert_eq!(times, vec![5.0, 7.5, 10.0]);

        assert_abs_diff_eq!(reference[0].event_weight, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(reference[0].censor_weight, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(reference[0].competing_weight, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(reference[1].competing_weight, 1.25, epsilon = 1e-12);

        let treated = &table.buckets[Arm::Treated];
        assert_eq!(treated.len(), 1);
        assert_abs_diff_eq!(treated[0].censor_weight, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn arm_without_records_has_no_buckets() {
        let records = vec![record(Arm::Treated, 1.0, EventStatus::Event, 1.0)];
        let table = build_event_table(0, &records);
        assert!(table.buckets[Arm::Reference].is_empty());
        assert_eq!(table.resample, 0);
    }
}
