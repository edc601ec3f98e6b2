//! # Core Record Types
//!
//! Plain data carried between the pipeline stages. Every stage consumes values
//! of these types by reference and produces new ones; nothing here is mutated
//! after construction by a later stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Index of a bootstrap resample. `0` is the original cohort.
pub type ResampleIndex = u32;

/// The resample index reserved for the original, un-resampled cohort.
pub const POINT_ESTIMATE_RESAMPLE: ResampleIndex = 0;

/// Outcome recorded on a single event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Censored,
    Event,
    Competing,
}

impl EventStatus {
    /// Decodes the fixed integer coding: 0 censored, 1 event, 2 competing.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Censored),
            1 => Some(Self::Event),
            2 => Some(Self::Competing),
            _ => None,
        }
    }

    /// Decodes either a textual label or a textual integer code.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "censored" => Some(Self::Censored),
            "event" => Some(Self::Event),
            "competing" => Some(Self::Competing),
            other => other.parse::<i64>().ok().and_then(Self::from_code),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Censored => "censored",
            Self::Event => "event",
            Self::Competing => "competing",
        })
    }
}

/// The two-level treatment grouping. Contrasts are always arm 1 relative to arm 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arm {
    /// Arm coded `0`; the denominator of the ratio contrast.
    Reference,
    /// Arm coded `1`.
    Treated,
}

impl Arm {
    pub const BOTH: [Arm; 2] = [Arm::Reference, Arm::Treated];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Reference),
            1 => Some(Self::Treated),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Reference => 0,
            Self::Treated => 1,
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A value held once per arm, indexable by [`Arm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmPair<T> {
    pub reference: T,
    pub treated: T,
}

impl<T> ArmPair<T> {
    pub fn new(reference: T, treated: T) -> Self {
        Self { reference, treated }
    }

    /// Builds both entries from a per-arm constructor.
    pub fn from_fn(mut build: impl FnMut(Arm) -> T) -> Self {
        let reference = build(Arm::Reference);
        let treated = build(Arm::Treated);
        Self { reference, treated }
    }

    /// Fallible variant of [`ArmPair::from_fn`]; stops at the first error.
    pub fn try_from_fn<E>(mut build: impl FnMut(Arm) -> Result<T, E>) -> Result<Self, E> {
        let reference = build(Arm::Reference)?;
        let treated = build(Arm::Treated)?;
        Ok(Self { reference, treated })
    }
}

impl<T> Index<Arm> for ArmPair<T> {
    type Output = T;

    fn index(&self, arm: Arm) -> &T {
        match arm {
            Arm::Reference => &self.reference,
            Arm::Treated => &self.treated,
        }
    }
}

impl<T> IndexMut<Arm> for ArmPair<T> {
    fn index_mut(&mut self, arm: Arm) -> &mut T {
        match arm {
            Arm::Reference => &mut self.reference,
            Arm::Treated => &mut self.treated,
        }
    }
}

/// One row of the resample-stacked event table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub resample: ResampleIndex,
    pub subject_id: String,
    pub time: f64,
    pub status: EventStatus,
    pub arm: Arm,
    pub weight: f64,
}

/// Identifies one sequential fold: a single arm within a single resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub resample: ResampleIndex,
    pub arm: Arm,
}

impl GroupKey {
    pub fn new(resample: ResampleIndex, arm: Arm) -> Self {
        Self { resample, arm }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resample {}, arm {}", self.resample, self.arm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_and_codes_agree() {
        assert_eq!(EventStatus::from_label("Event"), Some(EventStatus::Event));
        assert_eq!(EventStatus::from_label(" 2 "), Some(EventStatus::Competing));
        assert_eq!(EventStatus::from_label("0"), Some(EventStatus::Censored));
        assert_eq!(EventStatus::from_label("death"), None);
        assert_eq!(EventStatus::from_code(3), None);
    }

    #[test]
    fn arm_pair_indexes_by_arm() {
        let mut pair = ArmPair::new(1.0, 2.0);
        pair[Arm::Treated] += 1.0;
        assert_eq!(pair[Arm::Reference], 1.0);
        assert_eq!(pair[Arm::Treated], 3.0);
        assert_eq!(Arm::from_code(1), Some(Arm::Treated));
        assert_eq!(Arm::from_code(2), None);
    }

    #[test]
    fn try_from_fn_stops_at_first_error() {
        let mut visited = Vec::new();
        let result: Result<ArmPair<u8>, Arm> = ArmPair::try_from_fn(|arm| {
            visited.push(arm);
            Err(arm)
        });
        assert_eq!(result, Err(Arm::Reference));
        assert_eq!(visited, vec![Arm::Reference]);
    }
}
