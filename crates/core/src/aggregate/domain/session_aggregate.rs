use serde::{Deserialize, Serialize};

use crate::detection::domain::face_result::Gender;

/// Running per-gender face totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderCount {
    pub female: u64,
    pub male: u64,
}

impl GenderCount {
    pub const fn new(female: u64, male: u64) -> Self {
        Self { female, male }
    }

    pub fn get(&self, gender: Gender) -> u64 {
        match gender {
            Gender::Female => self.female,
            Gender::Male => self.male,
        }
    }

    pub fn total(&self) -> u64 {
        self.female + self.male
    }
}

/// Working gender count for one detection session.
///
/// Owned by the pipeline for the lifetime of a session; the state store only
/// ever sees snapshots.
#[derive(Debug, Default)]
pub struct SessionAggregate {
    count: GenderCount,
}

impl SessionAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the working count with a copy of a previously published total.
    pub fn start_session(&mut self, carry_over: GenderCount) {
        self.count = carry_over;
    }

    /// Counts one face and returns the total as of this face.
    pub fn record_face(&mut self, gender: Gender) -> GenderCount {
        match gender {
            Gender::Female => self.count.female = self.count.female.saturating_add(1),
            Gender::Male => self.count.male = self.count.male.saturating_add(1),
        }
        self.count
    }

    pub fn reset(&mut self) {
        self.count = GenderCount::default();
    }

    pub fn current(&self) -> GenderCount {
        self.count
    }
}
