use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::expression::{ExpressionProbabilities, InvalidExpressions};
use crate::shared::bounding_box::BoundingBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidFaceResult {
    #[error(transparent)]
    Expressions(#[from] InvalidExpressions),
    #[error("age must be a non-negative number, got {0}")]
    Age(f64),
    #[error("gender probability must be within [0, 1], got {0}")]
    GenderProbability(f64),
}

/// One detected face as returned by the inference gateway for one cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFaceResult {
    pub bounding_box: BoundingBox,
    pub expressions: ExpressionProbabilities,
    pub age: f64,
    pub gender: Gender,
    pub gender_probability: f64,
}

impl RawFaceResult {
    /// Checks the scalar fields; expression probabilities are already
    /// validated when they are built.
    pub fn validate(&self) -> Result<(), InvalidFaceResult> {
        if !(self.age >= 0.0 && self.age.is_finite()) {
            return Err(InvalidFaceResult::Age(self.age));
        }
        if !(0.0..=1.0).contains(&self.gender_probability) {
            return Err(InvalidFaceResult::GenderProbability(
                self.gender_probability,
            ));
        }
        Ok(())
    }
}
