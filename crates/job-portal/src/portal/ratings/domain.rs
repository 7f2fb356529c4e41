use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::portal::domain::{RatingId, Role, UserId};
use crate::portal::validation::ValidationError;

/// Aggregate reported for a receiver nobody has rated yet.
pub const UNRATED: f32 = -1.0;
pub const MIN_RATING: f32 = -1.0;
pub const MAX_RATING: f32 = 5.0;

/// What is being rated: a job (by its applicants) or an applicant (by recruiters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingCategory {
    Job,
    Applicant,
}

impl RatingCategory {
    pub const fn rater_role(self) -> Role {
        match self {
            RatingCategory::Job => Role::Applicant,
            RatingCategory::Applicant => Role::Recruiter,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RatingCategory::Job => "job",
            RatingCategory::Applicant => "applicant",
        }
    }
}

impl fmt::Display for RatingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub category: RatingCategory,
    /// A `JobId` or an applicant's `UserId`, depending on the category.
    pub receiver_id: Uuid,
    pub sender_id: UserId,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub category: RatingCategory,
    pub receiver_id: Uuid,
    #[serde(alias = "rating")]
    pub value: f32,
}

/// Outcome of an upsert: the stored row, whether it was new, and the receiver's refreshed mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingWrite {
    pub rating: Rating,
    pub created: bool,
    pub aggregate: f32,
}

pub fn validate_value(value: f32) -> Result<f32, ValidationError> {
    if !value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(ValidationError::new(
            "rating",
            format!("must be between {MIN_RATING} and {MAX_RATING}"),
        ));
    }
    Ok(value)
}

/// Mean of the non-negative values; `UNRATED` when there are none.
pub fn mean_rating<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|value| *value >= 0.0)
        .fold((0.0_f64, 0_u32), |(sum, count), value| {
            (sum + f64::from(value), count + 1)
        });

    if count == 0 {
        UNRATED
    } else {
        (sum / f64::from(count)) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_ignores_withheld_ratings() {
        assert_eq!(mean_rating([4.0, -1.0, 2.0]), 3.0);
        assert_eq!(mean_rating([-1.0, -1.0]), UNRATED);
        assert_eq!(mean_rating(Vec::new()), UNRATED);
    }

    #[test]
    fn values_outside_the_scale_are_rejected() {
        assert_eq!(validate_value(0.0), Ok(0.0));
        assert_eq!(validate_value(-1.0), Ok(-1.0));
        assert!(validate_value(5.5).is_err());
        assert!(validate_value(-1.5).is_err());
        assert!(validate_value(f32::NAN).is_err());
    }

    #[test]
    fn each_category_has_one_rater_role() {
        assert_eq!(RatingCategory::Job.rater_role(), Role::Applicant);
        assert_eq!(RatingCategory::Applicant.rater_role(), Role::Recruiter);
    }
}
