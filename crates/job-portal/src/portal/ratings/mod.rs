//! Two-sided ratings and the aggregate kept on each receiver.

mod domain;
mod service;

pub use domain::{
    mean_rating, validate_value, Rating, RatingCategory, RatingSubmission, RatingWrite,
    MAX_RATING, MIN_RATING, UNRATED,
};
pub use service::RatingService;
