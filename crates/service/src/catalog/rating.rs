//! Average rating of a review snapshot.
//!
//! The mean is rounded to one decimal place, half away from zero
//! (`3.25 -> 3.3`, `3.35 -> 3.4`). Ratings are integers, so the rounding is
//! done on the exact rational `sum / count` and never sees float error.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: u64,
}

/// Mean rounded to one decimal; `0.0` for no ratings.
pub fn average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let count = ratings.len() as i128;
    let sum: i128 = ratings.iter().map(|&r| i128::from(r)).sum();
    // round(|sum| * 10 / count) half up, then restore the sign
    let tenths = (sum.abs() * 20 + count) / (2 * count);
    let tenths = if sum < 0 { -tenths } else { tenths };
    tenths as f64 / 10.0
}

pub fn summarize(ratings: &[i32]) -> RatingSummary {
    RatingSummary { average_rating: average(ratings), review_count: ratings.len() as u64 }
}
