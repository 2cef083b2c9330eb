//! Fixed business thresholds. These are part of the published contract with
//! renderers and search ranking, so they are constants rather than config.

use chrono::Duration;

/// Days after a lead before its review request opens.
pub const REVIEW_DELAY_DAYS: i64 = 7;
/// Days a review request stays submittable once open.
pub const REVIEW_EXPIRY_DAYS: i64 = 30;

pub const FAST_RESPONDER_MAX_HOURS: f64 = 2.0;
pub const RELIABLE_MIN_RESPONSE_RATE: f64 = 95.0;
pub const TOP_RATED_MIN_AVERAGE: f64 = 4.5;
pub const TOP_RATED_MIN_REVIEWS: u32 = 10;

pub const RESPONSE_WEIGHT: f64 = 0.40;
pub const REVIEW_WEIGHT: f64 = 0.30;
pub const LISTING_WEIGHT: f64 = 0.20;
/// Flat bonus for a verified owner, added after weighting.
pub const VERIFICATION_BONUS: u8 = 10;

/// Below this many reviews the review score is scaled toward zero.
pub const REVIEW_DAMPENING_COUNT: u32 = 5;
pub const NEUTRAL_REVIEW_SCORE: f64 = 50.0;
pub const NEUTRAL_LISTING_SCORE: f64 = 50.0;

pub const PHOTO_CAP: u32 = 5;
pub const GOOD_DESCRIPTION_CHARS: usize = 100;
pub const EXCELLENT_DESCRIPTION_CHARS: usize = 300;
pub const SECONDARY_DESCRIPTION_BONUS: u8 = 20;

pub const PHOTO_WEIGHT: f64 = 0.40;
pub const DESCRIPTION_WEIGHT: f64 = 0.35;
pub const SPECIFICATION_WEIGHT: f64 = 0.25;

pub fn review_delay() -> Duration {
    Duration::days(REVIEW_DELAY_DAYS)
}

pub fn review_expiry() -> Duration {
    Duration::days(REVIEW_EXPIRY_DAYS)
}
