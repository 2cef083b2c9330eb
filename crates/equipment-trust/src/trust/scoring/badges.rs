use std::collections::BTreeSet;

use super::super::domain::{Badge, Owner};
use super::super::thresholds::{
    FAST_RESPONDER_MAX_HOURS, RELIABLE_MIN_RESPONSE_RATE, TOP_RATED_MIN_AVERAGE,
    TOP_RATED_MIN_REVIEWS,
};
use super::aggregates::{ResponseAggregate, ReviewAggregate};

/// Evaluate every badge independently from fresh aggregates.
pub(crate) fn evaluate_badges(
    owner: &Owner,
    responses: &ResponseAggregate,
    reviews: &ReviewAggregate,
) -> BTreeSet<Badge> {
    let mut badges = BTreeSet::new();

    if owner.is_business_verified() {
        badges.insert(Badge::VerifiedBusiness);
    }
    if owner.identity_verified {
        badges.insert(Badge::VerifiedIdentity);
    }
    if responses
        .avg_response_time_hours
        .is_some_and(|hours| hours <= FAST_RESPONDER_MAX_HOURS)
    {
        badges.insert(Badge::FastResponder);
    }
    if responses.total_leads > 0 && responses.response_rate() >= RELIABLE_MIN_RESPONSE_RATE {
        badges.insert(Badge::Reliable);
    }
    if reviews.total_reviews >= TOP_RATED_MIN_REVIEWS
        && reviews
            .average_rating
            .is_some_and(|average| average >= TOP_RATED_MIN_AVERAGE)
    {
        badges.insert(Badge::TopRated);
    }

    badges
}
