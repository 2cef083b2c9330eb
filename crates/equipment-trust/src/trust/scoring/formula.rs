use super::super::domain::ScoreBreakdown;
use super::super::thresholds::{
    LISTING_WEIGHT, NEUTRAL_LISTING_SCORE, NEUTRAL_REVIEW_SCORE, RESPONSE_WEIGHT,
    REVIEW_DAMPENING_COUNT, REVIEW_WEIGHT, VERIFICATION_BONUS,
};
use super::aggregates::{ListingAggregate, ResponseAggregate, ReviewAggregate};

/// Response rate adjusted by how quickly the owner answers.
pub(crate) fn response_score(responses: &ResponseAggregate) -> f64 {
    if responses.total_leads == 0 {
        return 100.0;
    }

    let mut score = responses.response_rate();
    if let Some(hours) = responses.avg_response_time_hours {
        if hours <= 1.0 {
            score += 10.0;
        } else if hours <= 2.0 {
            score += 5.0;
        } else if hours > 24.0 {
            score -= 10.0;
        }
    }
    score.clamp(0.0, 100.0)
}

/// Average rating mapped onto `[0, 100]`, scaled down while reviews are scarce.
pub(crate) fn review_score(reviews: &ReviewAggregate) -> f64 {
    let average = match reviews.average_rating {
        Some(average) if reviews.total_reviews > 0 => average,
        _ => return NEUTRAL_REVIEW_SCORE,
    };

    let mut score = ((average - 1.0) / 4.0 * 100.0).clamp(0.0, 100.0);
    if reviews.total_reviews < REVIEW_DAMPENING_COUNT {
        score *= f64::from(reviews.total_reviews) / f64::from(REVIEW_DAMPENING_COUNT);
    }
    score
}

pub(crate) fn listing_score(listings: &ListingAggregate) -> f64 {
    listings
        .avg_quality_score
        .map(|score| score.clamp(0.0, 100.0))
        .unwrap_or(NEUTRAL_LISTING_SCORE)
}

pub(crate) fn score_breakdown(
    responses: &ResponseAggregate,
    reviews: &ReviewAggregate,
    listings: &ListingAggregate,
    is_verified: bool,
) -> ScoreBreakdown {
    ScoreBreakdown {
        response: response_score(responses),
        review: review_score(reviews),
        listing: listing_score(listings),
        verification_bonus: if is_verified { VERIFICATION_BONUS } else { 0 },
    }
}

pub(crate) fn trust_score(breakdown: &ScoreBreakdown) -> u8 {
    let weighted = breakdown.response * RESPONSE_WEIGHT
        + breakdown.review * REVIEW_WEIGHT
        + breakdown.listing * LISTING_WEIGHT
        + f64::from(breakdown.verification_bonus);
    weighted.round().clamp(0.0, 100.0) as u8
}
