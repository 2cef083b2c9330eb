use super::super::domain::{Lead, Listing, QualityScore, RatingBreakdown, Review};

/// Lead responsiveness over every lead the owner received.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResponseAggregate {
    pub total_leads: u32,
    pub responded_leads: u32,
    /// Mean over leads carrying a response timestamp.
    pub avg_response_time_hours: Option<f64>,
}

impl ResponseAggregate {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let total_leads = leads.len() as u32;
        let responded_leads = leads.iter().filter(|lead| lead.is_responded()).count() as u32;
        let response_times: Vec<f64> = leads
            .iter()
            .filter_map(Lead::response_time_hours)
            .collect();

        Self {
            total_leads,
            responded_leads,
            avg_response_time_hours: mean(&response_times),
        }
    }

    /// Percentage of leads answered; zero when there are none.
    pub fn response_rate(&self) -> f64 {
        if self.total_leads == 0 {
            return 0.0;
        }
        f64::from(self.responded_leads) / f64::from(self.total_leads) * 100.0
    }
}

/// Rating summary over reviews that count toward reputation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReviewAggregate {
    pub total_reviews: u32,
    pub average_rating: Option<f64>,
    pub breakdown: RatingBreakdown,
}

impl ReviewAggregate {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut breakdown = RatingBreakdown::default();
        let mut stars = Vec::new();
        for review in reviews
            .iter()
            .filter(|review| review.status.counts_toward_reputation())
        {
            breakdown.record(review.rating);
            stars.push(f64::from(review.rating.stars()));
        }

        Self {
            total_reviews: breakdown.total(),
            average_rating: mean(&stars),
            breakdown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ListingAggregate {
    pub total_listings: u32,
    pub active_listings: u32,
    /// Mean overall quality across active listings that have been scored.
    pub avg_quality_score: Option<f64>,
}

impl ListingAggregate {
    /// `scores` holds the stored quality rows for the active listings.
    pub fn from_listings(listings: &[Listing], scores: &[QualityScore]) -> Self {
        let overall: Vec<f64> = scores
            .iter()
            .map(|score| f64::from(score.overall_score))
            .collect();

        Self {
            total_listings: listings.len() as u32,
            active_listings: listings.iter().filter(|listing| listing.is_active()).count() as u32,
            avg_quality_score: mean(&overall),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
