use chrono::{DateTime, Utc};

use super::domain::{
    Lead, LeadId, Listing, ListingId, Owner, QualityScore, RatingBreakdown, Review, ReviewId,
    ReviewRequest, TrustMetrics, UserId,
};

/// Read access to the marketplace entities the engine scores.
pub trait MarketplaceStore: Send + Sync {
    fn owner(&self, id: &UserId) -> Result<Option<Owner>, StoreError>;
    fn listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError>;
    fn listings_for_owner(&self, owner: &UserId) -> Result<Vec<Listing>, StoreError>;
    fn lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;
    fn leads_for_owner(&self, owner: &UserId) -> Result<Vec<Lead>, StoreError>;
    /// Stores the first owner response. Returns `false` when one was already recorded.
    fn record_lead_response(
        &self,
        id: &LeadId,
        responded_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Review requests and reviews. Both are unique per lead.
pub trait ReviewStore: Send + Sync {
    fn review_request_for_lead(&self, lead: &LeadId) -> Result<Option<ReviewRequest>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when the lead already has a request.
    fn insert_review_request(&self, request: ReviewRequest) -> Result<(), StoreError>;
    /// Sets `invited_at` on the lead's request while it is neither completed nor
    /// already invited. Returns whether it wrote.
    fn mark_review_request_invited(
        &self,
        lead: &LeadId,
        invited_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
    /// Sets `completed_at` on the lead's request unless it is already set.
    /// Returns whether it wrote.
    fn complete_review_request(
        &self,
        lead: &LeadId,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
    /// Open requests (`sent_at <= now`, not completed, not expired) never handed to the
    /// notifier, whose lead, listing and owner all still exist.
    fn due_review_requests(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReviewRequest>, StoreError>;
    fn count_expired_review_requests(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
    fn review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError>;
    fn review_for_lead(&self, lead: &LeadId) -> Result<Option<Review>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when the lead already has a review.
    fn insert_review(&self, review: Review) -> Result<(), StoreError>;
    /// Stores the owner's reply. Fails with [`StoreError::Conflict`] when one exists.
    fn record_review_response(
        &self,
        id: &ReviewId,
        response: String,
        responded_at: DateTime<Utc>,
    ) -> Result<Review, StoreError>;
    /// Moves the review to `Flagged`, touching only its status and reason.
    fn flag_review(&self, id: &ReviewId, reason: String) -> Result<Review, StoreError>;
    fn reviews_for_owner(&self, owner: &UserId) -> Result<Vec<Review>, StoreError>;
}

/// Derived score rows. Every write replaces the full row for its key.
pub trait MetricStore: Send + Sync {
    fn quality_score(&self, listing: &ListingId) -> Result<Option<QualityScore>, StoreError>;
    fn upsert_quality_score(&self, score: QualityScore) -> Result<(), StoreError>;
    fn trust_metrics(&self, owner: &UserId) -> Result<Option<TrustMetrics>, StoreError>;
    fn upsert_trust_metrics(&self, metrics: TrustMetrics) -> Result<(), StoreError>;
    fn rating_breakdown(&self, owner: &UserId) -> Result<Option<RatingBreakdown>, StoreError>;
    fn upsert_rating_breakdown(
        &self,
        owner: &UserId,
        breakdown: RatingBreakdown,
    ) -> Result<(), StoreError>;
}

/// Everything the engine needs from persistence.
pub trait TrustStore: MarketplaceStore + ReviewStore + MetricStore {}

impl<T> TrustStore for T where T: MarketplaceStore + ReviewStore + MetricStore {}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
