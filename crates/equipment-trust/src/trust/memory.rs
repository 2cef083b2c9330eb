use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Lead, LeadId, LeadStatus, Listing, ListingId, Owner, QualityScore, RatingBreakdown, Review,
    ReviewId, ReviewRequest, ReviewStatus, TrustMetrics, UserId,
};
use super::store::{MarketplaceStore, MetricStore, ReviewStore, StoreError};

#[derive(Default)]
struct Tables {
    owners: HashMap<UserId, Owner>,
    listings: HashMap<ListingId, Listing>,
    leads: HashMap<LeadId, Lead>,
    review_requests: HashMap<LeadId, ReviewRequest>,
    reviews: HashMap<ReviewId, Review>,
    reviews_by_lead: HashMap<LeadId, ReviewId>,
    quality_scores: HashMap<ListingId, QualityScore>,
    trust_metrics: HashMap<UserId, TrustMetrics>,
    rating_breakdowns: HashMap<UserId, RatingBreakdown>,
}

impl Tables {
    /// Lead, listing and owner are all present, so an invitation can be built.
    fn has_invitation_context(&self, lead_id: &LeadId) -> bool {
        self.leads
            .get(lead_id)
            .and_then(|lead| self.listings.get(&lead.listing_id))
            .is_some_and(|listing| self.owners.contains_key(&listing.owner_id))
    }
}

/// Process-local store backing the demo service and the test suites.
///
/// Uniqueness on review requests and reviews is enforced per lead, mirroring
/// the unique indexes a relational backend would carry.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("store mutex poisoned")
    }

    pub fn put_owner(&self, owner: Owner) {
        self.tables().owners.insert(owner.id.clone(), owner);
    }

    pub fn put_listing(&self, listing: Listing) {
        self.tables().listings.insert(listing.id.clone(), listing);
    }

    pub fn put_lead(&self, lead: Lead) {
        self.tables().leads.insert(lead.id.clone(), lead);
    }

    pub fn set_lead_status(&self, id: &LeadId, status: LeadStatus) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let lead = tables.leads.get_mut(id).ok_or(StoreError::NotFound)?;
        lead.status = status;
        Ok(())
    }
}

impl MarketplaceStore for MemoryStore {
    fn owner(&self, id: &UserId) -> Result<Option<Owner>, StoreError> {
        Ok(self.tables().owners.get(id).cloned())
    }

    fn listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        Ok(self.tables().listings.get(id).cloned())
    }

    fn listings_for_owner(&self, owner: &UserId) -> Result<Vec<Listing>, StoreError> {
        let tables = self.tables();
        let mut listings: Vec<Listing> = tables
            .listings
            .values()
            .filter(|listing| &listing.owner_id == owner)
            .cloned()
            .collect();
        listings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listings)
    }

    fn lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        Ok(self.tables().leads.get(id).cloned())
    }

    fn leads_for_owner(&self, owner: &UserId) -> Result<Vec<Lead>, StoreError> {
        let tables = self.tables();
        let mut leads: Vec<Lead> = tables
            .leads
            .values()
            .filter(|lead| &lead.owner_id == owner)
            .cloned()
            .collect();
        leads.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(leads)
    }

    fn record_lead_response(
        &self,
        id: &LeadId,
        responded_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables();
        let lead = tables.leads.get_mut(id).ok_or(StoreError::NotFound)?;
        if lead.owner_responded_at.is_some() {
            return Ok(false);
        }
        lead.owner_responded_at = Some(responded_at);
        Ok(true)
    }
}

impl ReviewStore for MemoryStore {
    fn review_request_for_lead(&self, lead: &LeadId) -> Result<Option<ReviewRequest>, StoreError> {
        Ok(self.tables().review_requests.get(lead).cloned())
    }

    fn insert_review_request(&self, request: ReviewRequest) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if tables.review_requests.contains_key(&request.lead_id) {
            return Err(StoreError::Conflict);
        }
        tables
            .review_requests
            .insert(request.lead_id.clone(), request);
        Ok(())
    }

    fn mark_review_request_invited(
        &self,
        lead: &LeadId,
        invited_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables();
        let request = tables
            .review_requests
            .get_mut(lead)
            .ok_or(StoreError::NotFound)?;
        if request.completed_at.is_some() || request.invited_at.is_some() {
            return Ok(false);
        }
        request.invited_at = Some(invited_at);
        Ok(true)
    }

    fn complete_review_request(
        &self,
        lead: &LeadId,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables();
        let request = tables
            .review_requests
            .get_mut(lead)
            .ok_or(StoreError::NotFound)?;
        if request.completed_at.is_some() {
            return Ok(false);
        }
        request.completed_at = Some(completed_at);
        Ok(true)
    }

    fn due_review_requests(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReviewRequest>, StoreError> {
        let tables = self.tables();
        let mut due: Vec<ReviewRequest> = tables
            .review_requests
            .values()
            .filter(|request| request.is_open(now) && request.invited_at.is_none())
            .filter(|request| tables.has_invitation_context(&request.lead_id))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then_with(|| a.id.cmp(&b.id)));
        due.truncate(limit);
        Ok(due)
    }

    fn count_expired_review_requests(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let tables = self.tables();
        Ok(tables
            .review_requests
            .values()
            .filter(|request| request.is_expired(now))
            .count() as u64)
    }

    fn review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self.tables().reviews.get(id).cloned())
    }

    fn review_for_lead(&self, lead: &LeadId) -> Result<Option<Review>, StoreError> {
        let tables = self.tables();
        Ok(tables
            .reviews_by_lead
            .get(lead)
            .and_then(|id| tables.reviews.get(id))
            .cloned())
    }

    fn insert_review(&self, review: Review) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if tables.reviews_by_lead.contains_key(&review.lead_id)
            || tables.reviews.contains_key(&review.id)
        {
            return Err(StoreError::Conflict);
        }
        tables
            .reviews_by_lead
            .insert(review.lead_id.clone(), review.id.clone());
        tables.reviews.insert(review.id.clone(), review);
        Ok(())
    }

    fn record_review_response(
        &self,
        id: &ReviewId,
        response: String,
        responded_at: DateTime<Utc>,
    ) -> Result<Review, StoreError> {
        let mut tables = self.tables();
        let review = tables.reviews.get_mut(id).ok_or(StoreError::NotFound)?;
        if review.owner_response.is_some() {
            return Err(StoreError::Conflict);
        }
        review.owner_response = Some(response);
        review.responded_at = Some(responded_at);
        if review.status == ReviewStatus::Submitted {
            review.status = ReviewStatus::Responded;
        }
        Ok(review.clone())
    }

    fn flag_review(&self, id: &ReviewId, reason: String) -> Result<Review, StoreError> {
        let mut tables = self.tables();
        let review = tables.reviews.get_mut(id).ok_or(StoreError::NotFound)?;
        review.status = ReviewStatus::Flagged;
        review.flag_reason = Some(reason);
        Ok(review.clone())
    }

    fn reviews_for_owner(&self, owner: &UserId) -> Result<Vec<Review>, StoreError> {
        let tables = self.tables();
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|review| &review.owner_id == owner)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(reviews)
    }
}

impl MetricStore for MemoryStore {
    fn quality_score(&self, listing: &ListingId) -> Result<Option<QualityScore>, StoreError> {
        Ok(self.tables().quality_scores.get(listing).cloned())
    }

    fn upsert_quality_score(&self, score: QualityScore) -> Result<(), StoreError> {
        self.tables()
            .quality_scores
            .insert(score.listing_id.clone(), score);
        Ok(())
    }

    fn trust_metrics(&self, owner: &UserId) -> Result<Option<TrustMetrics>, StoreError> {
        Ok(self.tables().trust_metrics.get(owner).cloned())
    }

    fn upsert_trust_metrics(&self, metrics: TrustMetrics) -> Result<(), StoreError> {
        self.tables()
            .trust_metrics
            .insert(metrics.owner_id.clone(), metrics);
        Ok(())
    }

    fn rating_breakdown(&self, owner: &UserId) -> Result<Option<RatingBreakdown>, StoreError> {
        Ok(self.tables().rating_breakdowns.get(owner).copied())
    }

    fn upsert_rating_breakdown(
        &self,
        owner: &UserId,
        breakdown: RatingBreakdown,
    ) -> Result<(), StoreError> {
        self.tables()
            .rating_breakdowns
            .insert(owner.clone(), breakdown);
        Ok(())
    }
}
