//! Owner trust scoring: aggregates, badges and the weighted trust score.

mod aggregates;
mod badges;
mod formula;

pub use aggregates::{ListingAggregate, ResponseAggregate, ReviewAggregate};

use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};

use tracing::{debug, info, warn};

use super::cache::{trust_metrics_key, ResultCache};
use super::clock::Clock;
use super::domain::{RatingBreakdown, TrustMetrics, UserId};
use super::store::{StoreError, TrustStore};

/// Recomputes and serves per-owner trust metrics.
///
/// Every recalculation rebuilds the aggregates from a full scan and replaces
/// the stored row, so concurrent recalculations for one owner converge on a
/// complete result rather than a blend of two.
pub struct TrustScoringEngine<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    clock: Arc<dyn Clock>,
    cache_ttl_seconds: u64,
}

impl<S, C> TrustScoringEngine<S, C>
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        clock: Arc<dyn Clock>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            cache_ttl_seconds,
        }
    }

    /// Rebuild the owner's metrics from current signals and persist them.
    pub fn recalculate(&self, owner_id: &UserId) -> Result<TrustMetrics, TrustError> {
        let owner = self
            .store
            .owner(owner_id)?
            .ok_or_else(|| TrustError::OwnerNotFound(owner_id.clone()))?;

        let (responses, reviews, listings) = thread::scope(|scope| {
            let responses = scope.spawn(|| self.response_aggregate(owner_id));
            let reviews = scope.spawn(|| self.review_aggregate(owner_id));
            let listings = scope.spawn(|| self.listing_aggregate(owner_id));
            (join(responses), join(reviews), join(listings))
        });
        let (responses, reviews, listings) = (responses?, reviews?, listings?);

        let score_breakdown =
            formula::score_breakdown(&responses, &reviews, &listings, owner.is_verified());
        let metrics = TrustMetrics {
            owner_id: owner_id.clone(),
            total_leads: responses.total_leads,
            responded_leads: responses.responded_leads,
            response_rate: responses.response_rate(),
            avg_response_time_hours: responses.avg_response_time_hours,
            total_reviews: reviews.total_reviews,
            average_rating: reviews.average_rating,
            rating_breakdown: reviews.breakdown,
            total_listings: listings.total_listings,
            active_listings: listings.active_listings,
            avg_quality_score: listings.avg_quality_score,
            trust_score: formula::trust_score(&score_breakdown),
            score_breakdown,
            badges: badges::evaluate_badges(&owner, &responses, &reviews),
            last_calculated_at: self.clock.now(),
        };

        self.store.upsert_trust_metrics(metrics.clone())?;
        self.store
            .upsert_rating_breakdown(owner_id, reviews.breakdown)?;
        self.invalidate(owner_id);

        info!(
            owner_id = %owner_id,
            trust_score = metrics.trust_score,
            badges = metrics.badges.len(),
            "trust metrics recalculated"
        );
        Ok(metrics)
    }

    /// Cache-first read. `None` means no metrics were ever computed for the owner.
    pub fn get_metrics(&self, owner_id: &UserId) -> Result<Option<TrustMetrics>, StoreError> {
        let key = trust_metrics_key(owner_id);
        match self.cache.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<TrustMetrics>(&raw) {
                Ok(metrics) => return Ok(Some(metrics)),
                Err(error) => {
                    warn!(owner_id = %owner_id, %error, "discarding undecodable cached metrics")
                }
            },
            Ok(None) => {}
            Err(error) => warn!(owner_id = %owner_id, %error, "metrics cache read failed"),
        }

        let stored = self.store.trust_metrics(owner_id)?;
        if let Some(metrics) = &stored {
            self.fill(&key, metrics);
        }
        Ok(stored)
    }

    pub fn rating_breakdown(&self, owner_id: &UserId) -> Result<Option<RatingBreakdown>, StoreError> {
        self.store.rating_breakdown(owner_id)
    }

    fn fill(&self, key: &str, metrics: &TrustMetrics) {
        let raw = match serde_json::to_string(metrics) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(owner_id = %metrics.owner_id, %error, "metrics not cacheable");
                return;
            }
        };
        if let Err(error) = self.cache.set(key, raw, self.cache_ttl_seconds) {
            warn!(owner_id = %metrics.owner_id, %error, "metrics cache fill failed");
            return;
        }

        // A recalculation between the store read and the set has already
        // invalidated; the entry written here must not outlive it.
        match self.store.trust_metrics(&metrics.owner_id) {
            Ok(Some(current)) if current == *metrics => {}
            Ok(_) => {
                debug!(owner_id = %metrics.owner_id, "metrics changed during cache fill");
                self.invalidate(&metrics.owner_id);
            }
            Err(error) => {
                warn!(owner_id = %metrics.owner_id, %error, "metrics fill not confirmed");
                self.invalidate(&metrics.owner_id);
            }
        }
    }

    fn invalidate(&self, owner_id: &UserId) {
        if let Err(error) = self.cache.delete(&trust_metrics_key(owner_id)) {
            warn!(owner_id = %owner_id, %error, "metrics cache invalidation failed");
        }
    }

    fn response_aggregate(&self, owner_id: &UserId) -> Result<ResponseAggregate, StoreError> {
        let leads = self.store.leads_for_owner(owner_id)?;
        Ok(ResponseAggregate::from_leads(&leads))
    }

    fn review_aggregate(&self, owner_id: &UserId) -> Result<ReviewAggregate, StoreError> {
        let reviews = self.store.reviews_for_owner(owner_id)?;
        Ok(ReviewAggregate::from_reviews(&reviews))
    }

    fn listing_aggregate(&self, owner_id: &UserId) -> Result<ListingAggregate, StoreError> {
        let listings = self.store.listings_for_owner(owner_id)?;
        let mut scores = Vec::new();
        for listing in listings.iter().filter(|listing| listing.is_active()) {
            if let Some(score) = self.store.quality_score(&listing.id)? {
                scores.push(score);
            }
        }
        Ok(ListingAggregate::from_listings(&listings, &scores))
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("owner {0} not found")]
    OwnerNotFound(UserId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
