//! Trust and reputation engine.
//!
//! Collaborators raise [`events::TrustEvent`]s; the dispatcher recomputes
//! listing quality and owner trust metrics, which are persisted as full-row
//! overwrites and served through a cache-first read path.

pub mod cache;
pub mod clock;
pub mod domain;
pub mod events;
pub mod memory;
pub mod quality;
pub mod reviews;
pub mod router;
pub mod scoring;
pub mod store;
pub mod thresholds;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::TrustEngineConfig;

pub use cache::{CacheError, MemoryCache, NoopCache, ResultCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Badge, ContactInfo, Lead, LeadId, LeadStatus, Listing, ListingId, ListingStatus, Owner,
    QualityScore, RatingBreakdown, Review, ReviewId, ReviewRating, ReviewRequest,
    ReviewRequestId, ReviewStatus, Reviewer, ScoreBreakdown, TrustMetrics, UserId,
    VerificationStatus,
};
pub use events::{event_queue, EventQueue, EventWorker, TrustEvent, TrustEventSink, TrustEventsService};
pub use memory::MemoryStore;
pub use quality::{QualityError, QualityScoringEngine};
pub use reviews::{
    DispatchReport, ErrorKind, ExpirySweep, NotifierError, ReviewEligibility, ReviewError,
    ReviewInvitation, ReviewLifecycleManager, ReviewNotifier, ReviewSubmission,
};
pub use router::trust_router;
pub use scoring::{TrustError, TrustScoringEngine};
pub use store::{MarketplaceStore, MetricStore, ReviewStore, StoreError, TrustStore};

/// One instance of every engine, wired once at startup and shared by reference.
pub struct TrustEngine<S, C> {
    pub quality: Arc<QualityScoringEngine<S>>,
    pub scoring: Arc<TrustScoringEngine<S, C>>,
    pub reviews: Arc<ReviewLifecycleManager<S>>,
    pub events: Arc<TrustEventsService<S, C>>,
    pub sink: Arc<dyn TrustEventSink>,
    pub notifier: Arc<dyn ReviewNotifier>,
    pub review_batch_size: usize,
}

impl<S, C> TrustEngine<S, C>
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn TrustEventSink>,
        notifier: Arc<dyn ReviewNotifier>,
        config: &TrustEngineConfig,
    ) -> Self {
        let quality = Arc::new(QualityScoringEngine::new(store.clone(), clock.clone()));
        let scoring = Arc::new(TrustScoringEngine::new(
            store.clone(),
            cache,
            clock.clone(),
            config.cache_ttl_seconds,
        ));
        let reviews = Arc::new(ReviewLifecycleManager::new(
            store.clone(),
            clock,
            sink.clone(),
        ));
        let events = Arc::new(TrustEventsService::new(
            store,
            quality.clone(),
            scoring.clone(),
            reviews.clone(),
        ));

        Self {
            quality,
            scoring,
            reviews,
            events,
            sink,
            notifier,
            review_batch_size: config.review_batch_size,
        }
    }

    /// Run one notifier pass with the configured batch size.
    pub fn process_pending_review_requests(&self) -> Result<DispatchReport, ReviewError> {
        self.reviews
            .process_pending_review_requests(self.notifier.as_ref(), self.review_batch_size)
    }
}
