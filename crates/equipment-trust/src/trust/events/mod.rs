//! Event entry points. The dispatcher is the only place that decides when
//! scores are recomputed; every handler logs and swallows its failures.

mod queue;

pub use queue::{event_queue, EventQueue, EventWorker};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::cache::ResultCache;
use super::domain::{LeadId, ListingId, ReviewId, UserId};
use super::quality::QualityScoringEngine;
use super::reviews::ReviewLifecycleManager;
use super::scoring::TrustScoringEngine;
use super::store::TrustStore;

/// Domain events raised by the surrounding marketplace. Ids and timestamps only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrustEvent {
    LeadCreated {
        lead_id: LeadId,
    },
    LeadResponded {
        lead_id: LeadId,
        responded_at: DateTime<Utc>,
    },
    ReviewSubmitted {
        review_id: ReviewId,
        owner_id: UserId,
    },
    ReviewFlagged {
        review_id: ReviewId,
        owner_id: UserId,
    },
    ListingCreated {
        listing_id: ListingId,
    },
    ListingUpdated {
        listing_id: ListingId,
    },
    VerificationApproved {
        owner_id: UserId,
    },
}

impl TrustEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrustEvent::LeadCreated { .. } => "lead_created",
            TrustEvent::LeadResponded { .. } => "lead_responded",
            TrustEvent::ReviewSubmitted { .. } => "review_submitted",
            TrustEvent::ReviewFlagged { .. } => "review_flagged",
            TrustEvent::ListingCreated { .. } => "listing_created",
            TrustEvent::ListingUpdated { .. } => "listing_updated",
            TrustEvent::VerificationApproved { .. } => "verification_approved",
        }
    }
}

/// Fire-and-forget hand-off. Returns immediately and never reports failure.
pub trait TrustEventSink: Send + Sync {
    fn emit(&self, event: TrustEvent);
}

/// Routes each event to the engines that depend on it.
pub struct TrustEventsService<S, C> {
    store: Arc<S>,
    quality: Arc<QualityScoringEngine<S>>,
    scoring: Arc<TrustScoringEngine<S, C>>,
    reviews: Arc<ReviewLifecycleManager<S>>,
}

impl<S, C> TrustEventsService<S, C>
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    pub fn new(
        store: Arc<S>,
        quality: Arc<QualityScoringEngine<S>>,
        scoring: Arc<TrustScoringEngine<S, C>>,
        reviews: Arc<ReviewLifecycleManager<S>>,
    ) -> Self {
        Self {
            store,
            quality,
            scoring,
            reviews,
        }
    }

    pub fn dispatch(&self, event: TrustEvent) {
        debug!(event = event.name(), "dispatching trust event");
        match event {
            TrustEvent::LeadCreated { lead_id } => self.on_lead_created(&lead_id),
            TrustEvent::LeadResponded {
                lead_id,
                responded_at,
            } => self.on_lead_responded(&lead_id, responded_at),
            TrustEvent::ReviewSubmitted { owner_id, .. } => self.on_review_submitted(&owner_id),
            TrustEvent::ReviewFlagged { owner_id, .. } => self.on_review_flagged(&owner_id),
            TrustEvent::ListingCreated { listing_id } => self.on_listing_created(&listing_id),
            TrustEvent::ListingUpdated { listing_id } => self.on_listing_updated(&listing_id),
            TrustEvent::VerificationApproved { owner_id } => {
                self.on_verification_approved(&owner_id)
            }
        }
    }

    pub fn on_lead_created(&self, lead_id: &LeadId) {
        let Some(owner_id) = self.lead_owner(lead_id, "lead_created") else {
            return;
        };
        self.recalculate(&owner_id, "lead_created");
        if let Err(error) = self.reviews.schedule_review_request(lead_id) {
            warn!(lead_id = %lead_id, %error, "review request not scheduled");
        }
    }

    pub fn on_lead_responded(&self, lead_id: &LeadId, responded_at: DateTime<Utc>) {
        match self.store.record_lead_response(lead_id, responded_at) {
            Ok(true) => debug!(lead_id = %lead_id, %responded_at, "first owner response recorded"),
            Ok(false) => debug!(lead_id = %lead_id, "owner response already recorded"),
            Err(error) => warn!(lead_id = %lead_id, %error, "owner response not recorded"),
        }
        if let Some(owner_id) = self.lead_owner(lead_id, "lead_responded") {
            self.recalculate(&owner_id, "lead_responded");
        }
    }

    pub fn on_review_submitted(&self, owner_id: &UserId) {
        self.recalculate(owner_id, "review_submitted");
    }

    pub fn on_review_flagged(&self, owner_id: &UserId) {
        self.recalculate(owner_id, "review_flagged");
    }

    pub fn on_listing_created(&self, listing_id: &ListingId) {
        self.rescore_listing(listing_id, "listing_created");
    }

    pub fn on_listing_updated(&self, listing_id: &ListingId) {
        self.rescore_listing(listing_id, "listing_updated");
    }

    pub fn on_verification_approved(&self, owner_id: &UserId) {
        self.recalculate(owner_id, "verification_approved");
    }

    fn rescore_listing(&self, listing_id: &ListingId, trigger: &'static str) {
        let listing = match self.store.listing(listing_id) {
            Ok(Some(listing)) => listing,
            Ok(None) => {
                warn!(listing_id = %listing_id, trigger, "listing not found for rescoring");
                return;
            }
            Err(error) => {
                error!(listing_id = %listing_id, trigger, %error, "listing lookup failed");
                return;
            }
        };

        if let Err(error) = self.quality.score(&listing) {
            error!(listing_id = %listing_id, trigger, %error, "quality recalculation failed");
        }
        self.recalculate(&listing.owner_id, trigger);
    }

    fn lead_owner(&self, lead_id: &LeadId, trigger: &'static str) -> Option<UserId> {
        match self.store.lead(lead_id) {
            Ok(Some(lead)) => Some(lead.owner_id),
            Ok(None) => {
                warn!(lead_id = %lead_id, trigger, "lead not found");
                None
            }
            Err(error) => {
                error!(lead_id = %lead_id, trigger, %error, "lead lookup failed");
                None
            }
        }
    }

    fn recalculate(&self, owner_id: &UserId, trigger: &'static str) {
        if let Err(error) = self.scoring.recalculate(owner_id) {
            error!(owner_id = %owner_id, trigger, %error, "trust recalculation failed");
        }
    }
}
