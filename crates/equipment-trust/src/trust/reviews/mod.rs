//! Review eligibility windows, submissions, owner responses and moderation.

mod eligibility;
mod notifier;

pub use eligibility::ReviewEligibility;
pub use notifier::{NotifierError, ReviewInvitation, ReviewNotifier};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::domain::{
    Lead, LeadId, ListingId, Review, ReviewId, ReviewRating, ReviewRequest, ReviewRequestId,
    ReviewStatus, Reviewer, UserId,
};
use super::events::{TrustEvent, TrustEventSink};
use super::store::{StoreError, TrustStore};
use super::thresholds::{review_delay, review_expiry};

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

fn next_request_id() -> ReviewRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewRequestId(format!("rr-{id:06}"))
}

/// A renter's review of the lead they raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub lead_id: LeadId,
    pub reviewer: Reviewer,
    pub rating: ReviewRating,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Outcome of one notifier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchReport {
    pub due: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Read-only expiry observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpirySweep {
    pub expired: u64,
    pub checked_at: DateTime<Utc>,
}

/// State machine over review requests and the reviews they permit.
pub struct ReviewLifecycleManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn TrustEventSink>,
}

impl<S> ReviewLifecycleManager<S>
where
    S: TrustStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, events: Arc<dyn TrustEventSink>) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Open a request immediately. Returns the existing id if the lead already has one.
    pub fn create_review_request(&self, lead_id: &LeadId) -> Result<ReviewRequestId, ReviewError> {
        let lead = self.lead(lead_id)?;
        self.open_request(&lead, self.clock.now())
    }

    /// Open a request that becomes submittable once the review delay has passed.
    pub fn schedule_review_request(
        &self,
        lead_id: &LeadId,
    ) -> Result<ReviewRequestId, ReviewError> {
        let lead = self.lead(lead_id)?;
        let sent_at = lead.created_at + review_delay();
        self.open_request(&lead, sent_at)
    }

    fn open_request(
        &self,
        lead: &Lead,
        sent_at: DateTime<Utc>,
    ) -> Result<ReviewRequestId, ReviewError> {
        if let Some(existing) = self.store.review_request_for_lead(&lead.id)? {
            return Ok(existing.id);
        }

        let request = ReviewRequest {
            id: next_request_id(),
            lead_id: lead.id.clone(),
            sent_at,
            expired_at: sent_at + review_expiry(),
            completed_at: None,
            invited_at: None,
        };

        match self.store.insert_review_request(request.clone()) {
            Ok(()) => {
                debug!(lead_id = %lead.id, request_id = %request.id, %sent_at, "review request opened");
                Ok(request.id)
            }
            // A concurrent trigger won the unique constraint; its row is the answer.
            Err(StoreError::Conflict) => self
                .store
                .review_request_for_lead(&lead.id)?
                .map(|existing| existing.id)
                .ok_or(ReviewError::Store(StoreError::Conflict)),
            Err(other) => Err(other.into()),
        }
    }

    pub fn eligibility(&self, lead_id: &LeadId) -> Result<ReviewEligibility, ReviewError> {
        let lead = self.lead(lead_id)?;
        let request = self.store.review_request_for_lead(lead_id)?;
        Ok(ReviewEligibility::derive(
            &lead,
            request.as_ref(),
            self.clock.now(),
        ))
    }

    pub fn submit_review(&self, submission: ReviewSubmission) -> Result<Review, ReviewError> {
        let now = self.clock.now();
        let lead = self.lead(&submission.lead_id)?;

        if self.store.review_for_lead(&lead.id)?.is_some() {
            return Err(ReviewError::ReviewExists(lead.id));
        }

        let listing = self
            .store
            .listing(&lead.listing_id)?
            .ok_or_else(|| ReviewError::ListingNotFound(lead.listing_id.clone()))?;
        if submission.reviewer.user_id == listing.owner_id
            || submission.reviewer.user_id == lead.owner_id
        {
            return Err(ReviewError::CannotReviewOwnListing);
        }
        if !submission.reviewer.matches(&lead.contact) {
            return Err(ReviewError::IdentityMismatch);
        }

        let request = self.store.review_request_for_lead(&lead.id)?;
        ReviewEligibility::derive(&lead, request.as_ref(), now).check_submission(&lead, now)?;

        let response_time_hours = lead.owner_responded_at.map(|responded_at| {
            let seconds = (responded_at - lead.created_at).num_seconds().max(0);
            (seconds / 3600) as u32
        });
        let review = Review {
            id: next_review_id(),
            lead_id: lead.id.clone(),
            listing_id: listing.id.clone(),
            owner_id: listing.owner_id.clone(),
            reviewer_id: submission.reviewer.user_id,
            rating: submission.rating,
            title: clean(submission.title),
            comment: clean(submission.comment),
            submitted_at: now,
            owner_response: None,
            responded_at: None,
            status: ReviewStatus::Submitted,
            flag_reason: None,
            response_time_hours,
            did_owner_respond: lead.owner_responded_at.is_some(),
        };

        self.store
            .insert_review(review.clone())
            .map_err(|error| match error {
                StoreError::Conflict => ReviewError::ReviewExists(lead.id.clone()),
                other => other.into(),
            })?;

        if request.is_some() {
            if let Err(error) = self.store.complete_review_request(&lead.id, now) {
                warn!(lead_id = %lead.id, %error, "review stored but request not marked completed");
            }
        }

        self.events.emit(TrustEvent::ReviewSubmitted {
            review_id: review.id.clone(),
            owner_id: review.owner_id.clone(),
        });
        info!(
            review_id = %review.id,
            lead_id = %lead.id,
            owner_id = %review.owner_id,
            rating = review.rating.stars(),
            "review submitted"
        );
        Ok(review)
    }

    /// Record the owner's single, uneditable reply.
    pub fn respond_to_review(
        &self,
        review_id: &ReviewId,
        responder: &UserId,
        response: &str,
    ) -> Result<Review, ReviewError> {
        let review = self.review(review_id)?;
        if &review.owner_id != responder {
            return Err(ReviewError::NotReviewOwner);
        }
        if review.owner_response.is_some() {
            return Err(ReviewError::ResponseExists(review.id));
        }
        let response = response.trim();
        if response.is_empty() {
            return Err(ReviewError::EmptyResponse);
        }

        // The store re-checks under its own lock; a concurrent reply loses here.
        let review = self
            .store
            .record_review_response(review_id, response.to_string(), self.clock.now())
            .map_err(|error| match error {
                StoreError::Conflict => ReviewError::ResponseExists(review_id.clone()),
                StoreError::NotFound => ReviewError::ReviewNotFound(review_id.clone()),
                other => other.into(),
            })?;

        info!(review_id = %review.id, owner_id = %review.owner_id, "owner responded to review");
        Ok(review)
    }

    /// Moderation: hide a review from reputation without deleting it.
    pub fn flag_review(&self, review_id: &ReviewId, reason: &str) -> Result<Review, ReviewError> {
        let review = self
            .store
            .flag_review(review_id, reason.trim().to_string())
            .map_err(|error| match error {
                StoreError::NotFound => ReviewError::ReviewNotFound(review_id.clone()),
                other => other.into(),
            })?;

        self.events.emit(TrustEvent::ReviewFlagged {
            review_id: review.id.clone(),
            owner_id: review.owner_id.clone(),
        });
        warn!(review_id = %review.id, reason = %reason.trim(), "review flagged");
        Ok(review)
    }

    /// Hand open, not-yet-invited requests to the notifier.
    pub fn process_pending_review_requests(
        &self,
        notifier: &dyn ReviewNotifier,
        limit: usize,
    ) -> Result<DispatchReport, ReviewError> {
        let now = self.clock.now();
        let due = self.store.due_review_requests(now, limit)?;
        let mut report = DispatchReport {
            due: due.len(),
            ..DispatchReport::default()
        };

        for request in due {
            let invitation = match self.invitation(request) {
                Ok(invitation) => invitation,
                Err(error) => {
                    warn!(%error, "skipping review request with missing context");
                    report.failed += 1;
                    continue;
                }
            };

            if let Err(error) = notifier.notify(&invitation) {
                warn!(request_id = %invitation.request.id, %error, "review invitation not delivered");
                report.failed += 1;
                continue;
            }

            match self
                .store
                .mark_review_request_invited(&invitation.lead.id, now)
            {
                Ok(true) => report.notified += 1,
                Ok(false) => {
                    debug!(lead_id = %invitation.lead.id, "request closed while its invitation was sent");
                    report.notified += 1;
                }
                Err(error) => {
                    warn!(lead_id = %invitation.lead.id, %error, "invitation sent but not recorded");
                    report.failed += 1;
                }
            }
        }

        info!(due = report.due, notified = report.notified, failed = report.failed, "review requests processed");
        Ok(report)
    }

    /// Count requests whose window lapsed unanswered. Nothing is written.
    pub fn expire_old_requests(&self) -> Result<ExpirySweep, ReviewError> {
        let now = self.clock.now();
        let expired = self.store.count_expired_review_requests(now)?;
        debug!(expired, "expired review requests observed");
        Ok(ExpirySweep {
            expired,
            checked_at: now,
        })
    }

    fn invitation(&self, request: ReviewRequest) -> Result<ReviewInvitation, ReviewError> {
        let lead = self.lead(&request.lead_id)?;
        let listing = self
            .store
            .listing(&lead.listing_id)?
            .ok_or_else(|| ReviewError::ListingNotFound(lead.listing_id.clone()))?;
        let owner = self
            .store
            .owner(&listing.owner_id)?
            .ok_or_else(|| ReviewError::OwnerNotFound(listing.owner_id.clone()))?;
        Ok(ReviewInvitation {
            request,
            lead,
            listing,
            owner,
        })
    }

    fn lead(&self, lead_id: &LeadId) -> Result<Lead, ReviewError> {
        self.store
            .lead(lead_id)?
            .ok_or_else(|| ReviewError::LeadNotFound(lead_id.clone()))
    }

    fn review(&self, review_id: &ReviewId) -> Result<Review, ReviewError> {
        self.store
            .review(review_id)?
            .ok_or_else(|| ReviewError::ReviewNotFound(review_id.clone()))
    }
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Coarse classification transports use to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    AlreadyExists,
    InvalidState,
    StoreFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),
    #[error("listing {0} not found")]
    ListingNotFound(ListingId),
    #[error("owner {0} not found")]
    OwnerNotFound(UserId),
    #[error("review {0} not found")]
    ReviewNotFound(ReviewId),
    #[error("reviewer identity does not match the lead's contact details")]
    IdentityMismatch,
    #[error("only the listing owner may respond to this review")]
    NotReviewOwner,
    #[error("lead {0} already has a review")]
    ReviewExists(LeadId),
    #[error("review {0} already has an owner response")]
    ResponseExists(ReviewId),
    #[error("review window for lead {0} is already closed")]
    RequestCompleted(LeadId),
    #[error("lead is not eligible for review until {eligible_at}")]
    NotReady { eligible_at: DateTime<Utc> },
    #[error("review window expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
    #[error("owners cannot review their own listing")]
    CannotReviewOwnListing,
    #[error("owner response must not be empty")]
    EmptyResponse,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::LeadNotFound(_)
            | ReviewError::ListingNotFound(_)
            | ReviewError::OwnerNotFound(_)
            | ReviewError::ReviewNotFound(_) => ErrorKind::NotFound,
            ReviewError::IdentityMismatch | ReviewError::NotReviewOwner => ErrorKind::Forbidden,
            ReviewError::ReviewExists(_)
            | ReviewError::ResponseExists(_)
            | ReviewError::RequestCompleted(_) => ErrorKind::AlreadyExists,
            ReviewError::NotReady { .. }
            | ReviewError::Expired { .. }
            | ReviewError::CannotReviewOwnListing
            | ReviewError::EmptyResponse => ErrorKind::InvalidState,
            ReviewError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}
