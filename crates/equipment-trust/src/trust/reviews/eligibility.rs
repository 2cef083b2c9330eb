use chrono::{DateTime, Utc};
use serde::Serialize;

use super::super::domain::{Lead, ReviewRequest};
use super::super::thresholds::review_delay;
use super::ReviewError;

/// Where a lead sits in the review window, derived at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewEligibility {
    /// No request exists. Leads older than the review delay may still be
    /// reviewed so that pre-scheduling leads are not locked out.
    NoRequest { eligible_from: DateTime<Utc> },
    /// A request exists but its window has not opened yet.
    Scheduled { opens_at: DateTime<Utc> },
    Pending { expires_at: DateTime<Utc> },
    Completed { completed_at: DateTime<Utc> },
    Expired { expired_at: DateTime<Utc> },
}

impl ReviewEligibility {
    pub fn derive(lead: &Lead, request: Option<&ReviewRequest>, now: DateTime<Utc>) -> Self {
        match request {
            None => ReviewEligibility::NoRequest {
                eligible_from: lead.created_at + review_delay(),
            },
            Some(request) => {
                if let Some(completed_at) = request.completed_at {
                    ReviewEligibility::Completed { completed_at }
                } else if request.is_expired(now) {
                    ReviewEligibility::Expired {
                        expired_at: request.expired_at,
                    }
                } else if now < request.sent_at {
                    ReviewEligibility::Scheduled {
                        opens_at: request.sent_at,
                    }
                } else {
                    ReviewEligibility::Pending {
                        expires_at: request.expired_at,
                    }
                }
            }
        }
    }

    /// Gate a submission made at `now`.
    pub(crate) fn check_submission(&self, lead: &Lead, now: DateTime<Utc>) -> Result<(), ReviewError> {
        match *self {
            ReviewEligibility::Pending { .. } => Ok(()),
            ReviewEligibility::NoRequest { eligible_from } if now >= eligible_from => Ok(()),
            ReviewEligibility::NoRequest { eligible_from } => Err(ReviewError::NotReady {
                eligible_at: eligible_from,
            }),
            ReviewEligibility::Scheduled { opens_at } => Err(ReviewError::NotReady {
                eligible_at: opens_at,
            }),
            ReviewEligibility::Completed { .. } => {
                Err(ReviewError::RequestCompleted(lead.id.clone()))
            }
            ReviewEligibility::Expired { expired_at } => Err(ReviewError::Expired { expired_at }),
        }
    }
}
