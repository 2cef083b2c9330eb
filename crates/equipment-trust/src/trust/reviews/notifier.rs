use serde::Serialize;

use super::super::domain::{Lead, Listing, Owner, ReviewRequest};

/// Everything a delivery channel needs to invite the renter to review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewInvitation {
    pub request: ReviewRequest,
    pub lead: Lead,
    pub listing: Listing,
    pub owner: Owner,
}

/// Outbound delivery hook (SMS, e-mail, push). The engine only picks who is due.
pub trait ReviewNotifier: Send + Sync {
    fn notify(&self, invitation: &ReviewInvitation) -> Result<(), NotifierError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
