use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Marketplace account. Owners and reviewers share the same id space.
    UserId
);
identifier!(ListingId);
identifier!(LeadId);
identifier!(ReviewId);
identifier!(ReviewRequestId);

/// Business verification outcome managed by the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Pending,
    Verified,
    Rejected,
}

/// Identity the scores attach to. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
    pub business_verification: VerificationStatus,
    /// Verified phone number or identity document on file.
    pub identity_verified: bool,
}

impl Owner {
    pub fn is_business_verified(&self) -> bool {
        self.business_verification == VerificationStatus::Verified
    }

    pub fn is_verified(&self) -> bool {
        self.is_business_verified() || self.identity_verified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Inactive,
}

/// Equipment record as consumed by quality scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: UserId,
    pub image_count: u32,
    /// Primary-language description.
    pub description: String,
    /// Secondary-language (Arabic) description.
    #[serde(default)]
    pub description_secondary: Option<String>,
    /// Free-form specification sheet, e.g. `{"engine_hours": 1200}`.
    #[serde(default)]
    pub specifications: BTreeMap<String, serde_json::Value>,
    pub status: ListingStatus,
}

impl Listing {
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// Lead pipeline status owned by the CRM side of the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Negotiating,
    Won,
    Lost,
}

impl LeadStatus {
    /// Whether the owner has moved the lead past the inbox.
    pub fn is_engaged(self) -> bool {
        self != LeadStatus::New
    }
}

/// Contact details the renter left when raising the lead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Contact event linking a renter to a listing and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub listing_id: ListingId,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: LeadStatus,
    pub contact: ContactInfo,
    /// First owner response; never overwritten once set.
    pub owner_responded_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn is_responded(&self) -> bool {
        self.status.is_engaged() || self.owner_responded_at.is_some()
    }

    /// Hours between the lead arriving and the first owner response.
    pub fn response_time_hours(&self) -> Option<f64> {
        self.owner_responded_at.map(|responded| {
            let seconds = (responded - self.created_at).num_seconds().max(0);
            seconds as f64 / 3600.0
        })
    }
}

/// Time-boxed permission window for reviewing a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: ReviewRequestId,
    pub lead_id: LeadId,
    /// Moment the request becomes submittable.
    pub sent_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// When the notifier accepted the invitation for delivery.
    #[serde(default)]
    pub invited_at: Option<DateTime<Utc>>,
}

impl ReviewRequest {
    /// Expiry is observed at read time, never written.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at && self.completed_at.is_none()
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.completed_at.is_none() && self.sent_at <= now && !self.is_expired(now)
    }
}

/// Five-point ordinal rating scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewRating {
    Excellent,
    Good,
    Average,
    Poor,
    VeryPoor,
}

impl ReviewRating {
    pub fn stars(self) -> u8 {
        match self {
            ReviewRating::Excellent => 5,
            ReviewRating::Good => 4,
            ReviewRating::Average => 3,
            ReviewRating::Poor => 2,
            ReviewRating::VeryPoor => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Submitted,
    Responded,
    Flagged,
}

impl ReviewStatus {
    /// Flagged reviews stay stored but stop contributing to reputation.
    pub fn counts_toward_reputation(self) -> bool {
        !matches!(self, ReviewStatus::Flagged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub lead_id: LeadId,
    pub listing_id: ListingId,
    pub owner_id: UserId,
    pub reviewer_id: UserId,
    pub rating: ReviewRating,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub owner_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub status: ReviewStatus,
    pub flag_reason: Option<String>,
    /// Frozen at submission from the lead's response timestamp.
    pub response_time_hours: Option<u32>,
    pub did_owner_respond: bool,
}

/// Verified contact identity of the person submitting a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub user_id: UserId,
    #[serde(default)]
    pub verified_phone: Option<String>,
    #[serde(default)]
    pub verified_email: Option<String>,
}

impl Reviewer {
    /// True when either verified channel matches the lead's recorded contact.
    pub fn matches(&self, contact: &ContactInfo) -> bool {
        let phone_matches = match (&self.verified_phone, &contact.phone) {
            (Some(verified), Some(recorded)) => {
                let verified = normalize_phone(verified);
                !verified.is_empty() && verified == normalize_phone(recorded)
            }
            _ => false,
        };
        let email_matches = match (&self.verified_email, &contact.email) {
            (Some(verified), Some(recorded)) => {
                let verified = verified.trim();
                !verified.is_empty() && verified.eq_ignore_ascii_case(recorded.trim())
            }
            _ => false,
        };
        phone_matches || email_matches
    }
}

fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Per-listing completeness score, overwritten on every recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    pub listing_id: ListingId,
    pub photo_score: u8,
    pub description_score: u8,
    pub specification_score: u8,
    pub overall_score: u8,
    pub recalculated_at: DateTime<Utc>,
}

/// Named credential earned by crossing a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Badge {
    VerifiedBusiness,
    VerifiedIdentity,
    FastResponder,
    Reliable,
    TopRated,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::VerifiedBusiness => "verified-business",
            Badge::VerifiedIdentity => "verified-identity",
            Badge::FastResponder => "fast-responder",
            Badge::Reliable => "reliable",
            Badge::TopRated => "top-rated",
        }
    }
}

/// Review counts per rating bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingBreakdown {
    pub excellent: u32,
    pub good: u32,
    pub average: u32,
    pub poor: u32,
    pub very_poor: u32,
}

impl RatingBreakdown {
    pub fn record(&mut self, rating: ReviewRating) {
        match rating {
            ReviewRating::Excellent => self.excellent += 1,
            ReviewRating::Good => self.good += 1,
            ReviewRating::Average => self.average += 1,
            ReviewRating::Poor => self.poor += 1,
            ReviewRating::VeryPoor => self.very_poor += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.excellent + self.good + self.average + self.poor + self.very_poor
    }
}

/// Weighted inputs that produced a trust score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub response: f64,
    pub review: f64,
    pub listing: f64,
    pub verification_bonus: u8,
}

/// Per-owner reputation aggregate. Always written as a complete row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustMetrics {
    pub owner_id: UserId,
    pub total_leads: u32,
    pub responded_leads: u32,
    /// Percentage in `[0, 100]`; zero when there are no leads.
    pub response_rate: f64,
    pub avg_response_time_hours: Option<f64>,
    pub total_reviews: u32,
    pub average_rating: Option<f64>,
    pub rating_breakdown: RatingBreakdown,
    pub total_listings: u32,
    pub active_listings: u32,
    pub avg_quality_score: Option<f64>,
    pub score_breakdown: ScoreBreakdown,
    pub trust_score: u8,
    pub badges: BTreeSet<Badge>,
    pub last_calculated_at: DateTime<Utc>,
}

impl TrustMetrics {
    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }
}
