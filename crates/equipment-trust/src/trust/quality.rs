//! Listing completeness scoring.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::clock::Clock;
use super::domain::{Listing, ListingId, QualityScore};
use super::store::{StoreError, TrustStore};
use super::thresholds::{
    DESCRIPTION_WEIGHT, EXCELLENT_DESCRIPTION_CHARS, GOOD_DESCRIPTION_CHARS, PHOTO_CAP,
    PHOTO_WEIGHT, SECONDARY_DESCRIPTION_BONUS, SPECIFICATION_WEIGHT,
};

/// Sub-scores for one listing before they are stamped and persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityBreakdown {
    pub photo_score: u8,
    pub description_score: u8,
    pub specification_score: u8,
    pub overall_score: u8,
}

impl QualityBreakdown {
    pub fn for_listing(listing: &Listing) -> Self {
        let photo_score = photo_score(listing.image_count);
        let description_score = description_score(
            &listing.description,
            listing.description_secondary.as_deref(),
        );
        let specification_score = specification_score(&listing.specifications);
        let overall = f64::from(photo_score) * PHOTO_WEIGHT
            + f64::from(description_score) * DESCRIPTION_WEIGHT
            + f64::from(specification_score) * SPECIFICATION_WEIGHT;

        Self {
            photo_score,
            description_score,
            specification_score,
            overall_score: overall.round().clamp(0.0, 100.0) as u8,
        }
    }
}

/// 20 points per photo, flat from [`PHOTO_CAP`] upward.
pub fn photo_score(image_count: u32) -> u8 {
    (image_count.min(PHOTO_CAP) * 20) as u8
}

/// Ramp to 60 at the good threshold, 80 at excellent, plus a bonus for a
/// substantial secondary-language description.
pub fn description_score(primary: &str, secondary: Option<&str>) -> u8 {
    let length = primary.trim().chars().count();
    let base: u8 = if length == 0 {
        0
    } else if length < GOOD_DESCRIPTION_CHARS {
        ((length as f64 / GOOD_DESCRIPTION_CHARS as f64) * 60.0).round() as u8
    } else if length < EXCELLENT_DESCRIPTION_CHARS {
        60
    } else {
        80
    };

    let secondary_length = secondary
        .map(|text| text.trim().chars().count())
        .unwrap_or(0);
    if secondary_length >= GOOD_DESCRIPTION_CHARS {
        base.saturating_add(SECONDARY_DESCRIPTION_BONUS).min(100)
    } else {
        base
    }
}

/// Step score over the number of meaningfully filled specification fields.
pub fn specification_score(specifications: &BTreeMap<String, serde_json::Value>) -> u8 {
    let filled = specifications
        .values()
        .filter(|value| match value {
            serde_json::Value::Null => false,
            serde_json::Value::String(text) => !text.trim().is_empty(),
            _ => true,
        })
        .count();

    match filled {
        0 => 0,
        1..=2 => 30,
        3..=4 => 60,
        _ => 100,
    }
}

/// Computes and persists per-listing quality scores.
pub struct QualityScoringEngine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> QualityScoringEngine<S>
where
    S: TrustStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Recompute the listing's score from its current data and overwrite the stored row.
    pub fn recalculate(&self, listing_id: &ListingId) -> Result<QualityScore, QualityError> {
        let listing = self
            .store
            .listing(listing_id)?
            .ok_or_else(|| QualityError::ListingNotFound(listing_id.clone()))?;
        self.score(&listing)
    }

    pub fn score(&self, listing: &Listing) -> Result<QualityScore, QualityError> {
        let breakdown = QualityBreakdown::for_listing(listing);
        let score = QualityScore {
            listing_id: listing.id.clone(),
            photo_score: breakdown.photo_score,
            description_score: breakdown.description_score,
            specification_score: breakdown.specification_score,
            overall_score: breakdown.overall_score,
            recalculated_at: self.clock.now(),
        };
        self.store.upsert_quality_score(score.clone())?;
        debug!(listing_id = %listing.id, overall = score.overall_score, "listing quality scored");
        Ok(score)
    }

    pub fn get_quality_score(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<QualityScore>, StoreError> {
        self.store.quality_score(listing_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    #[error("listing {0} not found")]
    ListingNotFound(ListingId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
