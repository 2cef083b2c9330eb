use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::TrustEngineConfig;
use crate::trust::cache::{CacheError, MemoryCache, ResultCache};
use crate::trust::clock::FixedClock;
use crate::trust::domain::{
    ContactInfo, Lead, LeadId, LeadStatus, Listing, ListingId, ListingStatus, Owner, Reviewer,
    UserId, VerificationStatus,
};
use crate::trust::events::{TrustEvent, TrustEventSink};
use crate::trust::memory::MemoryStore;
use crate::trust::reviews::{NotifierError, ReviewInvitation, ReviewNotifier};
use crate::trust::TrustEngine;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) const OWNER: &str = "owner-100";
pub(super) const RENTER_PHONE: &str = "+966 55 000 1122";
pub(super) const RENTER_EMAIL: &str = "renter@example.com";

pub(super) fn owner_id() -> UserId {
    UserId::new(OWNER)
}

pub(super) fn owner(business: VerificationStatus, identity_verified: bool) -> Owner {
    Owner {
        id: owner_id(),
        created_at: now() - Duration::days(400),
        business_verification: business,
        identity_verified,
    }
}

pub(super) fn listing(id: &str, image_count: u32, description_chars: usize) -> Listing {
    Listing {
        id: ListingId::new(id),
        owner_id: owner_id(),
        image_count,
        description: "x".repeat(description_chars),
        description_secondary: None,
        specifications: BTreeMap::new(),
        status: ListingStatus::Active,
    }
}

pub(super) fn renter_contact() -> ContactInfo {
    ContactInfo {
        phone: Some(RENTER_PHONE.to_string()),
        email: Some(RENTER_EMAIL.to_string()),
    }
}

pub(super) fn lead(id: &str, listing_id: &str, created_at: DateTime<Utc>) -> Lead {
    Lead {
        id: LeadId::new(id),
        listing_id: ListingId::new(listing_id),
        owner_id: owner_id(),
        created_at,
        status: LeadStatus::New,
        contact: renter_contact(),
        owner_responded_at: None,
    }
}

pub(super) fn responded_lead(
    id: &str,
    created_at: DateTime<Utc>,
    response_after: Duration,
) -> Lead {
    Lead {
        status: LeadStatus::Contacted,
        owner_responded_at: Some(created_at + response_after),
        ..lead(id, "lst-1", created_at)
    }
}

pub(super) fn renter() -> Reviewer {
    Reviewer {
        user_id: UserId::new("renter-7"),
        verified_phone: Some("966550001122".to_string()),
        verified_email: None,
    }
}

pub(super) struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: TrustEngine<MemoryStore, MemoryCache>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(FixedClock::new(now()));
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let sink = Arc::new(RecordingSink::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TrustEngine::new(
        store.clone(),
        cache.clone(),
        clock.clone(),
        sink.clone(),
        notifier.clone(),
        &TrustEngineConfig::default(),
    );
    Harness {
        store,
        cache,
        clock,
        sink,
        notifier,
        engine,
    }
}

/// Harness seeded with an unverified owner and one active listing.
pub(super) fn seeded_harness() -> Harness {
    let harness = harness();
    harness
        .store
        .put_owner(owner(VerificationStatus::Unverified, false));
    harness.store.put_listing(listing("lst-1", 3, 150));
    harness
}

#[derive(Default)]
pub(super) struct RecordingSink {
    events: Mutex<Vec<TrustEvent>>,
}

impl RecordingSink {
    pub(super) fn events(&self) -> Vec<TrustEvent> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

impl TrustEventSink for RecordingSink {
    fn emit(&self, event: TrustEvent) {
        self.events.lock().expect("sink mutex poisoned").push(event);
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    delivered: Mutex<Vec<ReviewInvitation>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub(super) fn delivered(&self) -> Vec<ReviewInvitation> {
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .clone()
    }

    pub(super) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ReviewNotifier for RecordingNotifier {
    fn notify(&self, invitation: &ReviewInvitation) -> Result<(), NotifierError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifierError::Transport("sms gateway offline".to_string()));
        }
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .push(invitation.clone());
        Ok(())
    }
}

/// Cache whose backend is permanently down.
pub(super) struct OfflineCache;

impl ResultCache for OfflineCache {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn set(&self, _key: &str, _value: String, _ttl_seconds: u64) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
