//! End-to-end owner history driven through the public engine facade.
//!
//! Collaborator events are dispatched synchronously so each assertion sees
//! the fully recomputed metrics.

mod common {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    use equipment_trust::config::TrustEngineConfig;
    use equipment_trust::trust::{
        ContactInfo, FixedClock, Lead, LeadId, LeadStatus, Listing, ListingId, ListingStatus,
        MemoryCache, MemoryStore, NotifierError, Owner, ReviewInvitation, ReviewNotifier,
        TrustEngine, TrustEvent, TrustEventSink, UserId, VerificationStatus,
    };

    pub(super) const OWNER: &str = "owner-alpha";

    pub(super) fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn phone(index: usize) -> String {
        format!("+966 50 222 {index:04}")
    }

    pub(super) fn owner() -> Owner {
        Owner {
            id: UserId::new(OWNER),
            created_at: start() - Duration::days(90),
            business_verification: VerificationStatus::Pending,
            identity_verified: true,
        }
    }

    pub(super) fn complete_listing() -> Listing {
        let mut specifications = BTreeMap::new();
        for (key, value) in [
            ("make", json!("Volvo")),
            ("model", json!("EC220E")),
            ("year", json!(2019)),
            ("hours", json!(4_100)),
            ("track_width_mm", json!(600)),
        ] {
            specifications.insert(key.to_string(), value);
        }
        Listing {
            id: ListingId::new("lst-a"),
            owner_id: UserId::new(OWNER),
            image_count: 5,
            description: "d".repeat(320),
            description_secondary: None,
            specifications,
            status: ListingStatus::Active,
        }
    }

    pub(super) fn lead(index: usize, created_at: DateTime<Utc>) -> Lead {
        Lead {
            id: LeadId::new(format!("lead-{index}")),
            listing_id: ListingId::new("lst-a"),
            owner_id: UserId::new(OWNER),
            created_at,
            status: LeadStatus::New,
            contact: ContactInfo {
                phone: Some(phone(index)),
                email: None,
            },
            owner_responded_at: None,
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingSink {
        events: Mutex<Vec<TrustEvent>>,
    }

    impl RecordingSink {
        pub(super) fn take(&self) -> Vec<TrustEvent> {
            std::mem::take(&mut *self.events.lock().expect("sink mutex poisoned"))
        }
    }

    impl TrustEventSink for RecordingSink {
        fn emit(&self, event: TrustEvent) {
            self.events.lock().expect("sink mutex poisoned").push(event);
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingNotifier {
        delivered: Mutex<Vec<LeadId>>,
    }

    impl RecordingNotifier {
        pub(super) fn delivered(&self) -> Vec<LeadId> {
            self.delivered
                .lock()
                .expect("notifier mutex poisoned")
                .clone()
        }
    }

    impl ReviewNotifier for RecordingNotifier {
        fn notify(&self, invitation: &ReviewInvitation) -> Result<(), NotifierError> {
            self.delivered
                .lock()
                .expect("notifier mutex poisoned")
                .push(invitation.lead.id.clone());
            Ok(())
        }
    }

    pub(super) struct World {
        pub store: Arc<MemoryStore>,
        pub clock: Arc<FixedClock>,
        pub sink: Arc<RecordingSink>,
        pub notifier: Arc<RecordingNotifier>,
        pub engine: TrustEngine<MemoryStore, MemoryCache>,
    }

    impl World {
        pub(super) fn flush(&self) {
            for event in self.sink.take() {
                self.engine.events.dispatch(event);
            }
        }
    }

    pub(super) fn world() -> World {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(FixedClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = TrustEngine::new(
            store.clone(),
            Arc::new(MemoryCache::new(clock.clone())),
            clock.clone(),
            sink.clone(),
            notifier.clone(),
            &TrustEngineConfig::default(),
        );
        store.put_owner(owner());
        store.put_listing(complete_listing());
        World {
            store,
            clock,
            sink,
            notifier,
            engine,
        }
    }
}

use chrono::Duration;
use equipment_trust::trust::{
    Badge, Clock, LeadId, ListingId, ReviewError, ReviewRating, ReviewSubmission, Reviewer,
    TrustEvent, UserId, VerificationStatus,
};

use common::*;

fn submission(index: usize, rating: ReviewRating) -> ReviewSubmission {
    ReviewSubmission {
        lead_id: LeadId::new(format!("lead-{index}")),
        reviewer: Reviewer {
            user_id: UserId::new(format!("renter-{index}")),
            verified_phone: Some(phone(index)),
            verified_email: None,
        },
        rating,
        title: Some("Excavator hire".to_string()),
        comment: None,
    }
}

#[test]
fn owner_history_produces_expected_trust_profile() {
    let world = world();
    let owner_id = UserId::new(OWNER);

    world.engine.events.dispatch(TrustEvent::ListingCreated {
        listing_id: ListingId::new("lst-a"),
    });

    for index in 0..4 {
        let created_at = world.clock.now();
        world.store.put_lead(lead(index, created_at));
        world.engine.events.dispatch(TrustEvent::LeadCreated {
            lead_id: LeadId::new(format!("lead-{index}")),
        });
        if index < 3 {
            world.engine.events.dispatch(TrustEvent::LeadResponded {
                lead_id: LeadId::new(format!("lead-{index}")),
                responded_at: created_at + Duration::minutes(30),
            });
        }
        world.clock.advance(Duration::hours(1));
    }

    let metrics = world
        .engine
        .scoring
        .get_metrics(&owner_id)
        .expect("read")
        .expect("computed");
    assert_eq!(metrics.total_leads, 4);
    assert_eq!(metrics.responded_leads, 3);
    assert_eq!(metrics.response_rate, 75.0);
    assert_eq!(metrics.avg_response_time_hours, Some(0.5));
    assert_eq!(metrics.avg_quality_score, Some(93.0));
    assert!(metrics.has_badge(Badge::FastResponder));
    assert!(!metrics.has_badge(Badge::Reliable));

    world.clock.advance(Duration::days(8));
    let report = world
        .engine
        .process_pending_review_requests()
        .expect("dispatch runs");
    assert_eq!(report.due, 4);
    assert_eq!(report.notified, 4);
    assert_eq!(world.notifier.delivered().len(), 4);

    world
        .engine
        .reviews
        .submit_review(submission(0, ReviewRating::Excellent))
        .expect("first review");
    world
        .engine
        .reviews
        .submit_review(submission(1, ReviewRating::Good))
        .expect("second review");
    let mut stranger = submission(2, ReviewRating::VeryPoor);
    stranger.reviewer.verified_phone = Some("+966 59 999 0000".to_string());
    assert!(matches!(
        world.engine.reviews.submit_review(stranger),
        Err(ReviewError::IdentityMismatch)
    ));
    world.flush();

    let metrics = world
        .engine
        .scoring
        .get_metrics(&owner_id)
        .expect("read")
        .expect("computed");
    assert_eq!(metrics.total_reviews, 2);
    assert_eq!(metrics.average_rating, Some(4.5));
    assert_eq!(metrics.rating_breakdown.excellent, 1);
    assert_eq!(metrics.rating_breakdown.good, 1);
    assert_eq!(metrics.score_breakdown.verification_bonus, 10);
    // 85 * 0.4 + 35 * 0.3 + 93 * 0.2 + 10
    assert_eq!(metrics.trust_score, 73);
    assert!(metrics.has_badge(Badge::VerifiedIdentity));
    assert!(!metrics.has_badge(Badge::VerifiedBusiness));

    let mut approved = owner();
    approved.business_verification = VerificationStatus::Verified;
    world.store.put_owner(approved);
    world
        .engine
        .events
        .dispatch(TrustEvent::VerificationApproved {
            owner_id: owner_id.clone(),
        });
    let metrics = world
        .engine
        .scoring
        .get_metrics(&owner_id)
        .expect("read")
        .expect("computed");
    assert_eq!(metrics.trust_score, 73);
    assert!(metrics.has_badge(Badge::VerifiedBusiness));
}

#[test]
fn unanswered_invitations_expire_after_the_window() {
    let world = world();
    for index in 0..3 {
        world.store.put_lead(lead(index, world.clock.now()));
        world.engine.events.on_lead_created(&LeadId::new(format!("lead-{index}")));
    }

    world.clock.advance(Duration::days(8));
    world
        .engine
        .reviews
        .submit_review(submission(0, ReviewRating::Average))
        .expect("review inside window");

    world.clock.advance(Duration::days(30));
    let err = world
        .engine
        .reviews
        .submit_review(submission(1, ReviewRating::Good))
        .expect_err("window closed");
    assert!(matches!(err, ReviewError::Expired { .. }));

    let sweep = world.engine.reviews.expire_old_requests().expect("sweep");
    assert_eq!(sweep.expired, 2);
    assert_eq!(sweep.checked_at, world.clock.now());
}
