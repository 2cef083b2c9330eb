use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::trust::domain::LeadId;
use crate::trust::events::TrustEvent;
use crate::trust::router::trust_router;
use crate::trust::store::ReviewStore;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn review_payload(rating: &str) -> Value {
    json!({
        "reviewer": {
            "user_id": "renter-7",
            "verified_phone": "966550001122"
        },
        "rating": rating,
        "title": "Solid excavator",
        "comment": "Delivered on time and clean."
    })
}

#[tokio::test]
async fn trust_metrics_are_not_found_until_computed() {
    let harness = seeded_harness();
    let engine = Arc::new(harness.engine);
    let app = trust_router(engine.clone());

    let response = app
        .clone()
        .oneshot(get("/api/v1/owners/owner-100/trust"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    engine.scoring.recalculate(&owner_id()).expect("recalculated");

    let response = app
        .oneshot(get("/api/v1/owners/owner-100/trust"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["owner_id"], "owner-100");
    assert_eq!(body["trust_score"], 65);
}

#[tokio::test]
async fn review_submission_returns_created_then_conflict() {
    let harness = seeded_harness();
    harness
        .store
        .put_lead(lead("lead-1", "lst-1", now() - Duration::days(9)));
    let app: Router = trust_router(Arc::new(harness.engine));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/leads/lead-1/review",
            review_payload("EXCELLENT"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["rating"], "EXCELLENT");
    assert_eq!(body["owner_id"], "owner-100");

    let response = app
        .oneshot(post_json(
            "/api/v1/leads/lead-1/review",
            review_payload("GOOD"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "already_exists");

    assert!(matches!(
        harness.sink.events().as_slice(),
        [TrustEvent::ReviewSubmitted { .. }]
    ));
}

#[tokio::test]
async fn review_errors_map_to_status_codes() {
    let harness = seeded_harness();
    harness
        .store
        .put_lead(lead("lead-young", "lst-1", now() - Duration::days(2)));
    let app = trust_router(Arc::new(harness.engine));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/leads/lead-missing/review",
            review_payload("GOOD"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/leads/lead-young/review",
            review_payload("GOOD"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json_body(response).await["kind"], "invalid_state");

    let stranger = json!({
        "reviewer": { "user_id": "renter-9", "verified_phone": "966559999999" },
        "rating": "POOR"
    });
    let response = app
        .oneshot(post_json("/api/v1/leads/lead-young/review", stranger))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn eligibility_reports_window_state() {
    let harness = seeded_harness();
    let created_at = now() - Duration::days(2);
    harness.store.put_lead(lead("lead-1", "lst-1", created_at));
    let app = trust_router(Arc::new(harness.engine));

    let response = app
        .oneshot(get("/api/v1/leads/lead-1/review-eligibility"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["state"], "no_request");
}

#[tokio::test]
async fn owner_response_goes_through_once() {
    let harness = seeded_harness();
    harness
        .store
        .put_lead(lead("lead-1", "lst-1", now() - Duration::days(8)));
    let review = harness
        .engine
        .reviews
        .submit_review(crate::trust::reviews::ReviewSubmission {
            lead_id: LeadId::new("lead-1"),
            reviewer: renter(),
            rating: crate::trust::domain::ReviewRating::Average,
            title: None,
            comment: None,
        })
        .expect("accepted");
    let app = trust_router(Arc::new(harness.engine));
    let uri = format!("/api/v1/reviews/{}/response", review.id);

    let response = app
        .clone()
        .oneshot(post_json(
            &uri,
            json!({ "owner_id": "renter-7", "response": "Not mine" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json(
            &uri,
            json!({ "owner_id": OWNER, "response": "Thanks for renting." }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["owner_response"], "Thanks for renting.");

    let response = app
        .oneshot(post_json(
            &uri,
            json!({ "owner_id": OWNER, "response": "Edited" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn quality_route_serves_stored_score() {
    let harness = seeded_harness();
    let engine = Arc::new(harness.engine);
    let app = trust_router(engine.clone());

    let response = app
        .clone()
        .oneshot(get("/api/v1/listings/lst-1/quality"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/events",
            json!({ "type": "listing_created", "listing_id": "lst-1" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json_body(response).await["accepted"], "listing_created");

    let accepted = harness.sink.events();
    assert_eq!(accepted.len(), 1);
    for event in accepted {
        engine.events.dispatch(event);
    }

    let response = app
        .oneshot(get("/api/v1/listings/lst-1/quality"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["overall_score"], 45);
}

#[tokio::test]
async fn process_route_reports_dispatch_counts() {
    let harness = seeded_harness();
    harness
        .store
        .put_lead(lead("lead-1", "lst-1", now() - Duration::days(8)));
    harness
        .engine
        .reviews
        .schedule_review_request(&LeadId::new("lead-1"))
        .expect("scheduled");
    let app = trust_router(Arc::new(harness.engine));

    let response = app
        .oneshot(post_json("/api/v1/review-requests/process", json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["due"], 1);
    assert_eq!(body["notified"], 1);
    assert_eq!(harness.notifier.delivered().len(), 1);
}

#[tokio::test]
async fn completed_request_conflicts_over_http() {
    let harness = seeded_harness();
    harness
        .store
        .put_lead(lead("lead-1", "lst-1", now() - Duration::days(9)));
    let lead_id = LeadId::new("lead-1");
    harness
        .engine
        .reviews
        .create_review_request(&lead_id)
        .expect("request created");
    harness
        .store
        .complete_review_request(&lead_id, now())
        .expect("completed");
    let app = trust_router(Arc::new(harness.engine));

    let response = app
        .oneshot(post_json(
            "/api/v1/leads/lead-1/review",
            review_payload("GOOD"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(read_json_body(response).await["kind"], "already_exists");
}
