use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::cache::ResultCache;
use super::domain::{LeadId, ListingId, ReviewId, ReviewRating, Reviewer, UserId};
use super::events::TrustEvent;
use super::reviews::{ErrorKind, ReviewError, ReviewSubmission};
use super::store::{StoreError, TrustStore};
use super::TrustEngine;

/// HTTP adapter over the engine's read accessors and user-driven writes.
pub fn trust_router<S, C>(engine: Arc<TrustEngine<S, C>>) -> Router
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    Router::new()
        .route("/api/v1/owners/:owner_id/trust", get(metrics_handler::<S, C>))
        .route(
            "/api/v1/owners/:owner_id/ratings",
            get(rating_breakdown_handler::<S, C>),
        )
        .route(
            "/api/v1/listings/:listing_id/quality",
            get(quality_handler::<S, C>),
        )
        .route(
            "/api/v1/leads/:lead_id/review",
            post(submit_review_handler::<S, C>),
        )
        .route(
            "/api/v1/leads/:lead_id/review-eligibility",
            get(eligibility_handler::<S, C>),
        )
        .route(
            "/api/v1/reviews/:review_id/response",
            post(respond_handler::<S, C>),
        )
        .route("/api/v1/reviews/:review_id/flag", post(flag_handler::<S, C>))
        .route(
            "/api/v1/review-requests/process",
            post(process_requests_handler::<S, C>),
        )
        .route("/api/v1/events", post(event_handler::<S, C>))
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitReviewBody {
    pub reviewer: Reviewer,
    pub rating: ReviewRating,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RespondBody {
    pub owner_id: UserId,
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlagBody {
    pub reason: String,
}

pub(crate) async fn metrics_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    let owner_id = UserId(owner_id);
    match engine.scoring.get_metrics(&owner_id) {
        Ok(Some(metrics)) => (StatusCode::OK, Json(metrics)).into_response(),
        Ok(None) => not_found(format!("no trust metrics computed for owner {owner_id}")),
        Err(error) => store_failure(error),
    }
}

pub(crate) async fn rating_breakdown_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    let owner_id = UserId(owner_id);
    match engine.scoring.rating_breakdown(&owner_id) {
        Ok(Some(breakdown)) => (StatusCode::OK, Json(breakdown)).into_response(),
        Ok(None) => not_found(format!("no ratings recorded for owner {owner_id}")),
        Err(error) => store_failure(error),
    }
}

pub(crate) async fn quality_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    let listing_id = ListingId(listing_id);
    match engine.quality.get_quality_score(&listing_id) {
        Ok(Some(score)) => (StatusCode::OK, Json(score)).into_response(),
        Ok(None) => not_found(format!("listing {listing_id} has not been scored")),
        Err(error) => store_failure(error),
    }
}

pub(crate) async fn submit_review_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(lead_id): Path<String>,
    Json(body): Json<SubmitReviewBody>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    let submission = ReviewSubmission {
        lead_id: LeadId(lead_id),
        reviewer: body.reviewer,
        rating: body.rating,
        title: body.title,
        comment: body.comment,
    };
    match engine.reviews.submit_review(submission) {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(error) => review_error(error),
    }
}

pub(crate) async fn eligibility_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    match engine.reviews.eligibility(&LeadId(lead_id)) {
        Ok(eligibility) => (StatusCode::OK, Json(eligibility)).into_response(),
        Err(error) => review_error(error),
    }
}

pub(crate) async fn respond_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(review_id): Path<String>,
    Json(body): Json<RespondBody>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    match engine
        .reviews
        .respond_to_review(&ReviewId(review_id), &body.owner_id, &body.response)
    {
        Ok(review) => (StatusCode::OK, Json(review)).into_response(),
        Err(error) => review_error(error),
    }
}

pub(crate) async fn flag_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Path(review_id): Path<String>,
    Json(body): Json<FlagBody>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    match engine.reviews.flag_review(&ReviewId(review_id), &body.reason) {
        Ok(review) => (StatusCode::OK, Json(review)).into_response(),
        Err(error) => review_error(error),
    }
}

pub(crate) async fn process_requests_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    match engine.process_pending_review_requests() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => review_error(error),
    }
}

pub(crate) async fn event_handler<S, C>(
    State(engine): State<Arc<TrustEngine<S, C>>>,
    Json(event): Json<TrustEvent>,
) -> Response
where
    S: TrustStore + 'static,
    C: ResultCache + 'static,
{
    let name = event.name();
    engine.sink.emit(event);
    (StatusCode::ACCEPTED, Json(json!({ "accepted": name }))).into_response()
}

fn review_error(error: ReviewError) -> Response {
    let kind = error.kind();
    let status = match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::StoreFailure => {
            error!(%error, "review operation failed in the store");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = match kind {
        ErrorKind::StoreFailure => "internal store failure".to_string(),
        _ => error.to_string(),
    };
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

fn store_failure(error: StoreError) -> Response {
    error!(%error, "trust read failed in the store");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal store failure" })),
    )
        .into_response()
}
