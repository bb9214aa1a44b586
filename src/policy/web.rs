use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::policy::errors::ApiError;
use crate::policy::hooks;
use crate::policy::persist::ConfigStore;
use crate::policy::store;
use crate::policy::types::{DecideRequest, PolicyConfiguration, Submission, SubmissionResponse};

#[derive(Clone)]
pub struct PolicyState {
    pub store: Arc<dyn ConfigStore>,
    /// Base URL used to build redirect locations
    pub site_url: Arc<str>,
    /// Request path prefixes of the admin UI's background calls
    pub async_prefixes: Arc<[String]>,
}

pub fn router(state: PolicyState) -> Router {
    Router::new()
        .route("/v1/decide", post(handle_decide))
        .route("/v1/policy", get(handle_get_policy).post(handle_submit_policy))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn handle_decide(
    State(state): State<PolicyState>,
    Json(req): Json<DecideRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = hooks::decide(
        state.store.as_ref(),
        &req,
        &state.site_url,
        &state.async_prefixes,
    )?;
    Ok(Json(response))
}

async fn handle_get_policy(State(state): State<PolicyState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.load()?))
}

async fn handle_submit_policy(
    State(state): State<PolicyState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let submission: Submission = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid settings submission: {e}")))?;

    let mut notices = Vec::new();
    let config = state
        .store
        .update(&mut |current: &PolicyConfiguration| {
            let outcome = store::apply_submission(current, submission.clone());
            notices = outcome.notices;
            outcome.config
        })?;

    Ok(Json(SubmissionResponse { config, notices }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
