//! Route handlers

use super::error::ApiError;
use super::AppState;
use crate::core::request::ClaimRequest;
use crate::core::{PreviewOutcome, SubmitReceipt};
use crate::domain::{ClaimRecord, ClaimStats};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::Value;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub records_backend: &'static str,
}

/// Liveness
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        records_backend: state.orchestrator.records().backend_name(),
    })
}

fn parse_request(body: Result<Json<Value>, JsonRejection>) -> ApiResult<ClaimRequest> {
    let Json(value) = body?;
    Ok(ClaimRequest::from_value(value)?)
}

/// POST /claim/build
pub async fn build_claim(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PreviewOutcome>> {
    let request = parse_request(body)?;
    Ok(Json(state.orchestrator.preview(request).await?))
}

/// POST /claim/submit
pub async fn submit_claim(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitReceipt>)> {
    let request = parse_request(body)?;
    let receipt = state.orchestrator.submit_single(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /claim/bundle/submit
pub async fn submit_bundle(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitReceipt>)> {
    let request = parse_request(body)?;
    let receipt = state.orchestrator.submit_bundle(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /claim
pub async fn list_claims(State(state): State<AppState>) -> ApiResult<Json<Vec<ClaimRecord>>> {
    Ok(Json(state.orchestrator.records().list().await?))
}

/// GET /claim/patient/:id
pub async fn list_patient_claims(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<ClaimRecord>>> {
    Ok(Json(
        state
            .orchestrator
            .records()
            .list_for_patient(patient_id.trim())
            .await?,
    ))
}

/// GET /claim/stats
pub async fn claim_stats(State(state): State<AppState>) -> ApiResult<Json<ClaimStats>> {
    Ok(Json(state.orchestrator.records().stats().await?))
}
