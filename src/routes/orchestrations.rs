// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-service workflow routes.

use super::validated;
use crate::error::AppError;
use crate::services::{PurchaseOutcome, SagaFailure, SagaStep};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/orchestrations/purchase-start", post(purchase_start))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseStartRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    pub tour_id: Uuid,
}

/// Error body for a failed workflow.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaErrorResponse {
    pub error: &'static str,
    pub failed_step: SagaStep,
    pub compensated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Workflow failures are always reported as 4xx: the step's own status when it
/// is already a client error, otherwise 424 Failed Dependency.
impl IntoResponse for SagaFailure {
    fn into_response(self) -> Response {
        let (inner_status, code) = self.source.status_and_code();
        let status = if inner_status.is_client_error() {
            inner_status
        } else {
            StatusCode::FAILED_DEPENDENCY
        };

        let body = SagaErrorResponse {
            error: code,
            failed_step: self.step,
            compensated: self.compensated,
            details: self.source.client_details(),
        };

        (status, Json(body)).into_response()
    }
}

async fn purchase_start(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PurchaseStartRequest>, JsonRejection>,
) -> Result<Json<PurchaseOutcome>, Response> {
    let req = validated(payload).map_err(AppError::into_response)?;

    state
        .orchestrator
        .purchase_and_start(&req.user_id, req.tour_id)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}
