// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tour execution tracking routes.

use super::validated;
use crate::error::{AppError, Result};
use crate::models::{Coordinates, ProximityCheckResult, TourExecution};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tour-executions/start", post(start))
        .route("/tour-executions/check", post(check))
        .route("/tour-executions/abandon", post(abandon))
        .route("/tour-executions/active", post(get_active))
        .route("/tour-executions/active-for-tour", post(get_active_for_tour))
        .route("/tour-executions/{id}", get(get_by_id))
}

// ─── Requests ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    pub tour_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(nested)]
    pub coords: Coordinates,
    #[serde(default)]
    pub tour_id: Option<Uuid>,
}

/// Body for abandon and active lookups; `tourId` narrows the selection.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[serde(default)]
    pub tour_id: Option<Uuid>,
}

// ─── Handlers ────────────────────────────────────────────────

async fn start(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<TourExecution>> {
    let req = validated(payload)?;
    let execution = state.executions.start(&req.user_id, req.tour_id).await?;
    Ok(Json(execution))
}

async fn check(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ProximityCheckResult>> {
    let req = validated(payload)?;
    let result = state
        .executions
        .check_proximity(&req.user_id, req.coords, req.tour_id)
        .await?;
    Ok(Json(result))
}

async fn abandon(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UserRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let req = validated(payload)?;
    state.executions.abandon(&req.user_id, req.tour_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Most recent active execution for the user, or 204 if there is none.
async fn get_active(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UserRequest>, JsonRejection>,
) -> Result<Response> {
    let req = validated(payload)?;
    let active = match req.tour_id {
        Some(tour_id) => {
            state
                .executions
                .get_active_for_tour(&req.user_id, tour_id)
                .await?
        }
        None => state.executions.get_active(&req.user_id).await?,
    };
    Ok(execution_or_no_content(active))
}

async fn get_active_for_tour(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UserRequest>, JsonRejection>,
) -> Result<Response> {
    let req = validated(payload)?;
    let tour_id = req
        .tour_id
        .ok_or_else(|| AppError::Validation("tourId is required".to_string()))?;
    let active = state
        .executions
        .get_active_for_tour(&req.user_id, tour_id)
        .await?;
    Ok(execution_or_no_content(active))
}

async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TourExecution>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::Validation(format!("Invalid execution id: {}", id)))?;
    let execution = state
        .executions
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Execution {}", id)))?;
    Ok(Json(execution))
}

fn execution_or_no_content(execution: Option<TourExecution>) -> Response {
    match execution {
        Some(execution) => Json(execution).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
