// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tour-Tracker: live progress tracking for walking tours
//!
//! This crate provides the backend API that follows a user through the key
//! points of a tour in order, and the purchase workflow that buys a tour and
//! starts tracking it, undoing the start if the purchase fails.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use middleware::HttpMetrics;
use services::{PurchaseOrchestrator, TourExecutionService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub executions: TourExecutionService,
    pub orchestrator: PurchaseOrchestrator,
    pub metrics: HttpMetrics,
}
