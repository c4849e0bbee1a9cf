// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic and collaborator clients.

pub mod cart;
pub mod catalog;
pub mod execution;
pub mod location;
pub mod orchestrator;
pub mod proximity;
pub mod upstream;

pub use cart::{CartService, HttpCartClient};
pub use catalog::{HttpTourCatalog, TourCatalog};
pub use execution::TourExecutionService;
pub use location::{HttpLocationTracker, LocationTracker};
pub use orchestrator::{PurchaseOrchestrator, PurchaseOutcome, SagaFailure, SagaStep};
pub use proximity::ProximityEvaluator;
