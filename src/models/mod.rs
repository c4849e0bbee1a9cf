// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod coordinates;
pub mod execution;
pub mod purchase;
pub mod tour;

pub use coordinates::Coordinates;
pub use execution::{
    ExecutionStatus, KeyPointRef, ProximityCheckResult, TourExecution, VisitedKeyPoint,
};
pub use purchase::{OrderItem, PurchaseToken};
pub use tour::{KeyPoint, Tour, TourStatus};
