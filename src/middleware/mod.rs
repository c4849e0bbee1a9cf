// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules.

pub mod correlation;
pub mod metrics;

pub use correlation::{propagate_correlation_ids, CorrelationIds};
pub use metrics::{track_metrics, HttpMetrics};
