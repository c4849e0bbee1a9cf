// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tour catalog views consumed from the tour service.

use super::Coordinates;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication state of a tour in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TourStatus {
    Draft,
    Published,
    Archived,
}

impl TourStatus {
    /// Whether a tourist may walk (and buy) a tour in this state.
    pub fn is_consumable(self) -> bool {
        matches!(self, TourStatus::Published | TourStatus::Archived)
    }
}

/// Tour metadata as returned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub price: f64,
    pub status: TourStatus,
}

/// A waypoint as stored in the catalog (mutable by the tour author).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPoint {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub title: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}
