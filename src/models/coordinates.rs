// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geographic coordinates shared by waypoints, positions and requests.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[serde(alias = "latitude")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[serde(alias = "longitude")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinates> for geo::Point<f64> {
    fn from(c: Coordinates) -> Self {
        // geo points are (x = longitude, y = latitude)
        geo::Point::new(c.lon, c.lat)
    }
}
