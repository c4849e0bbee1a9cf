// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and the "waypoint reached" decision.

use crate::models::Coordinates;
use geo::Point;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Radius used when none is configured.
pub const DEFAULT_PROXIMITY_RADIUS_METERS: f64 = 10.0;

/// Haversine distance in meters between two lat/lon pairs given in degrees.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Stateless evaluator with an injected reach radius.
#[derive(Debug, Clone, Copy)]
pub struct ProximityEvaluator {
    radius_meters: f64,
}

impl Default for ProximityEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_RADIUS_METERS)
    }
}

impl ProximityEvaluator {
    pub fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Distance in meters between two positions.
    pub fn distance(&self, from: Coordinates, to: Coordinates) -> f64 {
        let (a, b): (Point<f64>, Point<f64>) = (from.into(), to.into());
        haversine_meters(a.y(), a.x(), b.y(), b.x())
    }

    /// Whether `distance_meters` is within the reach radius (inclusive).
    pub fn reached(&self, distance_meters: f64) -> bool {
        distance_meters <= self.radius_meters
    }
}
