// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Last-known-location collaborator.

use crate::error::AppError;
use crate::models::Coordinates;
use crate::services::upstream::JsonHttpClient;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[async_trait]
pub trait LocationTracker: Send + Sync {
    /// The user's most recent position fix, if one was ever recorded.
    async fn last_known(&self, user_id: &str) -> Result<Option<Coordinates>, AppError>;
}

/// Location record as served by the simulator endpoint (`userId` and
/// `updatedAt` are not needed here).
#[derive(Debug, Deserialize)]
struct CurrentLocation {
    coordinates: Coordinates,
}

#[derive(Clone)]
pub struct HttpLocationTracker {
    client: JsonHttpClient,
}

impl HttpLocationTracker {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: JsonHttpClient::new("location-service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl LocationTracker for HttpLocationTracker {
    async fn last_known(&self, user_id: &str) -> Result<Option<Coordinates>, AppError> {
        let location: Option<CurrentLocation> = self
            .client
            .get_optional(&format!("/simulator/location/{}", user_id))
            .await?;
        Ok(location.map(|l| l.coordinates))
    }
}
