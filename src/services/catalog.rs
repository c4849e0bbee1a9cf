// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tour catalog collaborator (tour metadata and ordered key points).

use crate::error::AppError;
use crate::models::{KeyPoint, Tour};
use crate::services::upstream::JsonHttpClient;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Read-only view of the tour catalog.
#[async_trait]
pub trait TourCatalog: Send + Sync {
    /// Fetch tour metadata. `Ok(None)` if the tour does not exist.
    async fn get_tour(&self, tour_id: Uuid) -> Result<Option<Tour>, AppError>;

    /// Key points of a tour in catalog order (creation order).
    async fn list_key_points(&self, tour_id: Uuid) -> Result<Vec<KeyPoint>, AppError>;
}

/// Catalog client for the tour service's HTTP API.
#[derive(Clone)]
pub struct HttpTourCatalog {
    client: JsonHttpClient,
}

impl HttpTourCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: JsonHttpClient::new("tour-service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl TourCatalog for HttpTourCatalog {
    async fn get_tour(&self, tour_id: Uuid) -> Result<Option<Tour>, AppError> {
        self.client.get_optional(&format!("/tours/{}", tour_id)).await
    }

    async fn list_key_points(&self, tour_id: Uuid) -> Result<Vec<KeyPoint>, AppError> {
        let key_points: Option<Vec<KeyPoint>> = self
            .client
            .get_optional(&format!("/keyPoints/tours/{}/sortedByCreatedAt", tour_id))
            .await?;
        Ok(key_points.unwrap_or_default())
    }
}
