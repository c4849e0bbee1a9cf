// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopping cart / checkout collaborator, reached over RPC-style HTTP.

use crate::error::AppError;
use crate::models::{OrderItem, PurchaseToken};
use crate::services::upstream::JsonHttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait CartService: Send + Sync {
    async fn add_item(&self, user_id: &str, item: &OrderItem) -> Result<(), AppError>;

    /// Check out the user's cart, producing one token per purchased item.
    async fn checkout(&self, user_id: &str) -> Result<Vec<PurchaseToken>, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartRequest<'a> {
    user_id: &'a str,
    item: &'a OrderItem,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct CheckoutResponse {
    #[serde(default)]
    tokens: Vec<PurchaseToken>,
}

/// RPC client for the shopping service.
#[derive(Clone)]
pub struct HttpCartClient {
    client: JsonHttpClient,
}

impl HttpCartClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: JsonHttpClient::new("shopping-service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl CartService for HttpCartClient {
    async fn add_item(&self, user_id: &str, item: &OrderItem) -> Result<(), AppError> {
        self.client
            .post_empty("/rpc/AddToCart", &AddToCartRequest { user_id, item })
            .await
    }

    async fn checkout(&self, user_id: &str) -> Result<Vec<PurchaseToken>, AppError> {
        let response: CheckoutResponse = self
            .client
            .post_json("/rpc/Checkout", &CheckoutRequest { user_id })
            .await?;
        Ok(response.tokens)
    }
}
