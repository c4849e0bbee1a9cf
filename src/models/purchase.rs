// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shopping cart payloads exchanged with the shopping service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line item added to a user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub tour_id: Uuid,
    pub name: String,
    pub price: f64,
}

/// Proof of purchase issued by checkout, one per cart item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseToken {
    pub id: String,
    pub user_id: String,
    pub tour_id: Uuid,
    pub tour_name: String,
    pub price: f64,
    pub purchased_at: DateTime<Utc>,
}
