// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Purchase-and-start workflow.
//!
//! Four ordered steps: fetch the tour, start its execution, add it to the
//! cart, check out. A failure in the cart or checkout step abandons the
//! execution started in step 2; earlier failures have nothing to undo.

use crate::error::AppError;
use crate::models::{OrderItem, PurchaseToken, TourExecution};
use crate::services::cart::CartService;
use crate::services::catalog::TourCatalog;
use crate::services::execution::TourExecutionService;
use crate::services::upstream::with_timeout;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_ITEM_NAME: &str = "Tour";

/// Workflow step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SagaStep {
    FetchTour,
    StartExecution,
    AddToCart,
    Checkout,
}

impl SagaStep {
    /// Whether a failure at this step leaves a started execution to undo.
    pub fn needs_compensation(self) -> bool {
        matches!(self, SagaStep::AddToCart | SagaStep::Checkout)
    }
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SagaStep::FetchTour => "FetchTour",
            SagaStep::StartExecution => "StartExecution",
            SagaStep::AddToCart => "AddToCart",
            SagaStep::Checkout => "Checkout",
        };
        f.write_str(name)
    }
}

/// Successful purchase: the running execution plus the issued tokens.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub execution: TourExecution,
    pub tokens: Vec<PurchaseToken>,
}

/// The step that failed, whether compensation ran cleanly, and the cause.
#[derive(Debug, thiserror::Error)]
#[error("purchase failed at {step}: {source}")]
pub struct SagaFailure {
    pub step: SagaStep,
    pub compensated: bool,
    #[source]
    pub source: AppError,
}

impl SagaFailure {
    fn at(step: SagaStep, source: AppError) -> Self {
        Self {
            step,
            compensated: false,
            source,
        }
    }
}

#[derive(Clone)]
pub struct PurchaseOrchestrator {
    catalog: Arc<dyn TourCatalog>,
    cart: Arc<dyn CartService>,
    executions: TourExecutionService,
    upstream_timeout: Duration,
}

impl PurchaseOrchestrator {
    pub fn new(
        catalog: Arc<dyn TourCatalog>,
        cart: Arc<dyn CartService>,
        executions: TourExecutionService,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            cart,
            executions,
            upstream_timeout,
        }
    }

    /// Buy `tour_id` for `user_id` and leave its execution running.
    pub async fn purchase_and_start(
        &self,
        user_id: &str,
        tour_id: Uuid,
    ) -> Result<PurchaseOutcome, SagaFailure> {
        tracing::info!(user_id, %tour_id, "Purchase workflow started");

        // 1. Tour metadata
        let tour = with_timeout(
            "tour lookup",
            self.upstream_timeout,
            self.catalog.get_tour(tour_id),
        )
        .await
        .and_then(|t| t.ok_or_else(|| AppError::NotFound(format!("Tour {}", tour_id))))
        .map_err(|e| self.abort(user_id, tour_id, SagaStep::FetchTour, e))?;

        // 2. Execution (idempotent)
        let execution = self
            .executions
            .start(user_id, tour_id)
            .await
            .map_err(|e| self.abort(user_id, tour_id, SagaStep::StartExecution, e))?;

        // 3. Cart line item
        let name = if tour.title.trim().is_empty() {
            DEFAULT_ITEM_NAME.to_string()
        } else {
            tour.title.clone()
        };
        let item = OrderItem {
            tour_id,
            name,
            price: tour.price,
        };
        if let Err(e) = with_timeout(
            "add to cart",
            self.upstream_timeout,
            self.cart.add_item(user_id, &item),
        )
        .await
        {
            return Err(self.compensate(&execution, SagaStep::AddToCart, e).await);
        }

        // 4. Checkout
        let tokens = match with_timeout(
            "checkout",
            self.upstream_timeout,
            self.cart.checkout(user_id),
        )
        .await
        {
            Ok(tokens) => tokens,
            Err(e) => return Err(self.compensate(&execution, SagaStep::Checkout, e).await),
        };

        tracing::info!(
            user_id,
            %tour_id,
            execution_id = %execution.id,
            tokens = tokens.len(),
            "Purchase workflow completed"
        );

        Ok(PurchaseOutcome { execution, tokens })
    }

    fn abort(&self, user_id: &str, tour_id: Uuid, step: SagaStep, e: AppError) -> SagaFailure {
        tracing::warn!(user_id, %tour_id, step = %step, error = %e, "Purchase workflow aborted");
        SagaFailure::at(step, e)
    }

    /// Abandon the step-2 execution. The original error is always what gets reported.
    async fn compensate(
        &self,
        execution: &TourExecution,
        step: SagaStep,
        cause: AppError,
    ) -> SagaFailure {
        debug_assert!(step.needs_compensation());
        tracing::warn!(
            user_id = %execution.user_id,
            execution_id = %execution.id,
            step = %step,
            error = %cause,
            "Purchase workflow failed, abandoning execution"
        );

        let compensated = match self.executions.abandon_execution(execution.id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution.id,
                    error = %e,
                    "Compensation failed; execution left as is"
                );
                false
            }
        };

        SagaFailure {
            step,
            compensated,
            source: cause,
        }
    }
}
