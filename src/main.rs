// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tour-Tracker API Server
//!
//! Tracks users walking tours key point by key point and runs the
//! purchase-and-start workflow against the catalog and shopping services.

use std::sync::Arc;
use tour_tracker::{
    config::{Config, StoreBackend},
    db::{ExecutionStore, FirestoreExecutionStore, MemoryExecutionStore},
    middleware::HttpMetrics,
    services::{
        HttpCartClient, HttpLocationTracker, HttpTourCatalog, ProximityEvaluator,
        PurchaseOrchestrator, TourExecutionService,
    },
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        radius_meters = config.proximity_radius_meters,
        timeout_secs = config.upstream_timeout.as_secs(),
        "Starting Tour-Tracker API"
    );

    // Execution store
    let store: Arc<dyn ExecutionStore> = match config.store_backend {
        StoreBackend::Firestore => {
            Arc::new(FirestoreExecutionStore::new(&config.gcp_project_id).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory execution store; records are lost on restart");
            Arc::new(MemoryExecutionStore::new())
        }
    };

    // Collaborator clients
    let catalog = Arc::new(HttpTourCatalog::new(
        &config.tour_service_url,
        config.upstream_timeout,
    )?);
    let locations = Arc::new(HttpLocationTracker::new(
        &config.location_service_url,
        config.upstream_timeout,
    )?);
    let cart = Arc::new(HttpCartClient::new(
        &config.shopping_service_url,
        config.upstream_timeout,
    )?);
    tracing::info!(
        tour_service = %config.tour_service_url,
        location_service = %config.location_service_url,
        shopping_service = %config.shopping_service_url,
        "Collaborator clients initialized"
    );

    let executions = TourExecutionService::new(
        store,
        catalog.clone(),
        locations,
        ProximityEvaluator::new(config.proximity_radius_meters),
        config.upstream_timeout,
    );
    let orchestrator = PurchaseOrchestrator::new(
        catalog,
        cart,
        executions.clone(),
        config.upstream_timeout,
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        executions,
        orchestrator,
        metrics: HttpMetrics::new()?,
    });

    // Build router
    let app = tour_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tour_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
