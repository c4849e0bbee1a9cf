// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use dashmap::DashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tour_tracker::config::Config;
use tour_tracker::db::{ExecutionStore, FirestoreExecutionStore, MemoryExecutionStore};
use tour_tracker::error::AppError;
use tour_tracker::middleware::{correlation, HttpMetrics};
use tour_tracker::models::{
    Coordinates, KeyPoint, OrderItem, PurchaseToken, Tour, TourExecution, TourStatus,
};
use tour_tracker::routes::create_router;
use tour_tracker::services::{
    CartService, LocationTracker, ProximityEvaluator, PurchaseOrchestrator, TourCatalog,
    TourExecutionService,
};
use tour_tracker::AppState;
use uuid::Uuid;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore store against the emulator.
#[allow(dead_code)]
pub async fn test_store() -> FirestoreExecutionStore {
    FirestoreExecutionStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique user id per test so parallel tests never share executions.
#[allow(dead_code)]
pub fn unique_user() -> String {
    format!("user-{}", Uuid::new_v4())
}

// ─── Test store ──────────────────────────────────────────────

/// In-memory store whose writes can be made to fail.
#[allow(dead_code)]
#[derive(Default)]
pub struct TestStore {
    inner: MemoryExecutionStore,
    fail_replace: AtomicBool,
}

#[allow(dead_code)]
impl TestStore {
    pub fn fail_replace(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::SeqCst);
    }
}

impl Deref for TestStore {
    type Target = MemoryExecutionStore;

    fn deref(&self) -> &MemoryExecutionStore {
        &self.inner
    }
}

#[async_trait]
impl ExecutionStore for TestStore {
    async fn insert(&self, execution: &TourExecution) -> Result<(), AppError> {
        self.inner.insert(execution).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<TourExecution>, AppError> {
        self.inner.get(id).await
    }

    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<TourExecution>, AppError> {
        self.inner.list_active_by_user(user_id).await
    }

    async fn get_active_by_user_and_tour(
        &self,
        user_id: &str,
        tour_id: Uuid,
    ) -> Result<Option<TourExecution>, AppError> {
        self.inner.get_active_by_user_and_tour(user_id, tour_id).await
    }

    async fn replace(&self, execution: &TourExecution) -> Result<TourExecution, AppError> {
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(AppError::Database("store unavailable".to_string()));
        }
        self.inner.replace(execution).await
    }
}

// ─── Fake collaborators ──────────────────────────────────────

#[derive(Default)]
pub struct FakeCatalog {
    tours: DashMap<Uuid, Tour>,
    key_points: DashMap<Uuid, Vec<KeyPoint>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl FakeCatalog {
    /// Add a tour with key points at the given (lat, lon) positions, in order.
    pub fn add_tour(&self, title: &str, status: TourStatus, points: &[(f64, f64)]) -> Uuid {
        let tour_id = Uuid::new_v4();
        self.tours.insert(
            tour_id,
            Tour {
                id: tour_id,
                title: title.to_string(),
                price: 25.0,
                status,
            },
        );
        let kps = points
            .iter()
            .enumerate()
            .map(|(i, (lat, lon))| KeyPoint {
                id: Uuid::new_v4(),
                tour_id,
                title: format!("KP{}", i + 1),
                coordinates: Coordinates::new(*lat, *lon),
                description: None,
                image: None,
            })
            .collect();
        self.key_points.insert(tour_id, kps);
        tour_id
    }

    /// Reverse the catalog order of a tour's key points.
    pub fn reverse_key_points(&self, tour_id: Uuid) {
        if let Some(mut kps) = self.key_points.get_mut(&tour_id) {
            kps.reverse();
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TourCatalog for FakeCatalog {
    async fn get_tour(&self, tour_id: Uuid) -> Result<Option<Tour>, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("tour-service unavailable".to_string()));
        }
        Ok(self.tours.get(&tour_id).map(|t| t.clone()))
    }

    async fn list_key_points(&self, tour_id: Uuid) -> Result<Vec<KeyPoint>, AppError> {
        Ok(self
            .key_points
            .get(&tour_id)
            .map(|k| k.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeLocations {
    positions: DashMap<String, Coordinates>,
    request_ids: Mutex<Vec<Option<String>>>,
}

#[allow(dead_code)]
impl FakeLocations {
    pub fn set(&self, user_id: &str, lat: f64, lon: f64) {
        self.positions
            .insert(user_id.to_string(), Coordinates::new(lat, lon));
    }

    /// Request id in scope for each lookup, in call order.
    pub fn request_ids(&self) -> Vec<Option<String>> {
        self.request_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocationTracker for FakeLocations {
    async fn last_known(&self, user_id: &str) -> Result<Option<Coordinates>, AppError> {
        self.request_ids
            .lock()
            .unwrap()
            .push(correlation::current().map(|ids| ids.request_id));
        Ok(self.positions.get(user_id).map(|c| *c))
    }
}

#[derive(Default)]
pub struct FakeCart {
    items: Mutex<Vec<(String, OrderItem)>>,
    fail_add: AtomicBool,
    fail_checkout: AtomicBool,
    add_delay_ms: AtomicU64,
}

#[allow(dead_code)]
impl FakeCart {
    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    /// Make AddToCart hang for `delay` before answering.
    pub fn slow_add(&self, delay: Duration) {
        self.add_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn items_for(&self, user_id: &str) -> Vec<OrderItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, item)| item.clone())
            .collect()
    }
}

#[async_trait]
impl CartService for FakeCart {
    async fn add_item(&self, user_id: &str, item: &OrderItem) -> Result<(), AppError> {
        let delay = self.add_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("shopping-service returned HTTP 500".to_string()));
        }
        self.items
            .lock()
            .unwrap()
            .push((user_id.to_string(), item.clone()));
        Ok(())
    }

    async fn checkout(&self, user_id: &str) -> Result<Vec<PurchaseToken>, AppError> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("shopping-service returned HTTP 500".to_string()));
        }
        let mut items = self.items.lock().unwrap();
        let (mine, rest): (Vec<_>, Vec<_>) = items.drain(..).partition(|(u, _)| u == user_id);
        *items = rest;
        Ok(mine
            .into_iter()
            .map(|(user_id, item)| PurchaseToken {
                id: Uuid::new_v4().to_string(),
                user_id,
                tour_id: item.tour_id,
                tour_name: item.name,
                price: item.price,
                purchased_at: chrono::Utc::now(),
            })
            .collect())
    }
}

// ─── Test app ────────────────────────────────────────────────

/// Router, state and handles on every fake.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<TestStore>,
    pub catalog: Arc<FakeCatalog>,
    pub locations: Arc<FakeLocations>,
    pub cart: Arc<FakeCart>,
}

/// Create a test app with in-memory store and fake collaborators.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let store = Arc::new(TestStore::default());
    let catalog = Arc::new(FakeCatalog::default());
    let locations = Arc::new(FakeLocations::default());
    let cart = Arc::new(FakeCart::default());

    let executions = service_with_store(&config, store.clone(), catalog.clone(), locations.clone());
    let orchestrator = PurchaseOrchestrator::new(
        catalog.clone(),
        cart.clone(),
        executions.clone(),
        config.upstream_timeout,
    );

    let state = Arc::new(AppState {
        config,
        executions,
        orchestrator,
        metrics: HttpMetrics::new().unwrap(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        catalog,
        locations,
        cart,
    }
}

/// Execution service over an arbitrary store.
#[allow(dead_code)]
pub fn service_with_store(
    config: &Config,
    store: Arc<dyn ExecutionStore>,
    catalog: Arc<FakeCatalog>,
    locations: Arc<FakeLocations>,
) -> TourExecutionService {
    TourExecutionService::new(
        store,
        catalog,
        locations,
        ProximityEvaluator::new(config.proximity_radius_meters),
        config.upstream_timeout,
    )
}

/// Build a JSON POST request.
#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
