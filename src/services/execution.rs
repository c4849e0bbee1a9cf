// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tour execution service: start, proximity check, abandon and lookups.
//!
//! Writes to one execution are serialized per execution id inside this
//! process, and every replace is conditional on the version that was read,
//! so two concurrent checks can never silently overwrite each other.

use crate::db::ExecutionStore;
use crate::error::{AppError, Result};
use crate::models::{Coordinates, ProximityCheckResult, TourExecution};
use crate::services::catalog::TourCatalog;
use crate::services::location::LocationTracker;
use crate::services::proximity::ProximityEvaluator;
use crate::services::upstream::with_timeout;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Per-key async locks shared by all clones of the service.
type LockMap<K> = Arc<DashMap<K, Arc<Mutex<()>>>>;

/// Owns the execution state machine.
#[derive(Clone)]
pub struct TourExecutionService {
    store: Arc<dyn ExecutionStore>,
    catalog: Arc<dyn TourCatalog>,
    locations: Arc<dyn LocationTracker>,
    proximity: ProximityEvaluator,
    upstream_timeout: Duration,
    /// Serializes Start for one (user, tour) pair.
    start_locks: LockMap<(String, Uuid)>,
    /// Serializes read-modify-replace on one execution.
    update_locks: LockMap<Uuid>,
}

impl TourExecutionService {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        catalog: Arc<dyn TourCatalog>,
        locations: Arc<dyn LocationTracker>,
        proximity: ProximityEvaluator,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            locations,
            proximity,
            upstream_timeout,
            start_locks: Arc::new(DashMap::new()),
            update_locks: Arc::new(DashMap::new()),
        }
    }

    async fn bounded<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_timeout(what, self.upstream_timeout, call).await
    }

    // ─── Start ──────────────────────────────────────────────────

    /// Start tracking `tour_id` for `user_id`, or return the execution that
    /// is already active for that pair.
    pub async fn start(&self, user_id: &str, tour_id: Uuid) -> Result<TourExecution> {
        if let Some(existing) = self.get_active_for_tour(user_id, tour_id).await? {
            tracing::info!(
                user_id,
                %tour_id,
                execution_id = %existing.id,
                "Execution already active, returning it"
            );
            return Ok(existing);
        }

        let entry = LockEntry::acquire(&self.start_locks, (user_id.to_string(), tour_id));
        let _guard = entry.mutex().lock().await;
        self.start_locked(user_id, tour_id).await
    }

    async fn start_locked(&self, user_id: &str, tour_id: Uuid) -> Result<TourExecution> {
        // Another task may have started it while we waited for the lock.
        if let Some(existing) = self.get_active_for_tour(user_id, tour_id).await? {
            return Ok(existing);
        }

        let tour = self
            .bounded("tour lookup", self.catalog.get_tour(tour_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour {}", tour_id)))?;

        if !tour.status.is_consumable() {
            return Err(AppError::State(format!(
                "Tour {} is {:?}; only published or archived tours can be started",
                tour_id, tour.status
            )));
        }

        let key_points = self
            .bounded("key point lookup", self.catalog.list_key_points(tour_id))
            .await?;
        if key_points.is_empty() {
            return Err(AppError::State(format!("Tour {} has no key points", tour_id)));
        }

        let position = self
            .bounded("location lookup", self.locations.last_known(user_id))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No current location recorded for user {}", user_id))
            })?;

        let execution = TourExecution::start(user_id, tour_id, &key_points, position, Utc::now());

        match self
            .bounded("execution insert", self.store.insert(&execution))
            .await
        {
            Ok(()) => {
                tracing::info!(
                    user_id,
                    %tour_id,
                    execution_id = %execution.id,
                    key_points = execution.total_key_points,
                    "Tour execution started"
                );
                Ok(execution)
            }
            Err(AppError::Conflict(msg)) => {
                // Lost an insert race (e.g. against another instance): hand back the winner.
                match self.get_active_for_tour(user_id, tour_id).await? {
                    Some(winner) => {
                        tracing::info!(
                            user_id,
                            %tour_id,
                            execution_id = %winner.id,
                            "Concurrent start detected, returning existing execution"
                        );
                        Ok(winner)
                    }
                    None => Err(AppError::Conflict(msg)),
                }
            }
            Err(e) => Err(e),
        }
    }

    // ─── Proximity ──────────────────────────────────────────────

    /// Record a new position and advance the tour if the next key point is reached.
    ///
    /// Only the head of the remaining list is considered. Standing on a later
    /// key point never counts while an earlier one is unvisited.
    pub async fn check_proximity(
        &self,
        user_id: &str,
        coords: Coordinates,
        tour_id: Option<Uuid>,
    ) -> Result<ProximityCheckResult> {
        let selected = self.select_active(user_id, tour_id).await?;
        let proximity = self.proximity;

        let (execution, result) = self
            .update_active(selected.id, move |te, now| {
                evaluate_position(&proximity, te, coords, now)
            })
            .await?;

        if result.reached {
            tracing::info!(
                user_id,
                execution_id = %execution.id,
                key_point = ?result.just_completed_point.as_ref().map(|k| k.order),
                remaining = result.remaining_count,
                completed = result.completed_session,
                "Key point reached"
            );
        } else {
            tracing::debug!(
                user_id,
                execution_id = %execution.id,
                distance_meters = result.distance_meters,
                radius_meters = self.proximity.radius_meters(),
                completed = result.completed_session,
                "Key point not reached"
            );
        }

        Ok(result)
    }

    // ─── Abandon ────────────────────────────────────────────────

    /// Abandon the user's active execution (optionally the one for `tour_id`).
    pub async fn abandon(&self, user_id: &str, tour_id: Option<Uuid>) -> Result<TourExecution> {
        let selected = self.select_active(user_id, tour_id).await?;
        self.abandon_execution(selected.id).await
    }

    /// Abandon a specific execution. Fails with a state error if it is no longer active.
    pub async fn abandon_execution(&self, execution_id: Uuid) -> Result<TourExecution> {
        let (execution, ()) = self
            .update_active(execution_id, |te, now| te.abandon(now))
            .await?;

        tracing::info!(
            user_id = %execution.user_id,
            tour_id = %execution.tour_id,
            execution_id = %execution.id,
            "Tour execution abandoned"
        );
        Ok(execution)
    }

    // ─── Lookups ────────────────────────────────────────────────

    /// The user's active execution, most recently active first if there are several.
    pub async fn get_active(&self, user_id: &str) -> Result<Option<TourExecution>> {
        let active = self
            .bounded("active lookup", self.store.list_active_by_user(user_id))
            .await?;
        Ok(active.into_iter().next())
    }

    pub async fn get_active_for_tour(
        &self,
        user_id: &str,
        tour_id: Uuid,
    ) -> Result<Option<TourExecution>> {
        self.bounded(
            "active lookup",
            self.store.get_active_by_user_and_tour(user_id, tour_id),
        )
        .await
    }

    /// Any execution by id, terminal ones included.
    pub async fn get(&self, execution_id: Uuid) -> Result<Option<TourExecution>> {
        self.bounded("execution lookup", self.store.get(execution_id))
            .await
    }

    // ─── Helpers ────────────────────────────────────────────────

    /// Pick the single active execution a user-scoped command applies to.
    async fn select_active(&self, user_id: &str, tour_id: Option<Uuid>) -> Result<TourExecution> {
        if let Some(tour_id) = tour_id {
            return self
                .get_active_for_tour(user_id, tour_id)
                .await?
                .ok_or_else(|| {
                    AppError::State(format!("No active tour execution for tour {}", tour_id))
                });
        }

        let mut active = self
            .bounded("active lookup", self.store.list_active_by_user(user_id))
            .await?;
        match active.len() {
            0 => Err(AppError::State("No active tour execution".to_string())),
            1 => Ok(active.remove(0)),
            n => Err(AppError::State(format!(
                "User has {} active tour executions; specify tourId",
                n
            ))),
        }
    }

    /// Read-modify-replace one active execution under its update lock.
    async fn update_active<T, F>(&self, execution_id: Uuid, apply: F) -> Result<(TourExecution, T)>
    where
        F: FnOnce(&mut TourExecution, DateTime<Utc>) -> Result<T>,
    {
        let entry = LockEntry::acquire(&self.update_locks, execution_id);
        let _guard = entry.mutex().lock().await;

        // Re-read under the lock; the caller's copy may be stale.
        let mut execution = self
            .get(execution_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution {}", execution_id)))?;
        if execution.status.is_terminal() {
            return Err(AppError::State(format!(
                "Execution {} is {}",
                execution_id, execution.status
            )));
        }

        let out = apply(&mut execution, Utc::now())?;
        let stored = self
            .bounded("execution replace", self.store.replace(&execution))
            .await?;
        Ok((stored, out))
    }
}

/// Apply one position fix to an active execution.
fn evaluate_position(
    proximity: &ProximityEvaluator,
    execution: &mut TourExecution,
    coords: Coordinates,
    now: DateTime<Utc>,
) -> Result<ProximityCheckResult> {
    execution.touch(coords, now);

    let Some(next) = execution.next_key_point().cloned() else {
        // Nothing left but still active (stale or racing call): finish it.
        execution.complete(now)?;
        return Ok(ProximityCheckResult {
            reached: false,
            distance_meters: 0.0,
            next_key_point: None,
            remaining_count: 0,
            just_completed_point: None,
            completed_session: true,
        });
    };

    let distance_meters = proximity.distance(coords, next.coordinates);
    let mut result = ProximityCheckResult {
        reached: false,
        distance_meters,
        next_key_point: Some(next),
        remaining_count: execution.remaining_count(),
        just_completed_point: None,
        completed_session: false,
    };

    if proximity.reached(distance_meters) {
        result.reached = true;
        result.just_completed_point = execution.visit_next(now)?;
        result.remaining_count = execution.remaining_count();
        result.completed_session = !execution.is_active();
    }

    Ok(result)
}

/// A per-key lock taken out of a shared map.
///
/// The map entry is removed on drop once no other task holds or waits on the
/// same key, including when the owning future is cancelled mid-await.
struct LockEntry<K: Eq + Hash + Clone> {
    locks: LockMap<K>,
    key: K,
    mutex: Arc<Mutex<()>>,
}

impl<K: Eq + Hash + Clone> LockEntry<K> {
    fn acquire(locks: &LockMap<K>, key: K) -> Self {
        let mutex = locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            locks: locks.clone(),
            key,
            mutex,
        }
    }

    fn mutex(&self) -> &Mutex<()> {
        &self.mutex
    }
}

impl<K: Eq + Hash + Clone> Drop for LockEntry<K> {
    fn drop(&mut self) {
        // Give up our reference before checking whether anyone else has one.
        drop(std::mem::take(&mut self.mutex));
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
