// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process execution store backed by `DashMap`.
//!
//! Used for local development and tests. The active index enforces the
//! one-active-execution-per-(user, tour) rule at insert time.

use super::{sort_most_recent_first, ExecutionStore};
use crate::error::AppError;
use crate::models::TourExecution;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

type ActiveKey = (String, Uuid);

/// Execution store that keeps every record in memory.
#[derive(Clone, Default)]
pub struct MemoryExecutionStore {
    records: Arc<DashMap<Uuid, TourExecution>>,
    /// (user, tour) -> id of the active execution
    active: Arc<DashMap<ActiveKey, Uuid>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, terminal ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record for a user, oldest first.
    pub fn history_for_user(&self, user_id: &str) -> Vec<TourExecution> {
        let mut all: Vec<TourExecution> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        all
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn insert(&self, execution: &TourExecution) -> Result<(), AppError> {
        if self.records.contains_key(&execution.id) {
            return Err(AppError::Conflict(format!(
                "Execution {} already exists",
                execution.id
            )));
        }

        if !execution.is_active() {
            self.records.insert(execution.id, execution.clone());
            return Ok(());
        }

        let key = (execution.user_id.clone(), execution.tour_id);
        match self.active.entry(key) {
            Entry::Occupied(existing) => Err(AppError::Conflict(format!(
                "Execution {} is already active for this tour",
                existing.get()
            ))),
            Entry::Vacant(slot) => {
                // Record goes in while the index shard is held so readers never
                // see an index entry without its record.
                self.records.insert(execution.id, execution.clone());
                slot.insert(execution.id);
                Ok(())
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<TourExecution>, AppError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<TourExecution>, AppError> {
        let mut active: Vec<TourExecution> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active())
            .map(|r| r.value().clone())
            .collect();
        sort_most_recent_first(&mut active);
        Ok(active)
    }

    async fn get_active_by_user_and_tour(
        &self,
        user_id: &str,
        tour_id: Uuid,
    ) -> Result<Option<TourExecution>, AppError> {
        let key = (user_id.to_string(), tour_id);
        let Some(id) = self.active.get(&key).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self
            .records
            .get(&id)
            .filter(|r| r.is_active())
            .map(|r| r.value().clone()))
    }

    async fn replace(&self, execution: &TourExecution) -> Result<TourExecution, AppError> {
        let stored = {
            let mut current = self
                .records
                .get_mut(&execution.id)
                .ok_or_else(|| AppError::NotFound(format!("Execution {}", execution.id)))?;

            if current.version != execution.version {
                return Err(AppError::Conflict(format!(
                    "Execution {} changed (expected version {}, found {})",
                    execution.id, execution.version, current.version
                )));
            }

            let mut next = execution.clone();
            next.version = current.version + 1;
            *current = next.clone();
            next
        };

        // Record guard is dropped before touching the index.
        if !stored.is_active() {
            let key = (stored.user_id.clone(), stored.tour_id);
            self.active.remove_if(&key, |_, id| *id == stored.id);
        }

        Ok(stored)
    }
}
