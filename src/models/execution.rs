// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tour execution record and its state machine.
//!
//! An execution is one user's attempt at walking one tour. Waypoints are
//! snapshotted at start time so later catalog edits never change an attempt
//! that is already underway.

use super::{Coordinates, KeyPoint};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an execution. Both non-active states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Active,
    Completed,
    Abandoned,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Active => "Active",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::Abandoned => "Abandoned",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Active)
    }

    /// Validate a transition out of `self`.
    ///
    /// Only Active → Completed and Active → Abandoned are allowed.
    pub fn transition(self, to: ExecutionStatus) -> Result<ExecutionStatus, AppError> {
        match (self, to) {
            (ExecutionStatus::Active, ExecutionStatus::Completed)
            | (ExecutionStatus::Active, ExecutionStatus::Abandoned) => Ok(to),
            _ => Err(AppError::State(format!(
                "Cannot move execution from {} to {}",
                self.as_str(),
                to.as_str()
            ))),
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a waypoint taken when the execution started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPointRef {
    pub id: Uuid,
    pub title: String,
    pub coordinates: Coordinates,
    /// 1-based position in the catalog at start time
    pub order: u32,
}

/// A snapshot waypoint together with the time it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedKeyPoint {
    #[serde(flatten)]
    pub key_point: KeyPointRef,
    pub visited_at: DateTime<Utc>,
}

/// Stored execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourExecution {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: String,
    pub status: ExecutionStatus,
    pub current_position: Coordinates,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub key_points_remaining: Vec<KeyPointRef>,
    pub key_points_visited: Vec<VisitedKeyPoint>,
    pub total_key_points: u32,
    /// Incremented by the store on every successful replace
    #[serde(default)]
    pub version: u64,
}

impl TourExecution {
    /// Create a new active execution from the catalog's waypoints, in catalog order.
    pub fn start(
        user_id: &str,
        tour_id: Uuid,
        key_points: &[KeyPoint],
        position: Coordinates,
        now: DateTime<Utc>,
    ) -> Self {
        let remaining: Vec<KeyPointRef> = key_points
            .iter()
            .zip(1u32..)
            .map(|(kp, order)| KeyPointRef {
                id: kp.id,
                title: kp.title.clone(),
                coordinates: kp.coordinates,
                order,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            tour_id,
            user_id: user_id.to_string(),
            status: ExecutionStatus::Active,
            current_position: position,
            started_at: now,
            last_activity_at: now,
            ended_at: None,
            total_key_points: remaining.len() as u32,
            key_points_remaining: remaining,
            key_points_visited: Vec::new(),
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ExecutionStatus::Active
    }

    /// The next waypoint the user must reach.
    pub fn next_key_point(&self) -> Option<&KeyPointRef> {
        self.key_points_remaining.first()
    }

    pub fn remaining_count(&self) -> u32 {
        self.key_points_remaining.len() as u32
    }

    /// Record the user's latest position.
    pub fn touch(&mut self, position: Coordinates, now: DateTime<Utc>) {
        self.current_position = position;
        self.last_activity_at = now;
    }

    /// Move the head waypoint to the visited list.
    ///
    /// Completes the execution when it was the last one. Returns the visited
    /// waypoint, or `None` if nothing was remaining.
    pub fn visit_next(&mut self, now: DateTime<Utc>) -> Result<Option<KeyPointRef>, AppError> {
        if !self.is_active() {
            return Err(AppError::State(format!(
                "Execution {} is {}",
                self.id, self.status
            )));
        }
        if self.key_points_remaining.is_empty() {
            return Ok(None);
        }

        let head = self.key_points_remaining.remove(0);
        self.key_points_visited.push(VisitedKeyPoint {
            key_point: head.clone(),
            visited_at: now,
        });
        self.last_activity_at = now;

        if self.key_points_remaining.is_empty() {
            self.complete(now)?;
        }
        Ok(Some(head))
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.finish(ExecutionStatus::Completed, now)
    }

    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.finish(ExecutionStatus::Abandoned, now)
    }

    fn finish(&mut self, to: ExecutionStatus, now: DateTime<Utc>) -> Result<(), AppError> {
        self.status = self.status.transition(to)?;
        self.ended_at = Some(now);
        self.last_activity_at = now;
        Ok(())
    }
}

/// Outcome of a single proximity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityCheckResult {
    pub reached: bool,
    pub distance_meters: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key_point: Option<KeyPointRef>,
    pub remaining_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub just_completed_point: Option<KeyPointRef>,
    pub completed_session: bool,
}
