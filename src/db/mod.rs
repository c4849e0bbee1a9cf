//! Execution store: trait and backends (in-memory, Firestore).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreExecutionStore;
pub use memory::MemoryExecutionStore;

use crate::error::AppError;
use crate::models::TourExecution;
use async_trait::async_trait;
use uuid::Uuid;

/// Collection names as constants.
pub mod collections {
    pub const TOUR_EXECUTIONS: &str = "tour_executions";
}

/// Persistence for execution records.
///
/// Records are never deleted. Implementations must guarantee that `insert`
/// is all-or-nothing and that `replace` is conditional on the version the
/// caller read.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with `AppError::Conflict` when an active execution already exists
    /// for the same (user, tour) pair.
    async fn insert(&self, execution: &TourExecution) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<TourExecution>, AppError>;

    /// All active executions for a user, most recently active first.
    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<TourExecution>, AppError>;

    async fn get_active_by_user_and_tour(
        &self,
        user_id: &str,
        tour_id: Uuid,
    ) -> Result<Option<TourExecution>, AppError>;

    /// Replace the whole record if the stored version still equals
    /// `execution.version`. Returns the stored record with its bumped version.
    ///
    /// Fails with `AppError::Conflict` on a version mismatch and
    /// `AppError::NotFound` when the record does not exist.
    async fn replace(&self, execution: &TourExecution) -> Result<TourExecution, AppError>;
}

/// Sort executions so the most recently active comes first.
pub(crate) fn sort_most_recent_first(executions: &mut [TourExecution]) {
    executions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
}
