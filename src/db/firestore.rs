// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed execution store.
//!
//! One document per execution in `tour_executions`, keyed by the execution
//! UUID. Inserts and version-checked replaces are committed through a
//! Firestore transaction so a record is either written whole or not at all.
//! The active-pair and version checks read through that same transaction, so
//! a writer that raced us makes our commit fail instead of being overwritten.

use super::{collections, sort_most_recent_first, ExecutionStore};
use crate::error::AppError;
use crate::models::{ExecutionStatus, TourExecution};
use async_trait::async_trait;
use uuid::Uuid;

/// Firestore execution store.
#[derive(Clone)]
pub struct FirestoreExecutionStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreExecutionStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline store. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Read handle bound to `transaction`.
    ///
    /// Reads through it are part of the transaction's read set, so the commit
    /// fails if another writer touched those documents in the meantime.
    fn in_transaction(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    async fn query_active(
        db: &firestore::FirestoreDb,
        user_id: &str,
        tour_id: Option<Uuid>,
    ) -> Result<Vec<TourExecution>, AppError> {
        let active = ExecutionStatus::Active.as_str();
        let query = db
            .fluent()
            .select()
            .from(collections::TOUR_EXECUTIONS);

        let query = if let Some(tour_id) = tour_id {
            let tour_id = tour_id.to_string();
            query.filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id),
                    q.field("tourId").eq(tour_id.clone()),
                    q.field("status").eq(active),
                ])
            })
        } else {
            query.filter(move |q| {
                q.for_all([q.field("userId").eq(user_id), q.field("status").eq(active)])
            })
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// A commit aborted by contention means another writer got there first.
fn commit_error(e: firestore::errors::FirestoreError) -> AppError {
    match &e {
        firestore::errors::FirestoreError::DatabaseError(db)
            if db.public.code.eq_ignore_ascii_case("aborted") =>
        {
            AppError::Conflict(format!("Concurrent update, transaction aborted: {}", e))
        }
        _ => AppError::Database(format!("Transaction commit failed: {}", e)),
    }
}

#[async_trait]
impl ExecutionStore for FirestoreExecutionStore {
    async fn insert(&self, execution: &TourExecution) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if execution.is_active() {
            let tx_db = Self::in_transaction(client, &transaction);
            let existing =
                Self::query_active(&tx_db, &execution.user_id, Some(execution.tour_id)).await?;
            if let Some(other) = existing.first() {
                let _ = transaction.rollback().await;
                return Err(AppError::Conflict(format!(
                    "Execution {} is already active for this tour",
                    other.id
                )));
            }
        }

        client
            .fluent()
            .update()
            .in_col(collections::TOUR_EXECUTIONS)
            .document_id(execution.id.to_string())
            .object(execution)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add execution to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(commit_error)?;

        tracing::debug!(execution_id = %execution.id, "Execution inserted");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TourExecution>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOUR_EXECUTIONS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<TourExecution>, AppError> {
        let mut active = Self::query_active(self.get_client()?, user_id, None).await?;
        sort_most_recent_first(&mut active);
        Ok(active)
    }

    async fn get_active_by_user_and_tour(
        &self,
        user_id: &str,
        tour_id: Uuid,
    ) -> Result<Option<TourExecution>, AppError> {
        let mut active = Self::query_active(self.get_client()?, user_id, Some(tour_id)).await?;
        sort_most_recent_first(&mut active);
        Ok(active.into_iter().next())
    }

    async fn replace(&self, execution: &TourExecution) -> Result<TourExecution, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<TourExecution> = Self::in_transaction(client, &transaction)
            .fluent()
            .select()
            .by_id_in(collections::TOUR_EXECUTIONS)
            .obj()
            .one(&execution.id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let current = match current {
            Some(current) => current,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("Execution {}", execution.id)));
            }
        };

        if current.version != execution.version {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict(format!(
                "Execution {} changed (expected version {}, found {})",
                execution.id, execution.version, current.version
            )));
        }

        let mut next = execution.clone();
        next.version = current.version + 1;

        client
            .fluent()
            .update()
            .in_col(collections::TOUR_EXECUTIONS)
            .document_id(next.id.to_string())
            .object(&next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add execution to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(commit_error)?;

        tracing::debug!(
            execution_id = %next.id,
            version = next.version,
            status = %next.status,
            "Execution replaced"
        );
        Ok(next)
    }
}
