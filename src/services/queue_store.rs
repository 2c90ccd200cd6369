use crate::entities::pending_uploads::{self, STATUS_PARKED, STATUS_PENDING};
use crate::entities::prelude::*;
use crate::error::LocalStoreError;
use crate::models::{NewUpload, PendingUpload};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Result of removing a queued upload by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Durable, insertion-ordered store of uploads waiting for the remote.
///
/// Every mutation is a single statement, so each one is atomic on its own.
/// Ids come from an AUTOINCREMENT key and are never handed out twice.
#[derive(Clone)]
pub struct QueueStore {
    db: DatabaseConnection,
}

impl QueueStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persists a new upload and returns it with its assigned id.
    pub async fn append(&self, upload: NewUpload) -> Result<PendingUpload, LocalStoreError> {
        let now = Utc::now().timestamp_millis();
        let row = pending_uploads::ActiveModel {
            upload_key: Set(upload.upload_key),
            file_name: Set(upload.file.name.clone()),
            content_type: Set(upload.file.content_type.clone()),
            checksum: Set(upload.file.checksum()),
            size: Set(upload.file.size() as i64),
            file_bytes: Set(upload.file.bytes.to_vec()),
            owner_id: Set(upload.owner_id),
            account_id: Set(upload.account_id),
            path: Set(upload.path),
            created_at: Set(now),
            attempts: Set(0),
            last_error: Set(None),
            next_attempt_at: Set(now),
            status: Set(STATUS_PENDING.to_string()),
            ..Default::default()
        };

        let saved = row.insert(&self.db).await?;
        tracing::debug!("Queued upload {} ({})", saved.id, saved.file_name);
        Ok(saved.into())
    }

    /// Every queued upload, pending and parked, in insertion order.
    pub async fn list_all(&self) -> Result<Vec<PendingUpload>, LocalStoreError> {
        let rows = PendingUploads::find()
            .order_by_asc(pending_uploads::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(PendingUpload::from).collect())
    }

    pub async fn list_parked(&self) -> Result<Vec<PendingUpload>, LocalStoreError> {
        let rows = PendingUploads::find()
            .filter(pending_uploads::Column::Status.eq(STATUS_PARKED))
            .order_by_asc(pending_uploads::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(PendingUpload::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<PendingUpload>, LocalStoreError> {
        Ok(PendingUploads::find_by_id(id)
            .one(&self.db)
            .await?
            .map(PendingUpload::from))
    }

    pub async fn count(&self) -> Result<u64, LocalStoreError> {
        Ok(PendingUploads::find().count(&self.db).await?)
    }

    /// Deletes one record. A second call for the same id reports `NotFound`.
    pub async fn remove_by_id(&self, id: i64) -> Result<RemoveOutcome, LocalStoreError> {
        let res = PendingUploads::delete_by_id(id).exec(&self.db).await?;
        Ok(if res.rows_affected > 0 {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        })
    }

    /// Counts a failed attempt and defers the record until `next_attempt_at`.
    pub async fn record_failure(
        &self,
        id: i64,
        error: &str,
        next_attempt_at: i64,
    ) -> Result<bool, LocalStoreError> {
        let res = PendingUploads::update_many()
            .col_expr(
                pending_uploads::Column::Attempts,
                Expr::col(pending_uploads::Column::Attempts).add(1),
            )
            .col_expr(pending_uploads::Column::LastError, Expr::value(error))
            .col_expr(
                pending_uploads::Column::NextAttemptAt,
                Expr::value(next_attempt_at),
            )
            .filter(pending_uploads::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Takes the record out of future drains until it is requeued.
    pub async fn park(&self, id: i64, error: &str) -> Result<bool, LocalStoreError> {
        let res = PendingUploads::update_many()
            .col_expr(
                pending_uploads::Column::Attempts,
                Expr::col(pending_uploads::Column::Attempts).add(1),
            )
            .col_expr(pending_uploads::Column::LastError, Expr::value(error))
            .col_expr(pending_uploads::Column::Status, Expr::value(STATUS_PARKED))
            .filter(pending_uploads::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Makes a record eligible for the next drain with a fresh attempt budget.
    pub async fn requeue(&self, id: i64) -> Result<bool, LocalStoreError> {
        let res = PendingUploads::update_many()
            .col_expr(pending_uploads::Column::Attempts, Expr::value(0))
            .col_expr(
                pending_uploads::Column::LastError,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                pending_uploads::Column::NextAttemptAt,
                Expr::value(Utc::now().timestamp_millis()),
            )
            .col_expr(pending_uploads::Column::Status, Expr::value(STATUS_PENDING))
            .filter(pending_uploads::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Drops a record on explicit user request, without uploading it.
    pub async fn discard(&self, id: i64) -> Result<RemoveOutcome, LocalStoreError> {
        let outcome = self.remove_by_id(id).await?;
        if outcome == RemoveOutcome::Removed {
            tracing::info!("🗑️  Discarded queued upload {}", id);
        }
        Ok(outcome)
    }
}
