// db/statuslogdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::{Actor, JobStatus, StatusLogEntry};

#[async_trait]
pub trait StatusLogExt {
    async fn get_status_logs(&self, job_id: Uuid) -> Result<Vec<StatusLogEntry>, Error>;
}

/// Append one audit row inside the transaction that performed the transition.
/// Rows are never updated or deleted afterwards.
pub async fn append_status_log(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    old_status: JobStatus,
    new_status: JobStatus,
    changed_by: Actor,
    changed_at: DateTime<Utc>,
) -> Result<StatusLogEntry, Error> {
    sqlx::query_as::<_, StatusLogEntry>(
        r#"
        INSERT INTO job_status_logs (job_id, old_status, new_status, changed_by, changed_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, job_id, old_status, new_status, changed_by, changed_at
        "#,
    )
    .bind(job_id)
    .bind(old_status)
    .bind(new_status)
    .bind(changed_by.id())
    .bind(changed_at)
    .fetch_one(&mut **tx)
    .await
}

#[async_trait]
impl StatusLogExt for DBClient {
    async fn get_status_logs(&self, job_id: Uuid) -> Result<Vec<StatusLogEntry>, Error> {
        sqlx::query_as::<_, StatusLogEntry>(
            r#"
            SELECT id, job_id, old_status, new_status, changed_by, changed_at
            FROM job_status_logs
            WHERE job_id = $1
            ORDER BY changed_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }
}
