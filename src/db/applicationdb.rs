// db/applicationdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

#[async_trait]
pub trait ApplicationExt {
    /// Inserts an `Applied` row unless the job is gone, completed, owned by the
    /// worker, or the `(job_id, worker_id)` pair already exists. Returns `None`
    /// when nothing was inserted.
    ///
    /// The job row is share-locked, so an uncommitted completion is waited for
    /// and its status re-checked before inserting.
    async fn insert_application_if_absent(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, Error>;

    async fn get_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Application>, Error>;

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<Application>, Error>;

    async fn get_worker_applications(&self, worker_id: Uuid) -> Result<Vec<Application>, Error>;

    /// Moves a pending application to `Rejected`. `None` if it is not pending.
    async fn reject_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, Error>;
}

#[async_trait]
impl ApplicationExt for DBClient {
    async fn insert_application_if_absent(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO job_applications (job_id, worker_id, status, applied_at)
            SELECT j.id, $2, 'applied'::application_status, $3
            FROM jobs j
            WHERE j.id = $1
              AND j.status <> 'completed'::job_status
              AND j.employer_id <> $2
            FOR SHARE OF j
            ON CONFLICT ON CONSTRAINT job_applications_job_worker_key DO NOTHING
            RETURNING id, job_id, worker_id, status, applied_at, accepted_at, rejected_at
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT id, job_id, worker_id, status, applied_at, accepted_at, rejected_at
            FROM job_applications
            WHERE job_id = $1 AND worker_id = $2
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT id, job_id, worker_id, status, applied_at, accepted_at, rejected_at
            FROM job_applications
            WHERE job_id = $1
            ORDER BY applied_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_worker_applications(&self, worker_id: Uuid) -> Result<Vec<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT id, job_id, worker_id, status, applied_at, accepted_at, rejected_at
            FROM job_applications
            WHERE worker_id = $1
            ORDER BY applied_at DESC
            "#,
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn reject_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            UPDATE job_applications
            SET status = 'rejected'::application_status, rejected_at = $3
            WHERE job_id = $1 AND worker_id = $2
              AND status = 'applied'::application_status
            RETURNING id, job_id, worker_id, status, applied_at, accepted_at, rejected_at
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }
}
