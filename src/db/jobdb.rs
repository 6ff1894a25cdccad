// db/jobdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::{db::DBClient, statuslogdb::append_status_log};
use crate::models::jobmodel::*;

const JOB_COLUMNS: &str = "id, employer_id, title, price, address, required_skill, status, \
    accepted_worker_id, handover_deadline, created_at, updated_at";

const APPLICATION_COLUMNS: &str =
    "id, job_id, worker_id, status, applied_at, accepted_at, rejected_at";

/// Job rows and the transitions of the job lifecycle.
///
/// Every transition is a conditional write whose WHERE clause carries the
/// precondition. `Ok(None)` means the row no longer matched (another writer got
/// there first) and nothing was changed.
#[async_trait]
pub trait JobExt {
    async fn create_job(
        &self,
        employer_id: Uuid,
        job: NewJob,
        now: DateTime<Utc>,
    ) -> Result<Job, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn get_employer_jobs(&self, employer_id: Uuid) -> Result<Vec<Job>, Error>;

    /// Edits descriptive fields while the job is `Open` or `InHandover`.
    async fn update_job_details(
        &self,
        job_id: Uuid,
        edit: JobEdit,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, Error>;

    /// Deletes the job only while it is `Open` with no accepted worker.
    async fn delete_open_job(&self, job_id: Uuid) -> Result<bool, Error>;

    async fn get_overdue_handover_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>, Error>;

    async fn accept_worker_tx(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor: Actor,
        handover_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<AcceptedJob>, Error>;

    async fn complete_job_tx(
        &self,
        job_id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, Error>;

    async fn reset_handover_tx(
        &self,
        job_id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error>;

    async fn expire_handover_tx(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error>;
}

impl DBClient {
    /// Moves an `InHandover` job back to `Open`. With `overdue_at` set, the
    /// deadline must also have passed at that instant.
    async fn release_handover(
        &self,
        job_id: Uuid,
        actor: Actor,
        overdue_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so the released worker id we report is the one we clear.
        let released_worker_id = sqlx::query_scalar::<_, Option<Uuid>>(
            r#"
            SELECT accepted_worker_id FROM jobs
            WHERE id = $1
              AND status = 'in_handover'::job_status
              AND ($2::timestamptz IS NULL OR handover_deadline < $2)
            FOR UPDATE
            "#,
        )
        .bind(job_id)
        .bind(overdue_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(released_worker_id) = released_worker_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'open'::job_status,
                accepted_worker_id = NULL,
                handover_deadline = NULL,
                updated_at = $2
            WHERE id = $1 AND status = 'in_handover'::job_status
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = job else {
            tx.rollback().await?;
            return Ok(None);
        };

        append_status_log(
            &mut tx,
            job_id,
            JobStatus::InHandover,
            JobStatus::Open,
            actor,
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(Some(ReleasedJob {
            job,
            released_worker_id,
        }))
    }
}

#[async_trait]
impl JobExt for DBClient {
    async fn create_job(
        &self,
        employer_id: Uuid,
        job: NewJob,
        now: DateTime<Utc>,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (employer_id, title, price, address, required_skill, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'open'::job_status, $6, $6)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(employer_id)
        .bind(job.title)
        .bind(job.price)
        .bind(job.address)
        .bind(job.required_skill)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_employer_jobs(&self, employer_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE employer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_job_details(
        &self,
        job_id: Uuid,
        edit: JobEdit,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                price = COALESCE($3, price),
                address = COALESCE($4, address),
                required_skill = COALESCE($5, required_skill),
                updated_at = $6
            WHERE id = $1
              AND status IN ('open'::job_status, 'in_handover'::job_status)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(edit.title)
        .bind(edit.price)
        .bind(edit.address)
        .bind(edit.required_skill)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_open_job(&self, job_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id = $1
              AND status = 'open'::job_status
              AND accepted_worker_id IS NULL
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_overdue_handover_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE status = 'in_handover'::job_status
              AND handover_deadline < $1
            ORDER BY handover_deadline ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    async fn accept_worker_tx(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor: Actor,
        handover_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<AcceptedJob>, Error> {
        let mut tx = self.pool.begin().await?;

        // The job only moves if it is still open, nobody holds the slot, and
        // the worker's application is still pending.
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'in_handover'::job_status,
                accepted_worker_id = $2,
                handover_deadline = $3,
                updated_at = $4
            WHERE id = $1
              AND status = 'open'::job_status
              AND accepted_worker_id IS NULL
              AND EXISTS (
                  SELECT 1 FROM job_applications
                  WHERE job_id = $1 AND worker_id = $2
                    AND status = 'applied'::application_status
              )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(worker_id)
        .bind(handover_deadline)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = job else {
            tx.rollback().await?;
            return Ok(None);
        };

        let application = sqlx::query_as::<_, Application>(&format!(
            r#"
            UPDATE job_applications
            SET status = 'accepted'::application_status, accepted_at = $3
            WHERE job_id = $1 AND worker_id = $2
              AND status = 'applied'::application_status
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        // A concurrent reject committed between the two statements.
        let Some(application) = application else {
            tx.rollback().await?;
            return Ok(None);
        };

        append_status_log(
            &mut tx,
            job_id,
            JobStatus::Open,
            JobStatus::InHandover,
            actor,
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(Some(AcceptedJob { job, application }))
    }

    async fn complete_job_tx(
        &self,
        job_id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, Error> {
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'completed'::job_status, updated_at = $2
            WHERE id = $1
              AND status = 'in_handover'::job_status
              AND accepted_worker_id IS NOT NULL
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = job else {
            tx.rollback().await?;
            return Ok(None);
        };

        append_status_log(
            &mut tx,
            job_id,
            JobStatus::InHandover,
            JobStatus::Completed,
            actor,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(job))
    }

    async fn reset_handover_tx(
        &self,
        job_id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error> {
        self.release_handover(job_id, actor, None, now).await
    }

    async fn expire_handover_tx(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error> {
        self.release_handover(job_id, Actor::System, Some(now), now).await
    }
}
