// service/job_state_machine.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::db::JobStore,
    models::jobmodel::*,
    service::error::ServiceError,
};

/// Owns job status and the accepted-worker slot.
///
/// ```text
/// Open --accept--> InHandover --complete--> Completed
///                  InHandover --reset/expire--> Open
/// ```
///
/// Each transition is handed to the store as one conditional write plus its
/// status log row. The reads done here only decide which error to report; they
/// never gate the write itself.
#[derive(Clone)]
pub struct JobStateMachine {
    store: Arc<dyn JobStore>,
    handover_window: Duration,
}

impl JobStateMachine {
    pub fn new(store: Arc<dyn JobStore>, handover_window: Duration) -> Self {
        Self {
            store,
            handover_window,
        }
    }

    pub async fn create_job(&self, employer_id: Uuid, job: NewJob) -> Result<Job, ServiceError> {
        validate_text("title", &job.title)?;
        validate_text("address", &job.address)?;
        validate_price(&job.price)?;

        let job = self.store.create_job(employer_id, job, Utc::now()).await?;
        tracing::info!("Job {} created by employer {}", job.id, employer_id);
        Ok(job)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn employer_jobs(&self, employer_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        Ok(self.store.get_employer_jobs(employer_id).await?)
    }

    /// Loads the job and checks that `actor_id` is its employer.
    pub async fn owned_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;
        if !job.is_owned_by(actor_id) {
            return Err(ServiceError::Forbidden(actor_id, job_id));
        }
        Ok(job)
    }

    pub async fn update_job(
        &self,
        job_id: Uuid,
        actor_id: Uuid,
        edit: JobEdit,
    ) -> Result<Job, ServiceError> {
        if let Some(title) = &edit.title {
            validate_text("title", title)?;
        }
        if let Some(address) = &edit.address {
            validate_text("address", address)?;
        }
        if let Some(price) = &edit.price {
            validate_price(price)?;
        }

        let job = self.owned_job(job_id, actor_id).await?;
        if !job.status.is_editable() {
            return Err(ServiceError::InvalidJobState(job_id, job.status, "edit"));
        }

        match self.store.update_job_details(job_id, edit, Utc::now()).await? {
            Some(job) => Ok(job),
            None => Err(self.lost_race(job_id, "edit").await),
        }
    }

    pub async fn delete_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        let job = self.owned_job(job_id, actor_id).await?;
        if job.status != JobStatus::Open {
            return Err(ServiceError::InvalidJobState(job_id, job.status, "delete"));
        }

        if !self.store.delete_open_job(job_id).await? {
            return Err(self.lost_race(job_id, "delete").await);
        }
        tracing::info!("Job {} deleted by employer {}", job_id, actor_id);
        Ok(())
    }

    pub async fn history(&self, job_id: Uuid) -> Result<Vec<StatusLogEntry>, ServiceError> {
        self.get_job(job_id).await?;
        Ok(self.store.get_status_logs(job_id).await?)
    }

    pub async fn overdue_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>, ServiceError> {
        Ok(self.store.get_overdue_handover_jobs(now).await?)
    }

    /// `Open -> InHandover` for `worker_id`, whose application must be pending.
    pub async fn accept(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor_id: Uuid,
    ) -> Result<AcceptedJob, ServiceError> {
        let job = self.owned_job(job_id, actor_id).await?;
        if job.status != JobStatus::Open {
            return Err(ServiceError::InvalidJobState(job_id, job.status, "accept a worker"));
        }

        let application = self
            .store
            .get_application(job_id, worker_id)
            .await?
            .ok_or(ServiceError::ApplicationNotFound(job_id, worker_id))?;
        if application.status != ApplicationStatus::Applied {
            return Err(ServiceError::InvalidApplicationState(
                job_id,
                worker_id,
                application.status,
            ));
        }

        let now = Utc::now();
        let deadline = now + self.handover_window;
        let accepted = self
            .store
            .accept_worker_tx(job_id, worker_id, Actor::User(actor_id), deadline, now)
            .await?;

        let Some(accepted) = accepted else {
            // Either another accept won the slot or the application was
            // rejected in between. Neither is retried.
            if let Some(application) = self.store.get_application(job_id, worker_id).await? {
                if application.status != ApplicationStatus::Applied {
                    return Err(ServiceError::InvalidApplicationState(
                        job_id,
                        worker_id,
                        application.status,
                    ));
                }
            }
            tracing::warn!(
                "Accept of worker {} on job {} lost to a concurrent transition",
                worker_id,
                job_id
            );
            return Err(ServiceError::ConcurrentTransition(job_id));
        };

        debug_assert!(accepted.job.holds_handover_invariant());
        tracing::info!(
            "Job {} open -> in_handover: worker {} accepted by {}, deadline {}",
            job_id,
            worker_id,
            actor_id,
            deadline
        );
        Ok(accepted)
    }

    /// `InHandover -> Completed`. The accepted worker id stays on the row.
    pub async fn complete(&self, job_id: Uuid, actor_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.owned_job(job_id, actor_id).await?;
        if job.status != JobStatus::InHandover || job.accepted_worker_id.is_none() {
            return Err(ServiceError::InvalidJobState(job_id, job.status, "complete"));
        }

        match self
            .store
            .complete_job_tx(job_id, Actor::User(actor_id), Utc::now())
            .await?
        {
            Some(job) => {
                tracing::info!("Job {} in_handover -> completed by {}", job_id, actor_id);
                Ok(job)
            }
            None => Err(self.lost_race(job_id, "complete").await),
        }
    }

    /// `InHandover -> Open` on the employer's request.
    pub async fn reset(&self, job_id: Uuid, actor_id: Uuid) -> Result<ReleasedJob, ServiceError> {
        let job = self.owned_job(job_id, actor_id).await?;
        if job.status != JobStatus::InHandover {
            return Err(ServiceError::InvalidJobState(job_id, job.status, "reset"));
        }

        match self
            .store
            .reset_handover_tx(job_id, Actor::User(actor_id), Utc::now())
            .await?
        {
            Some(released) => {
                debug_assert!(released.job.holds_handover_invariant());
                tracing::info!(
                    "Job {} in_handover -> open: reset by {}, released worker {:?}",
                    job_id,
                    actor_id,
                    released.released_worker_id
                );
                Ok(released)
            }
            None => Err(self.lost_race(job_id, "reset").await),
        }
    }

    /// `InHandover -> Open` once the handover deadline is behind `now`.
    ///
    /// Returns `Ok(None)` when the job is no longer an overdue handover, which
    /// includes a second expire of the same job and losing to a reset or
    /// complete. Only a missing job is an error.
    pub async fn expire(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, ServiceError> {
        let released = self.store.expire_handover_tx(job_id, now).await?;
        match &released {
            Some(released) => tracing::info!(
                "Job {} in_handover -> open: handover expired, released worker {:?}",
                job_id,
                released.released_worker_id
            ),
            None => {
                self.get_job(job_id).await?;
                tracing::debug!("Job {} not expired: no overdue handover at {}", job_id, now);
            }
        }
        Ok(released)
    }

    /// Error for a conditional write that matched no row after the pre-check
    /// had passed.
    async fn lost_race(&self, job_id: Uuid, action: &'static str) -> ServiceError {
        match self.store.get_job_by_id(job_id).await {
            Ok(Some(job)) => {
                tracing::warn!(
                    "Cannot {} job {}: status changed concurrently to {}",
                    action,
                    job_id,
                    job.status.to_str()
                );
                ServiceError::InvalidJobState(job_id, job.status, action)
            }
            Ok(None) => ServiceError::JobNotFound(job_id),
            Err(e) => ServiceError::Database(e),
        }
    }
}

fn validate_text(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_price(price: &BigDecimal) -> Result<(), ServiceError> {
    if *price < BigDecimal::from(0) {
        return Err(ServiceError::Validation("price must not be negative".to_string()));
    }
    Ok(())
}
