// service/application_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::db::JobStore,
    models::jobmodel::*,
    service::error::ServiceError,
};

/// Worker applications. One row per `(job, worker)`; a row leaves `Applied`
/// at most once and is never touched again.
#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn JobStore>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn apply(&self, job_id: Uuid, worker_id: Uuid) -> Result<Application, ServiceError> {
        let job = self.load_job(job_id).await?;
        check_can_apply(&job, worker_id)?;

        if let Some(application) = self
            .store
            .insert_application_if_absent(job_id, worker_id, Utc::now())
            .await?
        {
            tracing::info!("Worker {} applied to job {}", worker_id, job_id);
            return Ok(application);
        }

        // Nothing inserted: the job changed under us or this is a duplicate.
        let job = self.load_job(job_id).await?;
        check_can_apply(&job, worker_id)?;

        tracing::info!(
            "Duplicate application from worker {} on job {} ignored",
            worker_id,
            job_id
        );
        Err(ServiceError::AlreadyApplied(job_id, worker_id))
    }

    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<Application>, ServiceError> {
        Ok(self.store.get_job_applications(job_id).await?)
    }

    pub async fn list_for_worker(&self, worker_id: Uuid) -> Result<Vec<Application>, ServiceError> {
        Ok(self.store.get_worker_applications(worker_id).await?)
    }

    /// Rejects a pending application. Job state is not touched.
    pub async fn reject(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Application, ServiceError> {
        let job = self.load_job(job_id).await?;
        if !job.is_owned_by(actor_id) {
            return Err(ServiceError::Forbidden(actor_id, job_id));
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

        if let Some(rejected) = self
            .store
            .reject_application(job_id, worker_id, Utc::now())
            .await?
        {
            tracing::info!(
                "Application of worker {} on job {} rejected by {}",
                worker_id,
                job_id,
                actor_id
            );
            return Ok(rejected);
        }

        // Accepted (or rejected) by a concurrent request.
        let current = self
            .store
            .get_application(job_id, worker_id)
            .await?
            .ok_or(ServiceError::ApplicationNotFound(job_id, worker_id))?;
        Err(ServiceError::InvalidApplicationState(
            job_id,
            worker_id,
            current.status,
        ))
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }
}

fn check_can_apply(job: &Job, worker_id: Uuid) -> Result<(), ServiceError> {
    if job.is_owned_by(worker_id) {
        return Err(ServiceError::Forbidden(worker_id, job.id));
    }
    if job.status == JobStatus::Completed {
        return Err(ServiceError::InvalidJobState(job.id, job.status, "apply"));
    }
    Ok(())
}
