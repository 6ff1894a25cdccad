// service/application_workflow.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    models::jobmodel::*,
    service::{
        application_service::ApplicationService,
        error::ServiceError,
        job_state_machine::JobStateMachine,
        notification_service::{dispatch, Notification, NotificationKind, NotificationSink},
    },
};

/// Entry points used by the HTTP layer. State changes commit first; the
/// notifications that follow are best effort.
#[derive(Clone)]
pub struct ApplicationWorkflow {
    applications: ApplicationService,
    state_machine: JobStateMachine,
    notifier: Arc<dyn NotificationSink>,
}

impl ApplicationWorkflow {
    pub fn new(
        applications: ApplicationService,
        state_machine: JobStateMachine,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            applications,
            state_machine,
            notifier,
        }
    }

    pub async fn apply_to_job(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Application, ServiceError> {
        let job = self.state_machine.get_job(job_id).await?;
        let application = self.applications.apply(job_id, worker_id).await?;

        dispatch(
            self.notifier.as_ref(),
            vec![
                Notification::new(
                    job.employer_id,
                    NotificationKind::NewApplicant,
                    job.id,
                    format!("A new worker applied to \"{}\"", job.title),
                ),
                Notification::new(
                    worker_id,
                    NotificationKind::ApplicationSubmitted,
                    job.id,
                    format!("Your application for \"{}\" was submitted", job.title),
                ),
            ],
        )
        .await;

        Ok(application)
    }

    pub async fn accept_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor_id: Uuid,
    ) -> Result<AcceptedJob, ServiceError> {
        let accepted = self.state_machine.accept(job_id, worker_id, actor_id).await?;

        let job = &accepted.job;
        dispatch(
            self.notifier.as_ref(),
            vec![
                Notification::new(
                    worker_id,
                    NotificationKind::ApplicationAccepted,
                    job.id,
                    format!("You were accepted for \"{}\"", job.title),
                ),
                Notification::new(
                    job.employer_id,
                    NotificationKind::AcceptanceConfirmed,
                    job.id,
                    format!("You accepted a worker for \"{}\"", job.title),
                ),
            ],
        )
        .await;

        Ok(accepted)
    }

    pub async fn reject_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Application, ServiceError> {
        let rejected = self.applications.reject(job_id, worker_id, actor_id).await?;

        dispatch(
            self.notifier.as_ref(),
            vec![Notification::new(
                worker_id,
                NotificationKind::ApplicationRejected,
                job_id,
                "Your application was not accepted",
            )],
        )
        .await;

        Ok(rejected)
    }

    pub async fn complete_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.state_machine.complete(job_id, actor_id).await?;

        if let Some(worker_id) = job.accepted_worker_id {
            dispatch(
                self.notifier.as_ref(),
                vec![Notification::new(
                    worker_id,
                    NotificationKind::JobCompleted,
                    job.id,
                    format!("\"{}\" was marked as completed", job.title),
                )],
            )
            .await;
        }

        Ok(job)
    }

    pub async fn reset_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<Job, ServiceError> {
        let released = self.state_machine.reset(job_id, actor_id).await?;

        if let Some(worker_id) = released.released_worker_id {
            dispatch(
                self.notifier.as_ref(),
                vec![Notification::new(
                    worker_id,
                    NotificationKind::HandoverReset,
                    job_id,
                    format!("The employer cancelled your handover of \"{}\"", released.job.title),
                )],
            )
            .await;
        }

        Ok(released.job)
    }

    /// Applications on a job, visible to its employer only.
    pub async fn applications_for_job(
        &self,
        job_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<Application>, ServiceError> {
        self.state_machine.owned_job(job_id, actor_id).await?;
        self.applications.list_for_job(job_id).await
    }

    pub async fn applications_for_worker(
        &self,
        worker_id: Uuid,
    ) -> Result<Vec<Application>, ServiceError> {
        self.applications.list_for_worker(worker_id).await
    }
}
