// db/memorydb.rs
//! In-memory store for unit tests. Each conditional write runs under one lock,
//! which gives it the same all-or-nothing behaviour as the SQL statements.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::{applicationdb::ApplicationExt, jobdb::JobExt, statuslogdb::StatusLogExt};
use crate::models::jobmodel::*;

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<Uuid, Job>,
    applications: Vec<Application>,
    status_logs: Vec<StatusLogEntry>,
}

impl MemoryState {
    fn log(&mut self, job_id: Uuid, old: JobStatus, new: JobStatus, actor: Actor, at: DateTime<Utc>) {
        self.status_logs.push(StatusLogEntry {
            id: Uuid::new_v4(),
            job_id,
            old_status: old,
            new_status: new,
            changed_by: actor.id(),
            changed_at: at,
        });
    }

    fn release(
        &mut self,
        job_id: Uuid,
        actor: Actor,
        overdue_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<ReleasedJob> {
        let job = self.jobs.get_mut(&job_id)?;
        if job.status != JobStatus::InHandover {
            return None;
        }
        if let Some(at) = overdue_at {
            if !job.handover_overdue(at) {
                return None;
            }
        }

        let released_worker_id = job.accepted_worker_id.take();
        job.status = JobStatus::Open;
        job.handover_deadline = None;
        job.updated_at = now;
        let job = job.clone();

        self.log(job_id, JobStatus::InHandover, JobStatus::Open, actor, now);
        Some(ReleasedJob {
            job,
            released_worker_id,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    interleave: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose conditional writes yield to the runtime before taking the
    /// lock. Concurrent callers then all pass their reads before any of them
    /// writes, which is the window the conditional writes have to close.
    pub fn interleaved() -> Self {
        Self {
            interleave: true,
            ..Self::default()
        }
    }

    async fn before_write(&self) {
        if self.interleave {
            tokio::task::yield_now().await;
        }
    }

    /// All jobs currently held, for invariant checks.
    pub fn jobs(&self) -> Vec<Job> {
        let guard = self.state.lock().expect("store mutex poisoned");
        guard.jobs.values().cloned().collect()
    }

    pub fn application_count(&self, job_id: Uuid) -> usize {
        let guard = self.state.lock().expect("store mutex poisoned");
        guard.applications.iter().filter(|a| a.job_id == job_id).count()
    }
}

#[async_trait]
impl JobExt for MemoryStore {
    async fn create_job(
        &self,
        employer_id: Uuid,
        job: NewJob,
        now: DateTime<Utc>,
    ) -> Result<Job, Error> {
        let job = Job {
            id: Uuid::new_v4(),
            employer_id,
            title: job.title,
            price: job.price,
            address: job.address,
            required_skill: job.required_skill,
            status: JobStatus::Open,
            accepted_worker_id: None,
            handover_deadline: None,
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.state.lock().expect("store mutex poisoned");
        guard.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard.jobs.get(&job_id).cloned())
    }

    async fn get_employer_jobs(&self, employer_id: Uuid) -> Result<Vec<Job>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        let mut jobs: Vec<Job> = guard
            .jobs
            .values()
            .filter(|job| job.employer_id == employer_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job_details(
        &self,
        job_id: Uuid,
        edit: JobEdit,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let Some(job) = guard.jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        if !job.status.is_editable() {
            return Ok(None);
        }
        if let Some(title) = edit.title {
            job.title = title;
        }
        if let Some(price) = edit.price {
            job.price = price;
        }
        if let Some(address) = edit.address {
            job.address = address;
        }
        if let Some(skill) = edit.required_skill {
            job.required_skill = Some(skill);
        }
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn delete_open_job(&self, job_id: Uuid) -> Result<bool, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let deletable = guard
            .jobs
            .get(&job_id)
            .map_or(false, |job| job.status == JobStatus::Open && job.accepted_worker_id.is_none());
        if !deletable {
            return Ok(false);
        }
        guard.jobs.remove(&job_id);
        guard.applications.retain(|a| a.job_id != job_id);
        Ok(true)
    }

    async fn get_overdue_handover_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        let mut jobs: Vec<Job> = guard
            .jobs
            .values()
            .filter(|job| job.handover_overdue(now))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.handover_deadline);
        Ok(jobs)
    }

    async fn accept_worker_tx(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        actor: Actor,
        handover_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<AcceptedJob>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let state = &mut *guard;

        let open = state
            .jobs
            .get(&job_id)
            .map_or(false, |job| job.status == JobStatus::Open && job.accepted_worker_id.is_none());
        let pending = state.applications.iter().position(|a| {
            a.job_id == job_id && a.worker_id == worker_id && a.status == ApplicationStatus::Applied
        });
        let (true, Some(index)) = (open, pending) else {
            return Ok(None);
        };

        let application = &mut state.applications[index];
        application.status = ApplicationStatus::Accepted;
        application.accepted_at = Some(now);
        let application = application.clone();

        let Some(job) = state.jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        job.status = JobStatus::InHandover;
        job.accepted_worker_id = Some(worker_id);
        job.handover_deadline = Some(handover_deadline);
        job.updated_at = now;
        let job = job.clone();

        state.log(job_id, JobStatus::Open, JobStatus::InHandover, actor, now);
        Ok(Some(AcceptedJob { job, application }))
    }

    async fn complete_job_tx(
        &self,
        job_id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let Some(job) = guard.jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        if job.status != JobStatus::InHandover || job.accepted_worker_id.is_none() {
            return Ok(None);
        }
        job.status = JobStatus::Completed;
        job.updated_at = now;
        let job = job.clone();

        guard.log(job_id, JobStatus::InHandover, JobStatus::Completed, actor, now);
        Ok(Some(job))
    }

    async fn reset_handover_tx(
        &self,
        job_id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard.release(job_id, actor, None, now))
    }

    async fn expire_handover_tx(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedJob>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard.release(job_id, Actor::System, Some(now), now))
    }
}

#[async_trait]
impl ApplicationExt for MemoryStore {
    async fn insert_application_if_absent(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let eligible = guard.jobs.get(&job_id).map_or(false, |job| {
            job.status != JobStatus::Completed && job.employer_id != worker_id
        });
        let duplicate = guard
            .applications
            .iter()
            .any(|a| a.job_id == job_id && a.worker_id == worker_id);
        if !eligible || duplicate {
            return Ok(None);
        }

        let application = Application {
            id: Uuid::new_v4(),
            job_id,
            worker_id,
            status: ApplicationStatus::Applied,
            applied_at: now,
            accepted_at: None,
            rejected_at: None,
        };
        guard.applications.push(application.clone());
        Ok(Some(application))
    }

    async fn get_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Application>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .applications
            .iter()
            .find(|a| a.job_id == job_id && a.worker_id == worker_id)
            .cloned())
    }

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<Application>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .applications
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn get_worker_applications(&self, worker_id: Uuid) -> Result<Vec<Application>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .applications
            .iter()
            .rev()
            .filter(|a| a.worker_id == worker_id)
            .cloned()
            .collect())
    }

    async fn reject_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, Error> {
        self.before_write().await;
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let Some(application) = guard.applications.iter_mut().find(|a| {
            a.job_id == job_id && a.worker_id == worker_id && a.status == ApplicationStatus::Applied
        }) else {
            return Ok(None);
        };
        application.status = ApplicationStatus::Rejected;
        application.rejected_at = Some(now);
        Ok(Some(application.clone()))
    }
}

#[async_trait]
impl StatusLogExt for MemoryStore {
    async fn get_status_logs(&self, job_id: Uuid) -> Result<Vec<StatusLogEntry>, Error> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard
            .status_logs
            .iter()
            .filter(|l| l.job_id == job_id)
            .cloned()
            .collect())
    }
}
