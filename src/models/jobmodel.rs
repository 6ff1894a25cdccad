// models/jobmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

/// Principal recorded in `job_status_logs.changed_by` for sweep-driven transitions.
pub const SYSTEM_ACTOR_ID: Uuid = Uuid::nil();

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InHandover,
    Completed,
}

impl JobStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InHandover => "in_handover",
            JobStatus::Completed => "completed",
        }
    }

    /// Owners may only edit a job that has not been completed.
    pub fn is_editable(&self) -> bool {
        matches!(self, JobStatus::Open | JobStatus::InHandover)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Who triggered a job transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    System,
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match self {
            Actor::User(id) => *id,
            Actor::System => SYSTEM_ACTOR_ID,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub address: String,
    pub required_skill: Option<String>,
    pub status: JobStatus,
    pub accepted_worker_id: Option<Uuid>,
    pub handover_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.employer_id == user_id
    }

    /// The accepted worker and handover deadline are present exactly while the
    /// job is in handover. Completed jobs keep the worker id as history.
    pub fn holds_handover_invariant(&self) -> bool {
        match self.status {
            JobStatus::Open => self.accepted_worker_id.is_none() && self.handover_deadline.is_none(),
            JobStatus::InHandover => {
                self.accepted_worker_id.is_some() && self.handover_deadline.is_some()
            }
            JobStatus::Completed => true,
        }
    }

    pub fn handover_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::InHandover
            && self.handover_deadline.map_or(false, |deadline| deadline < now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct StatusLogEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub old_status: JobStatus,
    pub new_status: JobStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

impl StatusLogEntry {
    pub fn is_system_change(&self) -> bool {
        self.changed_by == SYSTEM_ACTOR_ID
    }
}

/// Fields an employer supplies when posting a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub price: BigDecimal,
    pub address: String,
    pub required_skill: Option<String>,
}

/// Partial edit of the descriptive fields of a job. Lifecycle columns are
/// never touched by an edit.
#[derive(Debug, Clone, Default)]
pub struct JobEdit {
    pub title: Option<String>,
    pub price: Option<BigDecimal>,
    pub address: Option<String>,
    pub required_skill: Option<String>,
}

/// Result of a successful accept: the job now in handover plus the accepted application.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedJob {
    pub job: Job,
    pub application: Application,
}

/// Result of a transition out of handover back to `Open`.
#[derive(Debug, Clone, Serialize)]
pub struct ReleasedJob {
    pub job: Job,
    pub released_worker_id: Option<Uuid>,
}
