// service/expiration_sweeper.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::{
    models::jobmodel::*,
    service::{
        error::ServiceError,
        job_state_machine::JobStateMachine,
        notification_service::{dispatch, Notification, NotificationKind, NotificationSink},
    },
};

/// Reclaims handovers whose deadline has passed.
#[derive(Clone)]
pub struct ExpirationSweeper {
    state_machine: JobStateMachine,
    notifier: Arc<dyn NotificationSink>,
}

impl ExpirationSweeper {
    pub fn new(state_machine: JobStateMachine, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            state_machine,
            notifier,
        }
    }

    /// Expires every handover overdue at `now` and returns the jobs that were
    /// actually moved back to `Open`. Jobs that were reset or completed in the
    /// meantime are skipped; a failure on one job does not stop the others.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Job>, ServiceError> {
        let candidates = self.state_machine.overdue_jobs(now).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("Handover sweep at {}: {} candidate job(s)", now, candidates.len());

        let mut expired = Vec::with_capacity(candidates.len());
        let mut failed = 0usize;
        for candidate in candidates {
            match self.state_machine.expire(candidate.id, now).await {
                Ok(Some(released)) => {
                    self.notify_expired(&released).await;
                    expired.push(released.job);
                }
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to expire handover of job {}: {}", candidate.id, e);
                }
            }
        }

        tracing::info!(
            "Handover sweep finished: {} expired, {} failed",
            expired.len(),
            failed
        );
        Ok(expired)
    }

    async fn notify_expired(&self, released: &ReleasedJob) {
        let job = &released.job;
        let mut notifications = vec![Notification::new(
            job.employer_id,
            NotificationKind::HandoverExpired,
            job.id,
            format!("The handover of \"{}\" expired and the job is open again", job.title),
        )];
        if let Some(worker_id) = released.released_worker_id {
            notifications.push(Notification::new(
                worker_id,
                NotificationKind::HandoverExpired,
                job.id,
                format!("Your handover of \"{}\" expired", job.title),
            ));
        }
        dispatch(self.notifier.as_ref(), notifications).await;
    }
}

/// Run the sweep every `every` until the process exits.
pub async fn start_handover_expiry_job(sweeper: Arc<ExpirationSweeper>, every: Duration) {
    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        tracing::debug!("Running handover expiry job at {}", Utc::now());

        match sweeper.sweep(Utc::now()).await {
            Ok(expired) if !expired.is_empty() => {
                tracing::info!("Handover expiry job reclaimed {} job(s)", expired.len())
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Handover expiry job failed: {}", e),
        }
    }
}
