// Shared fixtures for the service tests.
use std::sync::Arc;

use chrono::Duration;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::memorydb::MemoryStore,
    models::jobmodel::*,
    service::{
        application_service::ApplicationService,
        application_workflow::ApplicationWorkflow,
        expiration_sweeper::ExpirationSweeper,
        job_state_machine::JobStateMachine,
        notification_service::testing::RecordingSink,
    },
};

pub fn new_job() -> NewJob {
    NewJob {
        title: "Fix leaking kitchen sink".to_string(),
        price: BigDecimal::from(250),
        address: "14 Harbour Road".to_string(),
        required_skill: Some("plumbing".to_string()),
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub state_machine: JobStateMachine,
    pub applications: ApplicationService,
    pub workflow: ApplicationWorkflow,
    pub sweeper: ExpirationSweeper,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(RecordingSink::default()))
    }

    pub fn with_sink(sink: Arc<RecordingSink>) -> Self {
        Self::build(Arc::new(MemoryStore::new()), sink)
    }

    /// Every conditional write yields first, so futures joined together all
    /// finish their reads before the first write lands.
    pub fn interleaved() -> Self {
        Self::build(
            Arc::new(MemoryStore::interleaved()),
            Arc::new(RecordingSink::default()),
        )
    }

    fn build(store: Arc<MemoryStore>, sink: Arc<RecordingSink>) -> Self {
        let state_machine = JobStateMachine::new(store.clone(), Duration::days(30));
        let applications = ApplicationService::new(store.clone());
        let workflow = ApplicationWorkflow::new(
            applications.clone(),
            state_machine.clone(),
            sink.clone(),
        );
        let sweeper = ExpirationSweeper::new(state_machine.clone(), sink.clone());

        Self {
            store,
            sink,
            state_machine,
            applications,
            workflow,
            sweeper,
        }
    }

    pub async fn open_job(&self, employer: Uuid) -> Job {
        self.state_machine
            .create_job(employer, new_job())
            .await
            .expect("job created")
    }

    pub async fn job_in_handover(&self, employer: Uuid, worker: Uuid) -> Job {
        let job = self.open_job(employer).await;
        self.applications
            .apply(job.id, worker)
            .await
            .expect("application stored");
        self.state_machine
            .accept(job.id, worker, employer)
            .await
            .expect("worker accepted")
            .job
    }

    pub fn assert_invariants(&self) {
        for job in self.store.jobs() {
            assert!(
                job.holds_handover_invariant(),
                "job {} breaks the handover invariant: {:?}",
                job.id,
                job
            );
        }
    }
}
