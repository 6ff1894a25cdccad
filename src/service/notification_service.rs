// service/notification_service.rs
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{db::db::DBClient, service::error::ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewApplicant,
    ApplicationSubmitted,
    ApplicationAccepted,
    AcceptanceConfirmed,
    ApplicationRejected,
    JobCompleted,
    HandoverReset,
    HandoverExpired,
}

impl NotificationKind {
    pub fn to_str(&self) -> &str {
        match self {
            NotificationKind::NewApplicant => "new_applicant",
            NotificationKind::ApplicationSubmitted => "application_submitted",
            NotificationKind::ApplicationAccepted => "application_accepted",
            NotificationKind::AcceptanceConfirmed => "acceptance_confirmed",
            NotificationKind::ApplicationRejected => "application_rejected",
            NotificationKind::JobCompleted => "job_completed",
            NotificationKind::HandoverReset => "handover_reset",
            NotificationKind::HandoverExpired => "handover_expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub user_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub job_id: Uuid,
}

impl Notification {
    pub fn new(user_id: Uuid, kind: NotificationKind, job_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            kind,
            job_id,
        }
    }
}

/// One-way "tell user X about event Y". Where the message ends up is the
/// sink's business; callers never roll back because of a failed delivery.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), ServiceError>;
}

/// Deliver a batch after commit. Failures are logged and swallowed.
pub async fn dispatch(sink: &dyn NotificationSink, notifications: Vec<Notification>) {
    let sends = notifications.into_iter().map(|notification| async move {
        let user_id = notification.user_id;
        let kind = notification.kind;
        if let Err(e) = sink.notify(notification).await {
            tracing::warn!(
                "Failed to deliver {} notification to user {}: {}",
                kind.to_str(),
                user_id,
                e
            );
        }
    });
    futures::future::join_all(sends).await;
}

/// Stores notifications in the `notifications` table.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify(&self, notification: Notification) -> Result<(), ServiceError> {
        tracing::info!(
            "Notification {} for user {} on job {}",
            notification.kind.to_str(),
            notification.user_id,
            notification.job_id
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, type, job_id, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.kind.to_str())
        .bind(notification.job_id)
        .bind(&notification.message)
        .execute(&self.db_client.pool)
        .await?;

        Ok(())
    }
}
