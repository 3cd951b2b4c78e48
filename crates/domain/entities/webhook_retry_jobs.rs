use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::webhook_retry_jobs;

/// A verified-but-unapplied webhook event parked for internal redelivery,
/// so recovery never depends on the gateway's own retry policy.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = webhook_retry_jobs)]
pub struct WebhookRetryJobEntity {
    pub id: Uuid,
    pub gateway: String,
    pub event_id: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub status: String,
    /// Stamped when a worker claims the job; cleared when it is requeued.
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_retry_jobs)]
pub struct InsertWebhookRetryJobEntity {
    pub gateway: String,
    pub event_id: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub status: String,
}
