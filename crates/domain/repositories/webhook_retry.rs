use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use chrono::{DateTime, Utc};

use crate::domain::entities::webhook_retry_jobs::{
    InsertWebhookRetryJobEntity, WebhookRetryJobEntity,
};

#[automock]
#[async_trait]
pub trait WebhookRetryRepository {
    async fn enqueue(&self, insert_job: InsertWebhookRetryJobEntity) -> Result<Uuid>;

    /// Claims the next due queued job (skipping rows locked by concurrent
    /// workers) and marks it running.
    async fn lock_next_due(&self, now: DateTime<Utc>) -> Result<Option<WebhookRetryJobEntity>>;

    async fn mark_done(&self, job_id: Uuid) -> Result<()>;

    /// Requeues with backoff, or parks the job as dead once `max_attempts`
    /// is reached.
    async fn mark_failed(&self, job_id: Uuid, err: String, max_attempts: i32) -> Result<()>;

    /// Returns `running` jobs locked before `cutoff` to the queue. Covers
    /// workers that died between claiming a job and marking it done or
    /// failed.
    async fn requeue_stale(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
