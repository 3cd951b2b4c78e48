use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::webhook_retry_jobs},
};
use domain::{
    entities::webhook_retry_jobs::{InsertWebhookRetryJobEntity, WebhookRetryJobEntity},
    repositories::webhook_retry::WebhookRetryRepository,
};

pub struct WebhookRetryPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl WebhookRetryPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WebhookRetryRepository for WebhookRetryPostgres {
    async fn enqueue(&self, insert_job: InsertWebhookRetryJobEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(webhook_retry_jobs::table)
            .values(&insert_job)
            .returning(webhook_retry_jobs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn lock_next_due(&self, now: DateTime<Utc>) -> Result<Option<WebhookRetryJobEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let job = conn.transaction::<Option<WebhookRetryJobEntity>, diesel::result::Error, _>(
            |conn| {
                let candidate: Option<WebhookRetryJobEntity> = webhook_retry_jobs::table
                    .select(WebhookRetryJobEntity::as_select())
                    .filter(webhook_retry_jobs::status.eq("queued"))
                    .filter(webhook_retry_jobs::next_attempt_at.le(now))
                    .order(webhook_retry_jobs::next_attempt_at.asc())
                    .for_update()
                    .skip_locked()
                    .first::<WebhookRetryJobEntity>(conn)
                    .optional()?;

                if let Some(job) = candidate {
                    let updated_job = update(webhook_retry_jobs::table.find(job.id))
                        .set((
                            webhook_retry_jobs::status.eq("running"),
                            webhook_retry_jobs::locked_at.eq(Some(now)),
                        ))
                        .returning(WebhookRetryJobEntity::as_select())
                        .get_result::<WebhookRetryJobEntity>(conn)?;
                    Ok(Some(updated_job))
                } else {
                    Ok(None)
                }
            },
        )?;

        Ok(job)
    }

    async fn mark_done(&self, job_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(webhook_retry_jobs::table.find(job_id))
            .set(webhook_retry_jobs::status.eq("done"))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, err: String, max_attempts: i32) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let current_time = Utc::now();

        let job = webhook_retry_jobs::table
            .find(job_id)
            .select(WebhookRetryJobEntity::as_select())
            .first::<WebhookRetryJobEntity>(&mut conn)?;

        let new_attempts = job.attempts + 1;
        let (new_status, next_attempt_at) = if new_attempts < max_attempts {
            // Exponential backoff: 30s, 150s, 750s...
            let backoff_sec = 30 * 5_i64.pow((new_attempts - 1).max(0) as u32);
            ("queued", current_time + Duration::seconds(backoff_sec))
        } else {
            ("dead", current_time)
        };

        update(webhook_retry_jobs::table.find(job_id))
            .set((
                webhook_retry_jobs::status.eq(new_status),
                webhook_retry_jobs::attempts.eq(new_attempts),
                webhook_retry_jobs::last_error.eq(Some(err)),
                webhook_retry_jobs::next_attempt_at.eq(next_attempt_at),
                webhook_retry_jobs::locked_at.eq(None::<DateTime<Utc>>),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn requeue_stale(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let requeued = update(
            webhook_retry_jobs::table
                .filter(webhook_retry_jobs::status.eq("running"))
                .filter(webhook_retry_jobs::locked_at.lt(cutoff)),
        )
        .set((
            webhook_retry_jobs::status.eq("queued"),
            webhook_retry_jobs::locked_at.eq(None::<DateTime<Utc>>),
        ))
        .execute(&mut conn)?;

        Ok(requeued)
    }
}
