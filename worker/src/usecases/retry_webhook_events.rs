use std::sync::Arc;

use anyhow::Result;
use backend::usecases::subscription_lifecycle::{ApplyOutcome, SubscriptionLifecycle};
use chrono::{Duration, Utc};
use crates::domain::{
    repositories::{
        subscriptions::SubscriptionRepository, webhook_events::WebhookEventRepository,
        webhook_retry::WebhookRetryRepository,
    },
    value_objects::{
        enums::{payment_gateways::PaymentGateway, webhook_outcomes::WebhookOutcome},
        webhooks::CanonicalEvent,
    },
};
use tracing::{error, info, warn};

/// Drains the internal redelivery queue for webhook events whose first
/// application failed. Events are already verified and deduplicated; this
/// path only replays the lifecycle write.
pub struct RetryWebhookEventsUseCase<S, E, R>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    E: WebhookEventRepository + Send + Sync + 'static,
    R: WebhookRetryRepository + Send + Sync + 'static,
{
    lifecycle: Arc<SubscriptionLifecycle<S>>,
    event_repo: Arc<E>,
    retry_repo: Arc<R>,
    max_attempts: i32,
    stale_after_secs: i64,
}

impl<S, E, R> RetryWebhookEventsUseCase<S, E, R>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    E: WebhookEventRepository + Send + Sync + 'static,
    R: WebhookRetryRepository + Send + Sync + 'static,
{
    pub fn new(
        lifecycle: Arc<SubscriptionLifecycle<S>>,
        event_repo: Arc<E>,
        retry_repo: Arc<R>,
        max_attempts: i32,
        stale_after_secs: i64,
    ) -> Self {
        Self {
            lifecycle,
            event_repo,
            retry_repo,
            max_attempts,
            stale_after_secs,
        }
    }

    /// Claims and replays due jobs one at a time, up to `batch` per call.
    /// Jobs left `running` by a worker that died mid-replay are returned to
    /// the queue first.
    pub async fn drain_once(&self, batch: usize) -> Result<usize> {
        let requeued = self
            .retry_repo
            .requeue_stale(Utc::now() - Duration::seconds(self.stale_after_secs))
            .await?;
        if requeued > 0 {
            warn!(requeued, "retry: requeued jobs abandoned by a dead worker");
        }

        let mut processed = 0;

        while processed < batch {
            let Some(job) = self.retry_repo.lock_next_due(Utc::now()).await? else {
                break;
            };
            processed += 1;

            let canonical: CanonicalEvent = match serde_json::from_value(job.payload.clone()) {
                Ok(canonical) => canonical,
                Err(err) => {
                    // The payload will never deserialize on a later attempt
                    // either; park it dead immediately.
                    error!(
                        job_id = %job.id,
                        event_id = %job.event_id,
                        error = %err,
                        "retry: undecodable job payload, parking as dead"
                    );
                    self.retry_repo
                        .mark_failed(job.id, format!("undecodable payload: {}", err), 0)
                        .await?;
                    continue;
                }
            };

            let gateway = PaymentGateway::from_str(&job.gateway);

            match self.lifecycle.apply_event(&canonical, gateway).await {
                Ok(outcome) => {
                    self.retry_repo.mark_done(job.id).await?;
                    let final_outcome = match outcome {
                        ApplyOutcome::Applied { .. } => WebhookOutcome::Applied,
                        ApplyOutcome::Unhandled { .. } => WebhookOutcome::Unhandled,
                    };
                    info!(
                        job_id = %job.id,
                        event_id = %job.event_id,
                        attempts = job.attempts,
                        outcome = %final_outcome,
                        "retry: job replayed"
                    );
                    self.refresh_log_row(&job.gateway, &job.event_id, final_outcome)
                        .await;
                }
                Err(err) => {
                    warn!(
                        job_id = %job.id,
                        event_id = %job.event_id,
                        attempts = job.attempts,
                        error = %err,
                        "retry: replay failed, backing off"
                    );
                    self.retry_repo
                        .mark_failed(job.id, err.to_string(), self.max_attempts)
                        .await?;
                }
            }
        }

        Ok(processed)
    }

    async fn refresh_log_row(&self, gateway: &str, event_id: &str, outcome: WebhookOutcome) {
        let row = match self
            .event_repo
            .find(gateway.to_string(), event_id.to_string())
            .await
        {
            Ok(Some(row)) => row,
            Ok(None) => return,
            Err(err) => {
                warn!(gateway, event_id, error = %err, "retry: log row lookup failed");
                return;
            }
        };

        if let Err(err) = self
            .event_repo
            .record_outcome(row.id, outcome.to_string())
            .await
        {
            warn!(gateway, event_id, error = %err, "retry: failed to refresh log row");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::Duration;
    use crates::domain::{
        entities::{
            subscriptions::SubscriptionEntity, webhook_events::WebhookEventEntity,
            webhook_retry_jobs::WebhookRetryJobEntity,
        },
        repositories::{
            subscriptions::MockSubscriptionRepository,
            webhook_events::MockWebhookEventRepository, webhook_retry::MockWebhookRetryRepository,
        },
        value_objects::enums::{
            plan_types::PlanType, subscription_events::SubscriptionEvent,
        },
    };
    use uuid::Uuid;

    fn queued_job(user_id: Uuid) -> WebhookRetryJobEntity {
        let canonical = CanonicalEvent {
            user_id,
            plan_type: Some(PlanType::Monthly),
            event_type: SubscriptionEvent::CheckoutCompleted,
            gateway_subscription_id: Some("sub_123".to_string()),
            amount_minor: Some(999),
            occurred_at: Utc::now(),
        };

        WebhookRetryJobEntity {
            id: Uuid::new_v4(),
            gateway: "stripe".to_string(),
            event_id: "evt_1".to_string(),
            payload: serde_json::to_value(&canonical).unwrap(),
            attempts: 1,
            next_attempt_at: Utc::now() - Duration::seconds(5),
            last_error: Some("connection refused".to_string()),
            status: "running".to_string(),
            locked_at: Some(Utc::now()),
            created_at: Utc::now() - Duration::seconds(60),
        }
    }

    fn free_row(user_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_type: "free".to_string(),
            status: "free".to_string(),
            payment_gateway: None,
            gateway_subscription_id: None,
            started_at: now,
            expires_at: None,
            last_payment_at: None,
            next_payment_at: None,
            auto_renew: false,
            canceled_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn log_row() -> WebhookEventEntity {
        WebhookEventEntity {
            id: Uuid::new_v4(),
            gateway: "stripe".to_string(),
            event_id: "evt_1".to_string(),
            event_type: "checkout.session.completed".to_string(),
            received_at: Utc::now(),
            processed_at: None,
            outcome: "queued_retry".to_string(),
        }
    }

    #[tokio::test]
    async fn a_due_job_is_replayed_and_marked_done() {
        let user_id = Uuid::new_v4();
        let job = queued_job(user_id);
        let job_id = job.id;

        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo.expect_requeue_stale().returning(|_| Ok(0));
        let mut handed_out = false;
        retry_repo.expect_lock_next_due().returning(move |_| {
            let job = if handed_out { None } else { Some(job.clone()) };
            handed_out = true;
            Ok(job)
        });
        retry_repo
            .expect_mark_done()
            .withf(move |id| *id == job_id)
            .returning(|_| Ok(()));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(move |_| Ok(Some(free_row(user_id))));
        subscription_repo
            .expect_update_with_version()
            .returning(move |_, _, _| {
                let mut updated = free_row(user_id);
                updated.status = "active".to_string();
                updated.version = 1;
                Ok(Some(updated))
            });

        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_find()
            .returning(|_, _| Ok(Some(log_row())));
        event_repo
            .expect_record_outcome()
            .withf(|_, outcome| outcome == "applied")
            .returning(|_, _| Ok(()));

        let usecase = RetryWebhookEventsUseCase::new(
            Arc::new(SubscriptionLifecycle::new(Arc::new(subscription_repo), 7)),
            Arc::new(event_repo),
            Arc::new(retry_repo),
            5,
            600,
        );

        let processed = usecase.drain_once(10).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn a_failed_replay_is_backed_off_with_the_configured_cap() {
        let user_id = Uuid::new_v4();
        let job = queued_job(user_id);
        let job_id = job.id;

        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo.expect_requeue_stale().returning(|_| Ok(0));
        let mut handed_out = false;
        retry_repo.expect_lock_next_due().returning(move |_| {
            let job = if handed_out { None } else { Some(job.clone()) };
            handed_out = true;
            Ok(job)
        });
        retry_repo
            .expect_mark_failed()
            .withf(move |id, _, max_attempts| *id == job_id && *max_attempts == 5)
            .returning(|_, _, _| Ok(()));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(|_| Err(anyhow!("still down")));

        let usecase = RetryWebhookEventsUseCase::new(
            Arc::new(SubscriptionLifecycle::new(Arc::new(subscription_repo), 7)),
            Arc::new(MockWebhookEventRepository::new()),
            Arc::new(retry_repo),
            5,
            600,
        );

        let processed = usecase.drain_once(10).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn an_undecodable_payload_is_parked_dead() {
        let user_id = Uuid::new_v4();
        let mut job = queued_job(user_id);
        job.payload = serde_json::json!({ "not": "a canonical event" });
        let job_id = job.id;

        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo.expect_requeue_stale().returning(|_| Ok(0));
        let mut handed_out = false;
        retry_repo.expect_lock_next_due().returning(move |_| {
            let job = if handed_out { None } else { Some(job.clone()) };
            handed_out = true;
            Ok(job)
        });
        retry_repo
            .expect_mark_failed()
            .withf(move |id, err, max_attempts| {
                *id == job_id && err.contains("undecodable") && *max_attempts == 0
            })
            .returning(|_, _, _| Ok(()));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_find_by_user_id().times(0);

        let usecase = RetryWebhookEventsUseCase::new(
            Arc::new(SubscriptionLifecycle::new(Arc::new(subscription_repo), 7)),
            Arc::new(MockWebhookEventRepository::new()),
            Arc::new(retry_repo),
            5,
            600,
        );

        let processed = usecase.drain_once(10).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn an_empty_queue_processes_nothing() {
        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo.expect_requeue_stale().returning(|_| Ok(0));
        retry_repo
            .expect_lock_next_due()
            .returning(|_| Ok(None));

        let usecase = RetryWebhookEventsUseCase::new(
            Arc::new(SubscriptionLifecycle::new(
                Arc::new(MockSubscriptionRepository::new()),
                7,
            )),
            Arc::new(MockWebhookEventRepository::new()),
            Arc::new(retry_repo),
            5,
            600,
        );

        let processed = usecase.drain_once(10).await.unwrap();
        assert_eq!(processed, 0);
    }

    #[tokio::test]
    async fn abandoned_running_jobs_are_requeued_before_draining() {
        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo
            .expect_requeue_stale()
            .times(1)
            .withf(|cutoff| *cutoff <= Utc::now() - Duration::seconds(600))
            .returning(|_| Ok(1));
        retry_repo.expect_lock_next_due().returning(|_| Ok(None));

        let usecase = RetryWebhookEventsUseCase::new(
            Arc::new(SubscriptionLifecycle::new(
                Arc::new(MockSubscriptionRepository::new()),
                7,
            )),
            Arc::new(MockWebhookEventRepository::new()),
            Arc::new(retry_repo),
            5,
            600,
        );

        let processed = usecase.drain_once(10).await.unwrap();
        assert_eq!(processed, 0);
    }
}
