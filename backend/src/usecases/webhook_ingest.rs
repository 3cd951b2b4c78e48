use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use crates::{
    domain::{
        entities::{
            webhook_events::InsertWebhookEventEntity,
            webhook_retry_jobs::InsertWebhookRetryJobEntity,
        },
        repositories::{
            subscriptions::SubscriptionRepository, webhook_events::WebhookEventRepository,
            webhook_retry::WebhookRetryRepository,
        },
        value_objects::{
            enums::{payment_gateways::PaymentGateway, webhook_outcomes::WebhookOutcome},
            webhooks::CanonicalPayload,
        },
    },
    payments::GatewayWebhookAdapter,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::usecases::subscription_lifecycle::{ApplyOutcome, SubscriptionLifecycle};

/// First internal redelivery delay; later attempts back off in the retry
/// repository.
const FIRST_RETRY_DELAY_SECS: i64 = 30;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("unknown payment gateway")]
    UnknownGateway,
    #[error("webhook signature verification failed")]
    SignatureInvalid,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            WebhookError::UnknownGateway => StatusCode::NOT_FOUND,
            WebhookError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type WebhookResult<T> = std::result::Result<T, WebhookError>;

#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub outcome: WebhookOutcome,
    pub duplicate: bool,
}

/// Verified deliveries are acked whether or not downstream application
/// succeeds; recovery runs on the internal retry queue, never on the
/// gateway's redelivery policy.
pub struct WebhookIngestUseCase<S, E, R>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    E: WebhookEventRepository + Send + Sync + 'static,
    R: WebhookRetryRepository + Send + Sync + 'static,
{
    lifecycle: Arc<SubscriptionLifecycle<S>>,
    event_repo: Arc<E>,
    retry_repo: Arc<R>,
    adapters: HashMap<PaymentGateway, Arc<dyn GatewayWebhookAdapter>>,
}

impl<S, E, R> WebhookIngestUseCase<S, E, R>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    E: WebhookEventRepository + Send + Sync + 'static,
    R: WebhookRetryRepository + Send + Sync + 'static,
{
    pub fn new(
        lifecycle: Arc<SubscriptionLifecycle<S>>,
        event_repo: Arc<E>,
        retry_repo: Arc<R>,
        adapters: Vec<Arc<dyn GatewayWebhookAdapter>>,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.gateway(), adapter))
            .collect();

        Self {
            lifecycle,
            event_repo,
            retry_repo,
            adapters,
        }
    }

    pub async fn ingest(
        &self,
        gateway_name: &str,
        signature_header: &str,
        body: &[u8],
    ) -> WebhookResult<IngestAck> {
        let gateway =
            PaymentGateway::from_str(gateway_name).ok_or(WebhookError::UnknownGateway)?;
        let adapter = self
            .adapters
            .get(&gateway)
            .ok_or(WebhookError::UnknownGateway)?;

        adapter.verify(body, signature_header).map_err(|err| {
            warn!(%gateway, error = %err, "webhooks: signature rejected");
            WebhookError::SignatureInvalid
        })?;

        let translated = match adapter.translate(body) {
            Ok(translated) => translated,
            Err(err) => {
                // No event id to log under; ack so the gateway stops
                // resending a body we will never be able to parse.
                warn!(%gateway, error = %err, "webhooks: undecodable envelope, acking without a log row");
                return Ok(IngestAck {
                    outcome: WebhookOutcome::Skipped,
                    duplicate: false,
                });
            }
        };

        let inserted = self
            .event_repo
            .insert_if_absent(InsertWebhookEventEntity {
                gateway: gateway.to_string(),
                event_id: translated.event_id.clone(),
                event_type: translated.event_type_raw.clone(),
                received_at: Utc::now(),
                outcome: WebhookOutcome::Received.to_string(),
            })
            .await?;

        let (log_row, duplicate) = match inserted {
            Some(log_row) => (log_row, false),
            None => {
                let prior = self
                    .event_repo
                    .find(gateway.to_string(), translated.event_id.clone())
                    .await?;
                match prior {
                    // Still `received` means the first delivery never reached
                    // a terminal outcome (crash, or a failed retry enqueue);
                    // run it again under the same log row.
                    Some(row)
                        if WebhookOutcome::from_str(&row.outcome) == WebhookOutcome::Received =>
                    {
                        warn!(
                            %gateway,
                            event_id = %translated.event_id,
                            "webhooks: redelivery of an unfinished event, reprocessing"
                        );
                        (row, true)
                    }
                    prior => {
                        let outcome = prior
                            .map(|row| WebhookOutcome::from_str(&row.outcome))
                            .unwrap_or_default();
                        info!(
                            %gateway,
                            event_id = %translated.event_id,
                            %outcome,
                            "webhooks: duplicate delivery, replaying recorded outcome"
                        );
                        return Ok(IngestAck {
                            outcome,
                            duplicate: true,
                        });
                    }
                }
            }
        };

        let outcome = match translated.payload {
            CanonicalPayload::Ignored => {
                info!(
                    %gateway,
                    event_id = %translated.event_id,
                    event_type = %translated.event_type_raw,
                    "webhooks: unsupported event type, skipped"
                );
                WebhookOutcome::Skipped
            }
            CanonicalPayload::Invalid(reason) => {
                warn!(
                    %gateway,
                    event_id = %translated.event_id,
                    event_type = %translated.event_type_raw,
                    %reason,
                    "webhooks: supported event with invalid payload, skipped"
                );
                WebhookOutcome::Skipped
            }
            CanonicalPayload::Event(canonical) => {
                match self.lifecycle.apply_event(&canonical, Some(gateway)).await {
                    Ok(ApplyOutcome::Applied { status }) => {
                        info!(
                            %gateway,
                            event_id = %translated.event_id,
                            %status,
                            "webhooks: event applied"
                        );
                        WebhookOutcome::Applied
                    }
                    Ok(ApplyOutcome::Unhandled { status, event }) => {
                        warn!(
                            %gateway,
                            event_id = %translated.event_id,
                            %status,
                            %event,
                            "webhooks: event has no effect on current status"
                        );
                        WebhookOutcome::Unhandled
                    }
                    Err(err) => {
                        error!(
                            %gateway,
                            event_id = %translated.event_id,
                            error = %err,
                            "webhooks: apply failed, queueing internal retry"
                        );
                        let payload = serde_json::to_value(&canonical)
                            .context("failed to serialize canonical event")?;
                        self.retry_repo
                            .enqueue(InsertWebhookRetryJobEntity {
                                gateway: gateway.to_string(),
                                event_id: translated.event_id.clone(),
                                payload,
                                attempts: 0,
                                next_attempt_at: Utc::now()
                                    + Duration::seconds(FIRST_RETRY_DELAY_SECS),
                                last_error: Some(err.to_string()),
                                status: "queued".to_string(),
                            })
                            .await?;
                        WebhookOutcome::QueuedRetry
                    }
                }
            }
        };

        if let Err(err) = self
            .event_repo
            .record_outcome(log_row.id, outcome.to_string())
            .await
        {
            // The delivery is already handled; a stale `received` row is
            // recoverable, a gateway retry storm is not.
            error!(
                %gateway,
                event_id = %translated.event_id,
                error = %err,
                "webhooks: failed to record outcome, acking anyway"
            );
        }

        Ok(IngestAck { outcome, duplicate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use crates::domain::{
        entities::{subscriptions::SubscriptionEntity, webhook_events::WebhookEventEntity},
        repositories::{
            subscriptions::MockSubscriptionRepository,
            webhook_events::MockWebhookEventRepository, webhook_retry::MockWebhookRetryRepository,
        },
        value_objects::{
            enums::{plan_types::PlanType, subscription_events::SubscriptionEvent},
            webhooks::{CanonicalEvent, TranslatedWebhook},
        },
    };
    use uuid::Uuid;

    /// Test adapter with a canned translation; `verify` passes only for the
    /// `"good"` signature.
    struct FakeAdapter {
        payload: fn() -> CanonicalPayload,
    }

    impl GatewayWebhookAdapter for FakeAdapter {
        fn gateway(&self) -> PaymentGateway {
            PaymentGateway::Stripe
        }

        fn verify(&self, _payload: &[u8], signature_header: &str) -> Result<()> {
            if signature_header == "good" {
                Ok(())
            } else {
                Err(anyhow!("bad signature"))
            }
        }

        fn translate(&self, _payload: &[u8]) -> Result<TranslatedWebhook> {
            Ok(TranslatedWebhook {
                event_id: "evt_1".to_string(),
                event_type_raw: "checkout.session.completed".to_string(),
                payload: (self.payload)(),
            })
        }
    }

    fn canonical_checkout() -> CanonicalPayload {
        CanonicalPayload::Event(CanonicalEvent {
            user_id: Uuid::new_v4(),
            plan_type: Some(PlanType::Monthly),
            event_type: SubscriptionEvent::CheckoutCompleted,
            gateway_subscription_id: Some("sub_123".to_string()),
            amount_minor: Some(999),
            occurred_at: Utc::now(),
        })
    }

    fn log_row() -> WebhookEventEntity {
        WebhookEventEntity {
            id: Uuid::new_v4(),
            gateway: "stripe".to_string(),
            event_id: "evt_1".to_string(),
            event_type: "checkout.session.completed".to_string(),
            received_at: Utc::now(),
            processed_at: None,
            outcome: "received".to_string(),
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

    fn applying_subscription_repo() -> MockSubscriptionRepository {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_user_id()
            .returning(|user_id| Ok(Some(free_row(user_id))));
        repo.expect_update_with_version().returning(|_, _, _| {
            let mut updated = free_row(Uuid::new_v4());
            updated.status = "active".to_string();
            updated.version = 1;
            Ok(Some(updated))
        });
        repo
    }

    fn usecase(
        subscription_repo: MockSubscriptionRepository,
        event_repo: MockWebhookEventRepository,
        retry_repo: MockWebhookRetryRepository,
        payload: fn() -> CanonicalPayload,
    ) -> WebhookIngestUseCase<
        MockSubscriptionRepository,
        MockWebhookEventRepository,
        MockWebhookRetryRepository,
    > {
        WebhookIngestUseCase::new(
            Arc::new(SubscriptionLifecycle::new(Arc::new(subscription_repo), 7)),
            Arc::new(event_repo),
            Arc::new(retry_repo),
            vec![Arc::new(FakeAdapter { payload })],
        )
    }

    #[tokio::test]
    async fn a_fresh_event_is_applied_and_recorded() {
        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_insert_if_absent()
            .returning(|_| Ok(Some(log_row())));
        event_repo
            .expect_record_outcome()
            .withf(|_, outcome| outcome == "applied")
            .returning(|_, _| Ok(()));

        let ack = usecase(
            applying_subscription_repo(),
            event_repo,
            MockWebhookRetryRepository::new(),
            canonical_checkout,
        )
        .ingest("stripe", "good", b"{}")
        .await
        .unwrap();

        assert_eq!(ack.outcome, WebhookOutcome::Applied);
        assert!(!ack.duplicate);
    }

    #[tokio::test]
    async fn a_duplicate_delivery_replays_the_recorded_outcome() {
        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_insert_if_absent()
            .returning(|_| Ok(None));
        event_repo.expect_find().returning(|_, _| {
            let mut row = log_row();
            row.outcome = "applied".to_string();
            Ok(Some(row))
        });
        event_repo.expect_record_outcome().times(0);

        // The lifecycle must not run a second time.
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_find_by_user_id().times(0);
        subscription_repo.expect_update_with_version().times(0);

        let ack = usecase(
            subscription_repo,
            event_repo,
            MockWebhookRetryRepository::new(),
            canonical_checkout,
        )
        .ingest("stripe", "good", b"{}")
        .await
        .unwrap();

        assert_eq!(ack.outcome, WebhookOutcome::Applied);
        assert!(ack.duplicate);
    }

    #[tokio::test]
    async fn a_bad_signature_touches_nothing() {
        let mut event_repo = MockWebhookEventRepository::new();
        event_repo.expect_insert_if_absent().times(0);

        let result = usecase(
            MockSubscriptionRepository::new(),
            event_repo,
            MockWebhookRetryRepository::new(),
            canonical_checkout,
        )
        .ingest("stripe", "forged", b"{}")
        .await;

        assert!(matches!(result, Err(WebhookError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn an_unknown_gateway_is_rejected() {
        let result = usecase(
            MockSubscriptionRepository::new(),
            MockWebhookEventRepository::new(),
            MockWebhookRetryRepository::new(),
            canonical_checkout,
        )
        .ingest("braintree", "good", b"{}")
        .await;

        assert!(matches!(result, Err(WebhookError::UnknownGateway)));
    }

    #[tokio::test]
    async fn an_ignored_event_type_is_skipped_but_logged() {
        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_insert_if_absent()
            .returning(|_| Ok(Some(log_row())));
        event_repo
            .expect_record_outcome()
            .withf(|_, outcome| outcome == "skipped")
            .returning(|_, _| Ok(()));

        let ack = usecase(
            MockSubscriptionRepository::new(),
            event_repo,
            MockWebhookRetryRepository::new(),
            || CanonicalPayload::Ignored,
        )
        .ingest("stripe", "good", b"{}")
        .await
        .unwrap();

        assert_eq!(ack.outcome, WebhookOutcome::Skipped);
    }

    #[tokio::test]
    async fn an_apply_failure_is_acked_and_queued_for_retry() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(|_| Err(anyhow!("connection refused")));

        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_insert_if_absent()
            .returning(|_| Ok(Some(log_row())));
        event_repo
            .expect_record_outcome()
            .withf(|_, outcome| outcome == "queued_retry")
            .returning(|_, _| Ok(()));

        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo
            .expect_enqueue()
            .withf(|job| job.status == "queued" && job.attempts == 0)
            .returning(|_| Ok(Uuid::new_v4()));

        let ack = usecase(subscription_repo, event_repo, retry_repo, canonical_checkout)
            .ingest("stripe", "good", b"{}")
            .await
            .unwrap();

        assert_eq!(ack.outcome, WebhookOutcome::QueuedRetry);
    }

    #[tokio::test]
    async fn an_enqueue_failure_surfaces_without_recording_a_terminal_outcome() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(|_| Err(anyhow!("connection refused")));

        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_insert_if_absent()
            .returning(|_| Ok(Some(log_row())));
        // The row must stay `received` so a redelivery can reprocess it.
        event_repo.expect_record_outcome().times(0);

        let mut retry_repo = MockWebhookRetryRepository::new();
        retry_repo
            .expect_enqueue()
            .returning(|_| Err(anyhow!("retry table unavailable")));

        let result = usecase(subscription_repo, event_repo, retry_repo, canonical_checkout)
            .ingest("stripe", "good", b"{}")
            .await;

        assert!(matches!(result, Err(WebhookError::Internal(_))));
    }

    #[tokio::test]
    async fn a_redelivery_of_an_unfinished_event_is_reprocessed() {
        let mut event_repo = MockWebhookEventRepository::new();
        event_repo
            .expect_insert_if_absent()
            .returning(|_| Ok(None));
        // The prior delivery died before reaching a terminal outcome.
        event_repo.expect_find().returning(|_, _| Ok(Some(log_row())));
        event_repo
            .expect_record_outcome()
            .withf(|_, outcome| outcome == "applied")
            .returning(|_, _| Ok(()));

        let ack = usecase(
            applying_subscription_repo(),
            event_repo,
            MockWebhookRetryRepository::new(),
            canonical_checkout,
        )
        .ingest("stripe", "good", b"{}")
        .await
        .unwrap();

        assert_eq!(ack.outcome, WebhookOutcome::Applied);
        assert!(ack.duplicate);
    }
}
