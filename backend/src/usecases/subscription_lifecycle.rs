use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Duration, Utc};
use crates::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        enums::{
            payment_gateways::PaymentGateway, plan_types::PlanType,
            subscription_events::SubscriptionEvent, subscription_statuses::SubscriptionStatus,
        },
        subscriptions::CurrentSubscriptionDto,
        webhooks::CanonicalEvent,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// How many times a version conflict is retried before the event is handed
/// back to the caller's retry path.
const MAX_VERSION_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("subscription was modified concurrently")]
    ConcurrentModification,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LifecycleError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            LifecycleError::ConcurrentModification => StatusCode::CONFLICT,
            LifecycleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        status: SubscriptionStatus,
    },
    /// The event has no edge from the record's current status; nothing was
    /// written.
    Unhandled {
        status: SubscriptionStatus,
        event: SubscriptionEvent,
    },
}

/// Single writer seam for the subscription registry. Every mutation goes
/// through the transition table and an optimistic version check; callers
/// never write subscription rows directly.
pub struct SubscriptionLifecycle<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    grace_period_days: i64,
}

impl<S> SubscriptionLifecycle<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, grace_period_days: i64) -> Self {
        Self {
            subscription_repo,
            grace_period_days,
        }
    }

    pub async fn apply_event(
        &self,
        event: &CanonicalEvent,
        gateway: Option<PaymentGateway>,
    ) -> LifecycleResult<ApplyOutcome> {
        for attempt in 0..MAX_VERSION_RETRIES {
            let subscription = self.load_or_create(event.user_id).await?;
            let current = SubscriptionStatus::from_str(&subscription.status);

            let Some(next) = current.apply(event.event_type) else {
                warn!(
                    user_id = %event.user_id,
                    status = %current,
                    event = %event.event_type,
                    "lifecycle: no transition for event, leaving record untouched"
                );
                return Ok(ApplyOutcome::Unhandled {
                    status: current,
                    event: event.event_type,
                });
            };

            let changes = self.build_changes(&subscription, event, gateway, next)?;

            match self
                .subscription_repo
                .update_with_version(subscription.id, subscription.version, changes)
                .await?
            {
                Some(updated) => {
                    info!(
                        user_id = %event.user_id,
                        event = %event.event_type,
                        from = %current,
                        to = %next,
                        version = updated.version,
                        "lifecycle: event applied"
                    );
                    return Ok(ApplyOutcome::Applied { status: next });
                }
                None => {
                    warn!(
                        user_id = %event.user_id,
                        event = %event.event_type,
                        attempt,
                        "lifecycle: version conflict, reloading"
                    );
                }
            }
        }

        error!(
            user_id = %event.user_id,
            event = %event.event_type,
            "lifecycle: version conflict persisted past retry budget"
        );
        Err(LifecycleError::ConcurrentModification)
    }

    pub async fn get_current(&self, user_id: Uuid) -> LifecycleResult<CurrentSubscriptionDto> {
        let subscription = self.subscription_repo.find_by_user_id(user_id).await?;

        match subscription {
            Some(subscription) => Ok(CurrentSubscriptionDto::from(&subscription)),
            // Users without a row are on the free tier; the row is only
            // materialized once their first lifecycle event arrives.
            None => Ok(CurrentSubscriptionDto {
                plan_type: PlanType::Free,
                status: SubscriptionStatus::Free,
                started_at: Utc::now(),
                expires_at: None,
                auto_renew: false,
                canceled_at: None,
            }),
        }
    }

    /// True iff the user currently holds an unexpired premium tier.
    pub async fn is_entitled(&self, user_id: Uuid) -> LifecycleResult<bool> {
        let current = self.get_current(user_id).await?;
        Ok(current.is_entitled(Utc::now()))
    }

    async fn load_or_create(&self, user_id: Uuid) -> LifecycleResult<SubscriptionEntity> {
        if let Some(subscription) = self.subscription_repo.find_by_user_id(user_id).await? {
            return Ok(subscription);
        }

        let created = self
            .subscription_repo
            .create_if_absent(InsertSubscriptionEntity::free(user_id, Utc::now()))
            .await?;

        Ok(created)
    }

    fn build_changes(
        &self,
        subscription: &SubscriptionEntity,
        event: &CanonicalEvent,
        gateway: Option<PaymentGateway>,
        next: SubscriptionStatus,
    ) -> LifecycleResult<UpdateSubscriptionEntity> {
        let mut changes = UpdateSubscriptionEntity {
            status: Some(next.to_string()),
            ..Default::default()
        };

        match event.event_type {
            SubscriptionEvent::CheckoutCompleted => {
                let plan_type = event
                    .plan_type
                    .ok_or_else(|| anyhow!("checkout event without a plan type"))?;
                let period = plan_type
                    .period_days()
                    .ok_or_else(|| anyhow!("checkout event for a plan without a term"))?;
                let expires_at = event.occurred_at + Duration::days(period);

                changes.plan_type = Some(plan_type.to_string());
                changes.payment_gateway = gateway.map(|g| g.to_string());
                changes.gateway_subscription_id = event.gateway_subscription_id.clone();
                changes.started_at = Some(event.occurred_at);
                changes.expires_at = Some(expires_at);
                changes.last_payment_at = Some(event.occurred_at);
                changes.next_payment_at = Some(expires_at);
                changes.auto_renew = Some(true);
            }
            SubscriptionEvent::TrialConverted | SubscriptionEvent::PaymentSucceeded => {
                // A renewal extends from the payment timestamp; the plan may
                // change when the event carries one.
                let plan_type = event.plan_type.unwrap_or(
                    PlanType::from_str(&subscription.plan_type).unwrap_or_default(),
                );
                let period = plan_type
                    .period_days()
                    .ok_or_else(|| anyhow!("payment event on a plan without a term"))?;
                let expires_at = event.occurred_at + Duration::days(period);

                changes.plan_type = Some(plan_type.to_string());
                changes.payment_gateway = gateway.map(|g| g.to_string());
                changes.gateway_subscription_id = event.gateway_subscription_id.clone();
                changes.expires_at = Some(expires_at);
                changes.last_payment_at = Some(event.occurred_at);
                changes.next_payment_at = Some(expires_at);
                changes.auto_renew = Some(true);
            }
            SubscriptionEvent::PaymentFailed => {
                changes.expires_at =
                    Some(event.occurred_at + Duration::days(self.grace_period_days));
            }
            SubscriptionEvent::UserCanceled => {
                changes.auto_renew = Some(false);
                changes.canceled_at = Some(event.occurred_at);
            }
            SubscriptionEvent::TrialExpired
            | SubscriptionEvent::TermElapsed
            | SubscriptionEvent::GraceElapsed => {
                changes.auto_renew = Some(false);
            }
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::subscriptions::MockSubscriptionRepository;
    use mockall::predicate::eq;

    fn checkout_event(user_id: Uuid) -> CanonicalEvent {
        CanonicalEvent {
            user_id,
            plan_type: Some(PlanType::Monthly),
            event_type: SubscriptionEvent::CheckoutCompleted,
            gateway_subscription_id: Some("sub_123".to_string()),
            amount_minor: Some(999),
            occurred_at: Utc::now(),
        }
    }

    fn free_row(user_id: Uuid, version: i32) -> SubscriptionEntity {
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
            version,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn checkout_creates_the_row_and_activates_a_fresh_user() {
        let user_id = Uuid::new_v4();
        let mut repo = MockSubscriptionRepository::new();

        repo.expect_find_by_user_id()
            .with(eq(user_id))
            .returning(|_| Ok(None));
        repo.expect_create_if_absent()
            .returning(move |_| Ok(free_row(user_id, 0)));
        repo.expect_update_with_version()
            .withf(|_, expected_version, changes| {
                *expected_version == 0
                    && changes.status.as_deref() == Some("active")
                    && changes.plan_type.as_deref() == Some("monthly")
                    && changes.auto_renew == Some(true)
            })
            .returning(move |_, _, _| {
                let mut updated = free_row(user_id, 1);
                updated.status = "active".to_string();
                Ok(Some(updated))
            });

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        let outcome = lifecycle
            .apply_event(&checkout_event(user_id), Some(PaymentGateway::Stripe))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                status: SubscriptionStatus::Active
            }
        );
    }

    #[tokio::test]
    async fn version_conflict_is_retried_with_the_reloaded_row() {
        let user_id = Uuid::new_v4();
        let mut repo = MockSubscriptionRepository::new();

        repo.expect_find_by_user_id()
            .times(2)
            .returning(move |_| Ok(Some(free_row(user_id, 3))));
        let mut conflicted_once = false;
        repo.expect_update_with_version()
            .times(2)
            .returning(move |_, _, _| {
                let first = !conflicted_once;
                conflicted_once = true;
                if first {
                    Ok(None)
                } else {
                    let mut updated = free_row(user_id, 4);
                    updated.status = "active".to_string();
                    Ok(Some(updated))
                }
            });

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        let outcome = lifecycle
            .apply_event(&checkout_event(user_id), Some(PaymentGateway::Stripe))
            .await
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn persistent_conflict_exhausts_the_retry_budget() {
        let user_id = Uuid::new_v4();
        let mut repo = MockSubscriptionRepository::new();

        repo.expect_find_by_user_id()
            .times(3)
            .returning(move |_| Ok(Some(free_row(user_id, 3))));
        repo.expect_update_with_version()
            .times(3)
            .returning(|_, _, _| Ok(None));

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        let result = lifecycle
            .apply_event(&checkout_event(user_id), Some(PaymentGateway::Stripe))
            .await;

        assert!(matches!(
            result,
            Err(LifecycleError::ConcurrentModification)
        ));
    }

    #[tokio::test]
    async fn undefined_edge_is_unhandled_and_writes_nothing() {
        let user_id = Uuid::new_v4();
        let mut repo = MockSubscriptionRepository::new();

        repo.expect_find_by_user_id()
            .returning(move |_| Ok(Some(free_row(user_id, 0))));
        repo.expect_update_with_version().times(0);

        let event = CanonicalEvent {
            event_type: SubscriptionEvent::PaymentSucceeded,
            plan_type: None,
            ..checkout_event(user_id)
        };

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        let outcome = lifecycle.apply_event(&event, None).await.unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Unhandled {
                status: SubscriptionStatus::Free,
                event: SubscriptionEvent::PaymentSucceeded,
            }
        );
    }

    #[tokio::test]
    async fn payment_failed_moves_expiry_to_the_grace_deadline() {
        let user_id = Uuid::new_v4();
        let occurred_at = Utc::now();
        let mut repo = MockSubscriptionRepository::new();

        repo.expect_find_by_user_id().returning(move |_| {
            let mut row = free_row(user_id, 2);
            row.status = "active".to_string();
            row.plan_type = "monthly".to_string();
            Ok(Some(row))
        });
        repo.expect_update_with_version()
            .withf(move |_, _, changes| {
                changes.status.as_deref() == Some("past_due")
                    && changes.expires_at == Some(occurred_at + Duration::days(7))
            })
            .returning(move |_, _, _| {
                let mut updated = free_row(user_id, 3);
                updated.status = "past_due".to_string();
                Ok(Some(updated))
            });

        let event = CanonicalEvent {
            event_type: SubscriptionEvent::PaymentFailed,
            plan_type: None,
            occurred_at,
            ..checkout_event(user_id)
        };

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        let outcome = lifecycle.apply_event(&event, None).await.unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                status: SubscriptionStatus::PastDue
            }
        );
    }

    #[tokio::test]
    async fn an_active_row_past_its_expiry_is_not_entitled() {
        let user_id = Uuid::new_v4();
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_user_id().returning(move |_| {
            let mut row = free_row(user_id, 1);
            row.status = "active".to_string();
            row.plan_type = "monthly".to_string();
            row.expires_at = Some(Utc::now() - Duration::days(1));
            Ok(Some(row))
        });

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        assert!(!lifecycle.is_entitled(user_id).await.unwrap());
    }

    #[tokio::test]
    async fn missing_row_reads_as_the_free_tier() {
        let user_id = Uuid::new_v4();
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_user_id()
            .returning(|_| Ok(None));

        let lifecycle = SubscriptionLifecycle::new(Arc::new(repo), 7);
        let current = lifecycle.get_current(user_id).await.unwrap();

        assert_eq!(current.plan_type, PlanType::Free);
        assert_eq!(current.status, SubscriptionStatus::Free);
        assert!(current.expires_at.is_none());
    }
}
