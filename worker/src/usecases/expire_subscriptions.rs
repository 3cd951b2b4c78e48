use std::sync::Arc;

use anyhow::Result;
use backend::usecases::subscription_lifecycle::{ApplyOutcome, SubscriptionLifecycle};
use chrono::Utc;
use crates::domain::{
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        enums::{
            subscription_events::SubscriptionEvent, subscription_statuses::SubscriptionStatus,
        },
        webhooks::CanonicalEvent,
    },
};
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Periodic backstop for terms that lapse without any webhook arriving.
/// Every expiry goes through the same transition table as live events, so
/// the sweeper can never invent a state a webhook could not produce.
pub struct ExpireSubscriptionsUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    lifecycle: Arc<SubscriptionLifecycle<S>>,
    batch_size: i64,
}

impl<S> ExpireSubscriptionsUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        lifecycle: Arc<SubscriptionLifecycle<S>>,
        batch_size: i64,
    ) -> Self {
        Self {
            subscription_repo,
            lifecycle,
            batch_size,
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepStats> {
        let now = Utc::now();
        let statuses = vec![
            SubscriptionStatus::Trial.to_string(),
            SubscriptionStatus::Active.to_string(),
            SubscriptionStatus::PastDue.to_string(),
            SubscriptionStatus::Canceled.to_string(),
        ];

        let batch = self
            .subscription_repo
            .list_expiring(statuses, now, self.batch_size)
            .await?;

        let mut stats = SweepStats {
            scanned: batch.len(),
            ..Default::default()
        };

        for subscription in batch {
            let status = SubscriptionStatus::from_str(&subscription.status);
            let event_type = match status {
                SubscriptionStatus::Trial => SubscriptionEvent::TrialExpired,
                SubscriptionStatus::Active | SubscriptionStatus::Canceled => {
                    SubscriptionEvent::TermElapsed
                }
                SubscriptionStatus::PastDue => SubscriptionEvent::GraceElapsed,
                // Concurrent writer already moved the row out of scope.
                _ => continue,
            };

            let event = CanonicalEvent {
                user_id: subscription.user_id,
                plan_type: None,
                event_type,
                gateway_subscription_id: subscription.gateway_subscription_id.clone(),
                amount_minor: None,
                occurred_at: subscription.expires_at.unwrap_or(now),
            };

            match self.lifecycle.apply_event(&event, None).await {
                Ok(ApplyOutcome::Applied { .. }) => {
                    info!(
                        user_id = %subscription.user_id,
                        from = %status,
                        event = %event_type,
                        "sweeper: subscription expired"
                    );
                    stats.expired += 1;
                }
                Ok(ApplyOutcome::Unhandled { status, event }) => {
                    // The row changed between the batch read and the apply;
                    // the next sweep will see its new shape.
                    warn!(
                        user_id = %subscription.user_id,
                        %status,
                        %event,
                        "sweeper: row moved under us, skipping"
                    );
                }
                Err(err) => {
                    error!(
                        user_id = %subscription.user_id,
                        error = %err,
                        "sweeper: failed to expire subscription"
                    );
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}
