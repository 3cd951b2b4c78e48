use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    repositories::{plans::PlanRepository, quota::QuotaStore, subscriptions::SubscriptionRepository},
    value_objects::{
        entitlements::EntitlementDecision,
        enums::{plan_types::PlanType, subscription_statuses::SubscriptionStatus},
        quota::QuotaConsumption,
        subscriptions::CurrentSubscriptionDto,
    },
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::usecases::subscription_lifecycle::SubscriptionLifecycle;

#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The quota store is unreachable; metered actions fail closed.
    #[error("quota store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EntitlementError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            EntitlementError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EntitlementError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type EntitlementResult<T> = std::result::Result<T, EntitlementError>;

/// The allow/deny façade in front of every metered action. Premium users
/// bypass the counter entirely; everyone else decrements their daily quota.
pub struct EntitlementUseCase<S, P, Q>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    lifecycle: Arc<SubscriptionLifecycle<S>>,
    plan_repo: Arc<P>,
    quota_store: Arc<Q>,
    free_daily_quota: i64,
}

impl<S, P, Q> EntitlementUseCase<S, P, Q>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    pub fn new(
        lifecycle: Arc<SubscriptionLifecycle<S>>,
        plan_repo: Arc<P>,
        quota_store: Arc<Q>,
        free_daily_quota: i64,
    ) -> Self {
        Self {
            lifecycle,
            plan_repo,
            quota_store,
            free_daily_quota,
        }
    }

    /// Atomically spends one unit of today's quota, or answers from the
    /// subscription alone for premium users.
    pub async fn consume(&self, user_id: Uuid) -> EntitlementResult<EntitlementDecision> {
        let current = self.current_or_free(user_id).await;

        if current.is_entitled(Utc::now()) {
            info!(%user_id, status = %current.status, "entitlement: premium bypass");
            return Ok(EntitlementDecision::premium());
        }

        let default_quota = self.daily_quota(current.plan_type).await;

        self.quota_store
            .ensure(user_id, default_quota)
            .await
            .map_err(EntitlementError::StoreUnavailable)?;

        match self
            .quota_store
            .try_consume(user_id, 1)
            .await
            .map_err(EntitlementError::StoreUnavailable)?
        {
            QuotaConsumption::Allowed { remaining } => {
                info!(%user_id, remaining, "entitlement: quota consumed");
                Ok(EntitlementDecision::metered(remaining))
            }
            QuotaConsumption::Denied => {
                info!(%user_id, "entitlement: daily limit reached");
                Ok(EntitlementDecision::limit_reached(0))
            }
        }
    }

    /// Read-only variant; never mutates the counter.
    pub async fn check(&self, user_id: Uuid) -> EntitlementResult<EntitlementDecision> {
        let current = self.current_or_free(user_id).await;

        if current.is_entitled(Utc::now()) {
            return Ok(EntitlementDecision::premium());
        }

        let default_quota = self.daily_quota(current.plan_type).await;

        let snapshot = self
            .quota_store
            .peek(user_id)
            .await
            .map_err(EntitlementError::StoreUnavailable)?;

        let decision = match snapshot {
            Some(snapshot) if snapshot.remaining > 0 => {
                EntitlementDecision::metered(snapshot.remaining)
            }
            Some(snapshot) => EntitlementDecision::limit_reached(snapshot.remaining.max(0)),
            // No counter yet today; the user has their full allowance.
            None => EntitlementDecision::metered(default_quota),
        };

        Ok(decision)
    }

    /// A registry read failure downgrades the caller to the free tier rather
    /// than blocking them or handing out unlimited access.
    async fn current_or_free(&self, user_id: Uuid) -> CurrentSubscriptionDto {
        match self.lifecycle.get_current(user_id).await {
            Ok(current) => current,
            Err(err) => {
                warn!(
                    %user_id,
                    error = %err,
                    "entitlement: registry read failed, degrading to free tier"
                );
                CurrentSubscriptionDto {
                    plan_type: PlanType::Free,
                    status: SubscriptionStatus::Free,
                    started_at: Utc::now(),
                    expires_at: None,
                    auto_renew: false,
                    canceled_at: None,
                }
            }
        }
    }

    async fn daily_quota(&self, plan_type: PlanType) -> i64 {
        match self.plan_repo.find_by_plan_type(plan_type.to_string()).await {
            Ok(Some(plan)) => i64::from(plan.daily_message_quota),
            Ok(None) => {
                warn!(%plan_type, "entitlement: no plan row, using configured default");
                self.free_daily_quota
            }
            Err(err) => {
                warn!(
                    %plan_type,
                    error = %err,
                    "entitlement: plan lookup failed, using configured default"
                );
                self.free_daily_quota
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::Duration;
    use crates::domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::{
            plans::MockPlanRepository, quota::MockQuotaStore,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::{entitlements::EntitlementReason, quota::QuotaSnapshot},
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Deterministic stand-in for the TTL store; mirrors its floor-at-zero
    /// and create-on-demand semantics without a network.
    struct InMemoryQuota {
        cells: Mutex<HashMap<Uuid, i64>>,
    }

    impl InMemoryQuota {
        fn new() -> Self {
            Self {
                cells: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl QuotaStore for InMemoryQuota {
        async fn ensure(&self, user_id: Uuid, default_amount: i64) -> Result<i64> {
            let mut cells = self.cells.lock().unwrap();
            Ok(*cells.entry(user_id).or_insert(default_amount))
        }

        async fn try_consume(&self, user_id: Uuid, amount: i64) -> Result<QuotaConsumption> {
            let mut cells = self.cells.lock().unwrap();
            let Some(remaining) = cells.get_mut(&user_id) else {
                return Ok(QuotaConsumption::Denied);
            };
            if *remaining < amount {
                return Ok(QuotaConsumption::Denied);
            }
            *remaining -= amount;
            Ok(QuotaConsumption::Allowed {
                remaining: *remaining,
            })
        }

        async fn grant(&self, user_id: Uuid, default_amount: i64, amount: i64) -> Result<i64> {
            let mut cells = self.cells.lock().unwrap();
            let remaining = cells
                .entry(user_id)
                .and_modify(|v| *v += amount)
                .or_insert(default_amount + amount);
            Ok(*remaining)
        }

        async fn peek(&self, user_id: Uuid) -> Result<Option<QuotaSnapshot>> {
            let cells = self.cells.lock().unwrap();
            Ok(cells.get(&user_id).map(|remaining| QuotaSnapshot {
                remaining: *remaining,
                ttl_seconds: 60,
            }))
        }
    }

    fn no_subscription_repo() -> MockSubscriptionRepository {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_user_id()
            .returning(|_| Ok(None));
        repo
    }

    fn free_plan_repo(quota: i32) -> MockPlanRepository {
        let mut repo = MockPlanRepository::new();
        repo.expect_find_by_plan_type().returning(move |_| {
            Ok(Some(crates::domain::entities::plans::PlanEntity {
                id: Uuid::new_v4(),
                plan_type: "free".to_string(),
                name: "Free".to_string(),
                daily_message_quota: quota,
                price_minor: 0,
                currency: "usd".to_string(),
                is_active: true,
                created_at: Utc::now(),
            }))
        });
        repo
    }

    fn active_row(user_id: Uuid, expires_in: Duration) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_type: "monthly".to_string(),
            status: "active".to_string(),
            payment_gateway: Some("stripe".to_string()),
            gateway_subscription_id: Some("sub_123".to_string()),
            started_at: now,
            expires_at: Some(now + expires_in),
            last_payment_at: Some(now),
            next_payment_at: Some(now + expires_in),
            auto_renew: true,
            canceled_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn usecase_with<S>(
        subscription_repo: S,
        quota_store: Arc<InMemoryQuota>,
        daily_quota: i32,
    ) -> EntitlementUseCase<S, MockPlanRepository, InMemoryQuota>
    where
        S: SubscriptionRepository + Send + Sync + 'static,
    {
        EntitlementUseCase::new(
            Arc::new(SubscriptionLifecycle::new(Arc::new(subscription_repo), 7)),
            Arc::new(free_plan_repo(daily_quota)),
            quota_store,
            20,
        )
    }

    #[tokio::test]
    async fn free_user_is_metered_down_to_zero_then_denied() {
        let user_id = Uuid::new_v4();
        let quota = Arc::new(InMemoryQuota::new());
        let usecase = usecase_with(no_subscription_repo(), Arc::clone(&quota), 3);

        for expected_remaining in [2, 1, 0] {
            let decision = usecase.consume(user_id).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, Some(expected_remaining));
        }

        let denied = usecase.consume(user_id).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.reason, EntitlementReason::LimitReached);
        assert_eq!(denied.remaining, Some(0));

        // The counter never goes negative, even when hammered.
        assert_eq!(quota.peek(user_id).await.unwrap().unwrap().remaining, 0);
    }

    #[tokio::test]
    async fn premium_user_bypasses_the_counter() {
        let user_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(move |_| {
                Ok(Some(active_row(user_id, Duration::days(10))))
            });

        let mut quota_store = MockQuotaStore::new();
        quota_store.expect_ensure().times(0);
        quota_store.expect_try_consume().times(0);

        let usecase = EntitlementUseCase::new(
            Arc::new(SubscriptionLifecycle::new(Arc::new(subscription_repo), 7)),
            Arc::new(free_plan_repo(20)),
            Arc::new(quota_store),
            20,
        );

        let decision = usecase.consume(user_id).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.unlimited);
        assert_eq!(decision.reason, EntitlementReason::Subscription);
    }

    #[tokio::test]
    async fn stale_premium_row_past_expiry_is_metered() {
        let user_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(move |_| {
                Ok(Some(active_row(user_id, Duration::days(-1))))
            });

        let quota = Arc::new(InMemoryQuota::new());
        let usecase = usecase_with(subscription_repo, Arc::clone(&quota), 5);

        let decision = usecase.consume(user_id).await.unwrap();
        assert!(!decision.unlimited);
        assert_eq!(decision.remaining, Some(4));
    }

    #[tokio::test]
    async fn registry_failure_degrades_to_the_free_tier() {
        let user_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user_id()
            .returning(|_| Err(anyhow!("connection refused")));

        let quota = Arc::new(InMemoryQuota::new());
        let usecase = usecase_with(subscription_repo, Arc::clone(&quota), 3);

        let decision = usecase.consume(user_id).await.unwrap();
        assert!(decision.allowed);
        assert!(!decision.unlimited);
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let user_id = Uuid::new_v4();
        let mut quota_store = MockQuotaStore::new();
        quota_store
            .expect_ensure()
            .returning(|_, _| Err(anyhow!("timed out")));

        let usecase = EntitlementUseCase::new(
            Arc::new(SubscriptionLifecycle::new(
                Arc::new(no_subscription_repo()),
                7,
            )),
            Arc::new(free_plan_repo(20)),
            Arc::new(quota_store),
            20,
        );

        let result = usecase.consume(user_id).await;
        assert!(matches!(result, Err(EntitlementError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn check_reports_the_full_allowance_before_first_use() {
        let user_id = Uuid::new_v4();
        let quota = Arc::new(InMemoryQuota::new());
        let usecase = usecase_with(no_subscription_repo(), Arc::clone(&quota), 3);

        let decision = usecase.check(user_id).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, Some(3));

        // And check never spends quota.
        let again = usecase.check(user_id).await.unwrap();
        assert_eq!(again.remaining, Some(3));
    }
}
