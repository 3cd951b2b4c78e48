use std::sync::Arc;

use anyhow::Result;
use crates::domain::{
    repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
    value_objects::subscriptions::{CurrentSubscriptionDto, PlanDto},
};
use tracing::info;
use uuid::Uuid;

use crate::usecases::subscription_lifecycle::{LifecycleResult, SubscriptionLifecycle};

/// Read side of the registry: plan catalog and the caller's own record.
pub struct SubscriptionQueryUseCase<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    lifecycle: Arc<SubscriptionLifecycle<S>>,
    plan_repo: Arc<P>,
}

impl<S, P> SubscriptionQueryUseCase<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(lifecycle: Arc<SubscriptionLifecycle<S>>, plan_repo: Arc<P>) -> Self {
        Self {
            lifecycle,
            plan_repo,
        }
    }

    pub async fn list_plans(&self) -> Result<Vec<PlanDto>> {
        let plans = self.plan_repo.list_active_plans().await?;
        info!(plan_count = plans.len(), "subscriptions: active plans loaded");
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn get_current(&self, user_id: Uuid) -> LifecycleResult<CurrentSubscriptionDto> {
        self.lifecycle.get_current(user_id).await
    }
}
