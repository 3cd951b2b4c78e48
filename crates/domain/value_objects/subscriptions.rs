use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::{plan_types::PlanType, subscription_statuses::SubscriptionStatus};
use crate::domain::entities::{plans::PlanEntity, subscriptions::SubscriptionEntity};

#[derive(Debug, Clone, Serialize)]
pub struct PlanDto {
    pub id: Uuid,
    pub plan_type: PlanType,
    pub name: String,
    pub daily_message_quota: i32,
    pub price_minor: i32,
    pub currency: String,
}

impl From<PlanEntity> for PlanDto {
    fn from(plan: PlanEntity) -> Self {
        Self {
            plan_type: PlanType::from_str(&plan.plan_type).unwrap_or_default(),
            id: plan.id,
            name: plan.name,
            daily_message_quota: plan.daily_message_quota,
            price_minor: plan.price_minor,
            currency: plan.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubscriptionDto {
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl CurrentSubscriptionDto {
    /// Unlimited access iff the tier is premium and the paid term has not
    /// lapsed. A stale premium row past `expires_at` reads as not entitled
    /// even before the sweeper has flipped it.
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        self.status.is_premium() && self.expires_at.is_none_or(|t| t > now)
    }
}

impl From<&SubscriptionEntity> for CurrentSubscriptionDto {
    fn from(subscription: &SubscriptionEntity) -> Self {
        Self {
            plan_type: PlanType::from_str(&subscription.plan_type).unwrap_or_default(),
            status: SubscriptionStatus::from_str(&subscription.status),
            started_at: subscription.started_at,
            expires_at: subscription.expires_at,
            auto_renew: subscription.auto_renew,
            canceled_at: subscription.canceled_at,
        }
    }
}
