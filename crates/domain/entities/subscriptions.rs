use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    plan_types::PlanType, subscription_statuses::SubscriptionStatus,
};
use crate::infra::db::postgres::schema::subscriptions;

/// One row per user, never deleted; `version` is the optimistic-concurrency
/// token bumped on every mutation.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub payment_gateway: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub next_payment_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub auto_renew: bool,
    pub version: i32,
}

impl InsertSubscriptionEntity {
    /// The record every user starts from when nothing is persisted yet.
    pub fn free(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            plan_type: PlanType::Free.to_string(),
            status: SubscriptionStatus::Free.to_string(),
            started_at: now,
            auto_renew: false,
            version: 0,
        }
    }
}

/// Partial update applied under a version check; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct UpdateSubscriptionEntity {
    pub plan_type: Option<String>,
    pub status: Option<String>,
    pub payment_gateway: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub next_payment_at: Option<DateTime<Utc>>,
    pub auto_renew: Option<bool>,
    pub canceled_at: Option<DateTime<Utc>>,
}
