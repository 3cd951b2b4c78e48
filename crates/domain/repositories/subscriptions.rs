use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{
    InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    /// Inserts the row unless the user already has one (unique `user_id`);
    /// either way returns the row now present.
    async fn create_if_absent(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Applies `changes` only when the stored `version` still equals
    /// `expected_version`, bumping the version in the same statement.
    /// Returns `None` when another writer got there first.
    async fn update_with_version(
        &self,
        id: Uuid,
        expected_version: i32,
        changes: UpdateSubscriptionEntity,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Bounded batch of subscriptions in the given statuses whose term has
    /// elapsed; consumed by the reconciliation sweeper.
    async fn list_expiring(
        &self,
        statuses: Vec<String>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SubscriptionEntity>>;
}
