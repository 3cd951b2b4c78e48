use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::ad_rewards::{AdRewardEntity, InsertAdRewardEntity};

#[automock]
#[async_trait]
pub trait AdRewardRepository {
    async fn count_views_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64>;

    async fn insert_view(
        &self,
        insert_ad_reward_entity: InsertAdRewardEntity,
    ) -> Result<AdRewardEntity>;

    async fn find_by_request_token(
        &self,
        user_id: Uuid,
        request_token: String,
    ) -> Result<Option<AdRewardEntity>>;
}
