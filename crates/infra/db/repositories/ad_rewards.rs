use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, dsl::count_star, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::ad_reward_entries},
};
use domain::{
    entities::ad_rewards::{AdRewardEntity, InsertAdRewardEntity},
    repositories::ad_rewards::AdRewardRepository,
};

pub struct AdRewardPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AdRewardPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AdRewardRepository for AdRewardPostgres {
    async fn count_views_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = ad_reward_entries::table
            .filter(ad_reward_entries::user_id.eq(user_id))
            .filter(ad_reward_entries::watched_at.ge(from))
            .filter(ad_reward_entries::watched_at.lt(to))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(count)
    }

    async fn insert_view(
        &self,
        insert_ad_reward_entity: InsertAdRewardEntity,
    ) -> Result<AdRewardEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(ad_reward_entries::table)
            .values(&insert_ad_reward_entity)
            .returning(AdRewardEntity::as_select())
            .get_result::<AdRewardEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_request_token(
        &self,
        user_id: Uuid,
        request_token: String,
    ) -> Result<Option<AdRewardEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = ad_reward_entries::table
            .filter(ad_reward_entries::user_id.eq(user_id))
            .filter(ad_reward_entries::request_token.eq(request_token))
            .select(AdRewardEntity::as_select())
            .first::<AdRewardEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
