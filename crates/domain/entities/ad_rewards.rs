use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::ad_reward_entries;

/// Append-only ledger entry; immutable once written.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = ad_reward_entries)]
pub struct AdRewardEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ad_type: String,
    pub reward_type: String,
    pub reward_value: i32,
    pub request_token: Option<String>,
    pub watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ad_reward_entries)]
pub struct InsertAdRewardEntity {
    pub user_id: Uuid,
    pub ad_type: String,
    pub reward_type: String,
    pub reward_value: i32,
    pub request_token: Option<String>,
    pub watched_at: DateTime<Utc>,
}
