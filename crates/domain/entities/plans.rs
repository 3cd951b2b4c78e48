use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::plans;

/// Static reference data; read-only to this subsystem.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub plan_type: String,
    pub name: String,
    pub daily_message_quota: i32,
    pub price_minor: i32,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
