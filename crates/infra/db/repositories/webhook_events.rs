use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::webhook_events},
};
use domain::{
    entities::webhook_events::{InsertWebhookEventEntity, WebhookEventEntity},
    repositories::webhook_events::WebhookEventRepository,
};

pub struct WebhookEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl WebhookEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WebhookEventRepository for WebhookEventPostgres {
    async fn insert_if_absent(
        &self,
        insert_webhook_event_entity: InsertWebhookEventEntity,
    ) -> Result<Option<WebhookEventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Concurrent duplicate deliveries race on the unique key; exactly one
        // insert wins and the rest observe a conflict.
        let result = insert_into(webhook_events::table)
            .values(&insert_webhook_event_entity)
            .on_conflict((webhook_events::gateway, webhook_events::event_id))
            .do_nothing()
            .returning(WebhookEventEntity::as_select())
            .get_result::<WebhookEventEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find(&self, gateway: String, event_id: String) -> Result<Option<WebhookEventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = webhook_events::table
            .filter(webhook_events::gateway.eq(gateway))
            .filter(webhook_events::event_id.eq(event_id))
            .select(WebhookEventEntity::as_select())
            .first::<WebhookEventEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn record_outcome(&self, id: Uuid, outcome: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(webhook_events::table.find(id))
            .set((
                webhook_events::outcome.eq(outcome),
                webhook_events::processed_at.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
