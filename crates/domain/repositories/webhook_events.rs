use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::webhook_events::{InsertWebhookEventEntity, WebhookEventEntity};

#[automock]
#[async_trait]
pub trait WebhookEventRepository {
    /// Inserts under the `(gateway, event_id)` unique constraint; returns
    /// `None` when the key is already present. This is the dedupe primitive —
    /// the guarantee lives in the database, not in process memory.
    async fn insert_if_absent(
        &self,
        insert_webhook_event_entity: InsertWebhookEventEntity,
    ) -> Result<Option<WebhookEventEntity>>;

    async fn find(&self, gateway: String, event_id: String) -> Result<Option<WebhookEventEntity>>;

    /// Stamps `processed_at` and the terminal outcome on the log row.
    async fn record_outcome(&self, id: Uuid, outcome: String) -> Result<()>;
}
