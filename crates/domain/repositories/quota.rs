use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::quota::{QuotaConsumption, QuotaSnapshot};

/// Per-user-per-UTC-day counter in a TTL-capable store. Every mutation is a
/// single atomic round trip; there is deliberately no read-then-write API.
#[automock]
#[async_trait]
pub trait QuotaStore {
    /// Creates today's counter at `default_amount` with a TTL ending at the
    /// next UTC midnight if absent; no-op otherwise. Returns the remaining
    /// value either way.
    async fn ensure(&self, user_id: Uuid, default_amount: i64) -> Result<i64>;

    /// Decrements by `amount` only if the result stays >= 0, otherwise leaves
    /// the counter untouched and reports `Denied`.
    async fn try_consume(&self, user_id: Uuid, amount: i64) -> Result<QuotaConsumption>;

    /// Increments by `amount`, creating the counter at
    /// `default_amount + amount` (with the midnight TTL) when absent, so a
    /// grant never extends into the next day.
    async fn grant(&self, user_id: Uuid, default_amount: i64, amount: i64) -> Result<i64>;

    /// Read-only; `None` when no counter exists for today yet.
    async fn peek(&self, user_id: Uuid) -> Result<Option<QuotaSnapshot>>;
}
