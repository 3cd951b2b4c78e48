use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{plan_types::PlanType, subscription_events::SubscriptionEvent};

/// The single normalized event shape every gateway adapter produces.
/// Serialized as-is into the retry queue, so it must round-trip through JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalEvent {
    pub user_id: Uuid,
    pub plan_type: Option<PlanType>,
    pub event_type: SubscriptionEvent,
    pub gateway_subscription_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// What an adapter managed to extract from one raw delivery.
#[derive(Debug)]
pub enum CanonicalPayload {
    /// A supported event, fully translated.
    Event(CanonicalEvent),
    /// A recognized gateway event type this subsystem deliberately ignores.
    Ignored,
    /// A supported event type whose payload is missing required fields.
    Invalid(String),
}

#[derive(Debug)]
pub struct TranslatedWebhook {
    pub event_id: String,
    pub event_type_raw: String,
    pub payload: CanonicalPayload,
}
