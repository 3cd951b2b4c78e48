use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{
        payment_gateways::PaymentGateway, plan_types::PlanType,
        subscription_events::SubscriptionEvent,
    },
    webhooks::{CanonicalEvent, CanonicalPayload, TranslatedWebhook},
};
use crate::payments::GatewayWebhookAdapter;

type HmacSha256 = Hmac<Sha256>;

/// Inbound-only Paddle (Billing API) adapter. Signature scheme:
/// `Paddle-Signature: ts=<ts>;h1=<hex hmac over "<ts>:<body>">`.
pub struct PaddleWebhookAdapter {
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct PaddleEvent {
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub data: PaddleEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaddleEventData {
    pub id: Option<String>,
    pub subscription_id: Option<String>,
    pub custom_data: Option<PaddleCustomData>,
    pub details: Option<PaddleDetails>,
}

#[derive(Debug, Deserialize)]
pub struct PaddleCustomData {
    pub user_id: Option<String>,
    pub plan_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaddleDetails {
    pub totals: Option<PaddleTotals>,
}

#[derive(Debug, Deserialize)]
pub struct PaddleTotals {
    /// Paddle serializes monetary totals as strings of minor units.
    pub total: Option<String>,
}

impl PaddleWebhookAdapter {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }

    fn custom_user_id(data: &PaddleEventData) -> Result<Uuid> {
        data.custom_data
            .as_ref()
            .and_then(|custom| custom.user_id.as_deref())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| anyhow!("missing user_id in custom_data"))
    }

    fn custom_plan_type(data: &PaddleEventData) -> Option<PlanType> {
        data.custom_data
            .as_ref()
            .and_then(|custom| custom.plan_type.as_deref())
            .and_then(PlanType::from_str)
    }

    fn amount_minor(data: &PaddleEventData) -> Option<i64> {
        data.details
            .as_ref()
            .and_then(|details| details.totals.as_ref())
            .and_then(|totals| totals.total.as_deref())
            .and_then(|total| total.parse::<i64>().ok())
    }

    fn translate_event(
        event_type: SubscriptionEvent,
        data: &PaddleEventData,
        occurred_at: DateTime<Utc>,
    ) -> Result<CanonicalEvent> {
        let user_id = Self::custom_user_id(data)?;
        let plan_type = Self::custom_plan_type(data);
        if event_type == SubscriptionEvent::CheckoutCompleted && plan_type.is_none() {
            anyhow::bail!("missing plan_type in custom_data");
        }

        // Transaction events carry the subscription under `subscription_id`,
        // subscription events under `id`.
        let gateway_subscription_id = data.subscription_id.clone().or_else(|| data.id.clone());

        Ok(CanonicalEvent {
            user_id,
            plan_type,
            event_type,
            gateway_subscription_id,
            amount_minor: Self::amount_minor(data),
            occurred_at,
        })
    }
}

impl GatewayWebhookAdapter for PaddleWebhookAdapter {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Paddle
    }

    fn verify(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(';') {
            if let Some(rest) = part.strip_prefix("ts=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("h1=") {
                signature = Some(rest.to_string());
            }
        }

        let timestamp = timestamp.ok_or_else(|| anyhow!("missing ts in paddle-signature"))?;
        let signature = signature.ok_or_else(|| anyhow!("missing h1 in paddle-signature"))?;

        let signed_payload = format!("{}:{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature)?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid webhook signature");
        }

        Ok(())
    }

    fn translate(&self, payload: &[u8]) -> Result<TranslatedWebhook> {
        let event: PaddleEvent = serde_json::from_slice(payload)?;
        let occurred_at = event.occurred_at.unwrap_or_else(Utc::now);

        let event_type = match event.event_type.as_str() {
            "transaction.completed" => Some(SubscriptionEvent::CheckoutCompleted),
            "subscription.activated" => Some(SubscriptionEvent::TrialConverted),
            "subscription.past_due" => Some(SubscriptionEvent::PaymentFailed),
            "subscription.canceled" => Some(SubscriptionEvent::UserCanceled),
            _ => None,
        };

        let payload = match event_type {
            Some(event_type) => {
                match Self::translate_event(event_type, &event.data, occurred_at) {
                    Ok(canonical) => CanonicalPayload::Event(canonical),
                    Err(err) => CanonicalPayload::Invalid(err.to_string()),
                }
            }
            None => CanonicalPayload::Ignored,
        };

        Ok(TranslatedWebhook {
            event_id: event.event_id,
            event_type_raw: event.event_type,
            payload,
        })
    }
}
