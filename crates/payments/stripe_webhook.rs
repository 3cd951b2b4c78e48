use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
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

/// Inbound-only Stripe adapter. Signature scheme per
/// https://stripe.com/docs/webhooks/signatures:
/// `Stripe-Signature: t=<ts>,v1=<hex hmac over "<ts>.<body>">`.
pub struct StripeWebhookAdapter {
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    subscription: Option<String>,
    amount_total: Option<i64>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeInvoice {
    subscription: Option<String>,
    amount_paid: Option<i64>,
    amount_due: Option<i64>,
    subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionDetails {
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionObject {
    id: Option<String>,
    metadata: Option<HashMap<String, String>>,
}

impl StripeWebhookAdapter {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }

    fn metadata_user_id(metadata: Option<&HashMap<String, String>>) -> Result<Uuid> {
        metadata
            .and_then(|m| m.get("user_id"))
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| anyhow!("missing user_id in event metadata"))
    }

    fn metadata_plan_type(metadata: Option<&HashMap<String, String>>) -> Option<PlanType> {
        metadata
            .and_then(|m| m.get("plan_type"))
            .and_then(|v| PlanType::from_str(v))
    }

    fn translate_checkout(
        object: &serde_json::Value,
        occurred_at: DateTime<Utc>,
    ) -> Result<CanonicalEvent> {
        let session: StripeCheckoutSession = serde_json::from_value(object.clone())?;
        let metadata = session.metadata.as_ref();
        let user_id = Self::metadata_user_id(metadata)?;
        let plan_type = Self::metadata_plan_type(metadata)
            .ok_or_else(|| anyhow!("missing plan_type in checkout metadata"))?;

        Ok(CanonicalEvent {
            user_id,
            plan_type: Some(plan_type),
            event_type: SubscriptionEvent::CheckoutCompleted,
            gateway_subscription_id: session.subscription,
            amount_minor: session.amount_total,
            occurred_at,
        })
    }

    fn translate_invoice(
        object: &serde_json::Value,
        event_type: SubscriptionEvent,
        occurred_at: DateTime<Utc>,
    ) -> Result<CanonicalEvent> {
        let invoice: StripeInvoice = serde_json::from_value(object.clone())?;
        let metadata = invoice
            .subscription_details
            .as_ref()
            .and_then(|details| details.metadata.as_ref());
        let user_id = Self::metadata_user_id(metadata)?;

        Ok(CanonicalEvent {
            user_id,
            plan_type: Self::metadata_plan_type(metadata),
            event_type,
            gateway_subscription_id: invoice.subscription,
            amount_minor: invoice.amount_paid.or(invoice.amount_due),
            occurred_at,
        })
    }

    fn translate_subscription_deleted(
        object: &serde_json::Value,
        occurred_at: DateTime<Utc>,
    ) -> Result<CanonicalEvent> {
        let subscription: StripeSubscriptionObject = serde_json::from_value(object.clone())?;
        let user_id = Self::metadata_user_id(subscription.metadata.as_ref())?;

        Ok(CanonicalEvent {
            user_id,
            plan_type: None,
            event_type: SubscriptionEvent::UserCanceled,
            gateway_subscription_id: subscription.id,
            amount_minor: None,
            occurred_at,
        })
    }
}

impl GatewayWebhookAdapter for StripeWebhookAdapter {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Stripe
    }

    fn verify(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest.to_string());
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| anyhow!("missing timestamp in stripe-signature"))?;
        let signature = signature.ok_or_else(|| anyhow!("missing v1 in stripe-signature"))?;

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
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
        let event: StripeEvent = serde_json::from_slice(payload)?;
        let occurred_at = event
            .created
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        let translated = match event.type_.as_str() {
            "checkout.session.completed" => Self::translate_checkout(&event.data.object, occurred_at),
            "invoice.payment_succeeded" => Self::translate_invoice(
                &event.data.object,
                SubscriptionEvent::PaymentSucceeded,
                occurred_at,
            ),
            "invoice.payment_failed" => Self::translate_invoice(
                &event.data.object,
                SubscriptionEvent::PaymentFailed,
                occurred_at,
            ),
            "customer.subscription.deleted" => {
                Self::translate_subscription_deleted(&event.data.object, occurred_at)
            }
            _ => {
                return Ok(TranslatedWebhook {
                    event_id: event.id,
                    event_type_raw: event.type_,
                    payload: CanonicalPayload::Ignored,
                });
            }
        };

        let payload = match translated {
            Ok(canonical) => CanonicalPayload::Event(canonical),
            Err(err) => CanonicalPayload::Invalid(err.to_string()),
        };

        Ok(TranslatedWebhook {
            event_id: event.id,
            event_type_raw: event.type_,
            payload,
        })
    }
}
