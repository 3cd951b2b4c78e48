pub mod paddle_webhook;
pub mod stripe_webhook;

use anyhow::Result;

use crate::domain::value_objects::{
    enums::payment_gateways::PaymentGateway, webhooks::TranslatedWebhook,
};

/// One adapter per payment gateway. Each gateway signs and shapes its
/// deliveries differently; everything downstream of `translate` sees only the
/// canonical event.
pub trait GatewayWebhookAdapter: Send + Sync {
    fn gateway(&self) -> PaymentGateway;

    /// Checks the delivery signature against the shared secret. Failure means
    /// the raw body must not be parsed any further.
    fn verify(&self, payload: &[u8], signature_header: &str) -> Result<()>;

    /// Normalizes the raw payload. Errors only when the envelope itself is
    /// undecodable (no event id available); a supported event type with bad
    /// fields comes back as `CanonicalPayload::Invalid`.
    fn translate(&self, payload: &[u8]) -> Result<TranslatedWebhook>;
}
