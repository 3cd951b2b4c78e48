use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Terminal disposition of one webhook delivery, persisted in the
/// idempotency log; duplicate deliveries replay this value verbatim.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Row reserved, processing not finished yet.
    #[default]
    Received,
    /// Canonical event applied to the subscription registry.
    Applied,
    /// Valid event, but no edge from the subscription's current status.
    Unhandled,
    /// Ignored event type or invalid payload; nothing applied.
    Skipped,
    /// Downstream application failed; queued on the internal retry path.
    QueuedRetry,
}

impl Display for WebhookOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match self {
            WebhookOutcome::Received => "received",
            WebhookOutcome::Applied => "applied",
            WebhookOutcome::Unhandled => "unhandled",
            WebhookOutcome::Skipped => "skipped",
            WebhookOutcome::QueuedRetry => "queued_retry",
        };
        write!(f, "{}", outcome)
    }
}

impl WebhookOutcome {
    pub fn from_str(value: &str) -> Self {
        match value {
            "received" => WebhookOutcome::Received,
            "applied" => WebhookOutcome::Applied,
            "unhandled" => WebhookOutcome::Unhandled,
            "skipped" => WebhookOutcome::Skipped,
            "queued_retry" => WebhookOutcome::QueuedRetry,
            _ => WebhookOutcome::Received,
        }
    }
}
