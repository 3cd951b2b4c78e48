use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Canonical lifecycle events, regardless of which gateway (or the sweeper)
/// produced them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEvent {
    CheckoutCompleted,
    TrialConverted,
    TrialExpired,
    PaymentSucceeded,
    PaymentFailed,
    UserCanceled,
    TermElapsed,
    GraceElapsed,
}

impl Display for SubscriptionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let event = match self {
            SubscriptionEvent::CheckoutCompleted => "checkout_completed",
            SubscriptionEvent::TrialConverted => "trial_converted",
            SubscriptionEvent::TrialExpired => "trial_expired",
            SubscriptionEvent::PaymentSucceeded => "payment_succeeded",
            SubscriptionEvent::PaymentFailed => "payment_failed",
            SubscriptionEvent::UserCanceled => "user_canceled",
            SubscriptionEvent::TermElapsed => "term_elapsed",
            SubscriptionEvent::GraceElapsed => "grace_elapsed",
        };
        write!(f, "{}", event)
    }
}

impl SubscriptionEvent {
    pub const ALL: [SubscriptionEvent; 8] = [
        SubscriptionEvent::CheckoutCompleted,
        SubscriptionEvent::TrialConverted,
        SubscriptionEvent::TrialExpired,
        SubscriptionEvent::PaymentSucceeded,
        SubscriptionEvent::PaymentFailed,
        SubscriptionEvent::UserCanceled,
        SubscriptionEvent::TermElapsed,
        SubscriptionEvent::GraceElapsed,
    ];
}
