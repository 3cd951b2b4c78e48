use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::subscription_events::SubscriptionEvent;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Free,
    Trial,
    Active,
    PastDue,
    Canceled,
    Expired,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        };
        write!(f, "{}", status)
    }
}

impl SubscriptionStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "free" => SubscriptionStatus::Free,
            "trial" => SubscriptionStatus::Trial,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Free,
        }
    }

    /// The full subscription state machine. Returns the target status for a
    /// defined edge, or `None` when the event has no edge from the current
    /// status; callers log those as unhandled and leave the record untouched.
    ///
    /// `Active + PaymentSucceeded` is a self-edge: a renewal keeps the status
    /// but the caller extends the paid period.
    pub fn apply(self, event: SubscriptionEvent) -> Option<SubscriptionStatus> {
        use SubscriptionEvent::*;
        use SubscriptionStatus::*;

        match (self, event) {
            (Free, CheckoutCompleted) => Some(Active),
            (Trial, TrialConverted) => Some(Active),
            (Trial, TrialExpired) => Some(Expired),
            (Active, PaymentSucceeded) => Some(Active),
            (Active, PaymentFailed) => Some(PastDue),
            (Active, UserCanceled) => Some(Canceled),
            (Active, TermElapsed) => Some(Expired),
            (PastDue, PaymentSucceeded) => Some(Active),
            (PastDue, GraceElapsed) => Some(Expired),
            (Canceled, TermElapsed) => Some(Expired),
            (Canceled, CheckoutCompleted) => Some(Active),
            (Expired, CheckoutCompleted) => Some(Active),
            _ => None,
        }
    }

    /// Statuses that grant unlimited access while unexpired.
    pub fn is_premium(self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }
}
