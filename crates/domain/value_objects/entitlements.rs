use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementReason {
    /// Unlimited tier; quota untouched.
    Subscription,
    QuotaAvailable,
    LimitReached,
}

/// The allow/deny answer handed to the metered-action caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntitlementDecision {
    pub allowed: bool,
    pub unlimited: bool,
    pub remaining: Option<i64>,
    pub reason: EntitlementReason,
}

impl EntitlementDecision {
    pub fn premium() -> Self {
        Self {
            allowed: true,
            unlimited: true,
            remaining: None,
            reason: EntitlementReason::Subscription,
        }
    }

    pub fn metered(remaining: i64) -> Self {
        Self {
            allowed: true,
            unlimited: false,
            remaining: Some(remaining),
            reason: EntitlementReason::QuotaAvailable,
        }
    }

    pub fn limit_reached(remaining: i64) -> Self {
        Self {
            allowed: false,
            unlimited: false,
            remaining: Some(remaining),
            reason: EntitlementReason::LimitReached,
        }
    }
}
