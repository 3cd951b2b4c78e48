use serde::Deserialize;

/// Inbound ad-view submission from an authenticated client.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordAdViewModel {
    pub ad_type: String,
    pub reward_type: String,
    pub reward_value: i32,
    /// Optional client idempotency token; a repeated token returns the
    /// original grant instead of granting twice.
    pub request_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdRewardOutcome {
    Granted { remaining: i64 },
    AlreadyGranted { remaining: Option<i64> },
    DailyLimitReached,
}
