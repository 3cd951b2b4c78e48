pub mod ad_rewards;
pub mod entitlements;
pub mod enums;
pub mod quota;
pub mod subscriptions;
pub mod webhooks;
