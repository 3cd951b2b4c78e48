pub mod ad_rewards;
pub mod entitlements;
pub mod subscriptions;
pub mod webhooks;
