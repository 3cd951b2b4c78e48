pub mod ad_rewards;
pub mod entitlement;
pub mod subscription_lifecycle;
pub mod subscriptions;
pub mod webhook_ingest;
