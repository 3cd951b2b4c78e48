pub mod ad_rewards;
pub mod plans;
pub mod subscriptions;
pub mod webhook_events;
pub mod webhook_retry_jobs;
