pub mod expire_subscriptions;
pub mod retry_webhook_events;
