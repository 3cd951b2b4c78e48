pub mod payment_gateways;
pub mod plan_types;
pub mod subscription_events;
pub mod subscription_statuses;
pub mod webhook_outcomes;
