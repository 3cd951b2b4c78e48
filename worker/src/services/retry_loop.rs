use std::{sync::Arc, time::Duration};

use anyhow::Result;
use crates::domain::repositories::{
    subscriptions::SubscriptionRepository, webhook_events::WebhookEventRepository,
    webhook_retry::WebhookRetryRepository,
};
use tracing::{error, info};

use crate::usecases::retry_webhook_events::RetryWebhookEventsUseCase;

pub async fn run<S, E, R>(
    usecase: Arc<RetryWebhookEventsUseCase<S, E, R>>,
    interval_secs: u64,
    batch_size: usize,
) -> Result<()>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    E: WebhookEventRepository + Send + Sync + 'static,
    R: WebhookRetryRepository + Send + Sync + 'static,
{
    loop {
        match usecase.drain_once(batch_size).await {
            Ok(processed) if processed > 0 => {
                info!(processed, "retry: drained webhook retry jobs");
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error while draining webhook retry queue: {}", e);
            }
        }

        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}
