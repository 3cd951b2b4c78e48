use std::{sync::Arc, time::Duration};

use anyhow::Result;
use crates::domain::repositories::subscriptions::SubscriptionRepository;
use tracing::{error, info};

use crate::usecases::expire_subscriptions::ExpireSubscriptionsUseCase;

pub async fn run<S>(
    usecase: Arc<ExpireSubscriptionsUseCase<S>>,
    interval_secs: u64,
) -> Result<()>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    loop {
        match usecase.sweep_once().await {
            Ok(stats) if stats.scanned > 0 => {
                info!(
                    scanned = stats.scanned,
                    expired = stats.expired,
                    failed = stats.failed,
                    "sweeper: pass complete"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error while sweeping expired subscriptions: {}", e);
            }
        }

        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}
