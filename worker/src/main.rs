use anyhow::Result;
use backend::usecases::subscription_lifecycle::SubscriptionLifecycle;
use crates::infra::db::{
    postgres::postgres_connection,
    repositories::{
        subscriptions::SubscriptionPostgres, webhook_events::WebhookEventPostgres,
        webhook_retry::WebhookRetryPostgres,
    },
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    config, services,
    usecases::{
        expire_subscriptions::ExpireSubscriptionsUseCase,
        retry_webhook_events::RetryWebhookEventsUseCase,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc)));
    let lifecycle = Arc::new(SubscriptionLifecycle::new(
        Arc::clone(&subscription_repository),
        dotenvy_env.sweeper.grace_period_days,
    ));

    let expire_usecase = Arc::new(ExpireSubscriptionsUseCase::new(
        Arc::clone(&subscription_repository),
        Arc::clone(&lifecycle),
        dotenvy_env.sweeper.batch_size,
    ));

    let sweeper_loop = tokio::spawn(services::sweeper_loop::run(
        expire_usecase,
        dotenvy_env.sweeper.interval_secs,
    ));

    let event_repository = Arc::new(WebhookEventPostgres::new(Arc::clone(&db_pool_arc)));
    let retry_repository = Arc::new(WebhookRetryPostgres::new(Arc::clone(&db_pool_arc)));

    let retry_usecase = Arc::new(RetryWebhookEventsUseCase::new(
        Arc::clone(&lifecycle),
        event_repository,
        retry_repository,
        dotenvy_env.retry.max_attempts,
        dotenvy_env.retry.stale_after_secs,
    ));

    let retry_loop = tokio::spawn(services::retry_loop::run(
        retry_usecase,
        dotenvy_env.retry.interval_secs,
        dotenvy_env.retry.batch_size,
    ));

    tokio::select! {
        result = sweeper_loop => result??,
        result = retry_loop => result??,
    };
    Ok(())
}
