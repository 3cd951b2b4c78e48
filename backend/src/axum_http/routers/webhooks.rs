use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::repositories::{
        subscriptions::SubscriptionRepository, webhook_events::WebhookEventRepository,
        webhook_retry::WebhookRetryRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            subscriptions::SubscriptionPostgres, webhook_events::WebhookEventPostgres,
            webhook_retry::WebhookRetryPostgres,
        },
    },
    payments::{
        GatewayWebhookAdapter, paddle_webhook::PaddleWebhookAdapter,
        stripe_webhook::StripeWebhookAdapter,
    },
};

use crate::{
    axum_http::error_responses::error_response,
    config::config_model::DotEnvyConfig,
    usecases::{subscription_lifecycle::SubscriptionLifecycle, webhook_ingest::WebhookIngestUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let subscription_repo = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let lifecycle = SubscriptionLifecycle::new(
        Arc::new(subscription_repo),
        config.entitlement.grace_period_days,
    );
    let event_repo = WebhookEventPostgres::new(Arc::clone(&db_pool));
    let retry_repo = WebhookRetryPostgres::new(Arc::clone(&db_pool));

    let adapters: Vec<Arc<dyn GatewayWebhookAdapter>> = vec![
        Arc::new(StripeWebhookAdapter::new(
            config.stripe.webhook_secret.clone(),
        )),
        Arc::new(PaddleWebhookAdapter::new(
            config.paddle.webhook_secret.clone(),
        )),
    ];

    let webhook_usecase = WebhookIngestUseCase::new(
        Arc::new(lifecycle),
        Arc::new(event_repo),
        Arc::new(retry_repo),
        adapters,
    );

    Router::new()
        .route("/:gateway", post(receive))
        .with_state(Arc::new(webhook_usecase))
}

pub async fn receive<S, E, R>(
    State(webhook_usecase): State<Arc<WebhookIngestUseCase<S, E, R>>>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    E: WebhookEventRepository + Send + Sync + 'static,
    R: WebhookRetryRepository + Send + Sync + 'static,
{
    let signature = match signature_header_name(&gateway) {
        Some(header_name) => {
            match headers.get(header_name).and_then(|value| value.to_str().ok()) {
                Some(value) => value.to_string(),
                None => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Missing {} header", header_name),
                    );
                }
            }
        }
        // Unknown gateway path segment; the usecase answers 404.
        None => String::new(),
    };

    match webhook_usecase.ingest(&gateway, &signature, &body).await {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

fn signature_header_name(gateway: &str) -> Option<&'static str> {
    match gateway {
        "stripe" => Some("Stripe-Signature"),
        "paddle" => Some("Paddle-Signature"),
        _ => None,
    }
}
