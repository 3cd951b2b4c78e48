use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{plans::PlanPostgres, subscriptions::SubscriptionPostgres},
    },
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::error_response,
    config::config_model::DotEnvyConfig,
    usecases::{
        subscription_lifecycle::SubscriptionLifecycle, subscriptions::SubscriptionQueryUseCase,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let subscription_repo = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let lifecycle = SubscriptionLifecycle::new(
        Arc::new(subscription_repo),
        config.entitlement.grace_period_days,
    );
    let plan_repo = PlanPostgres::new(Arc::clone(&db_pool));

    let subscription_usecase =
        SubscriptionQueryUseCase::new(Arc::new(lifecycle), Arc::new(plan_repo));

    Router::new()
        .route("/plans", get(list_plans))
        .route("/current", get(current))
        .with_state(Arc::new(subscription_usecase))
}

pub async fn list_plans<S, P>(
    State(subscription_usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
    _auth: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match subscription_usecase.list_plans().await {
        Ok(plans) => Json(plans).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub async fn current<S, P>(
    State(subscription_usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match subscription_usecase.get_current(auth.user_id).await {
        Ok(current) => Json(current).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
