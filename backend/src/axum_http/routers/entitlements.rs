use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::repositories::{
        plans::PlanRepository, quota::QuotaStore, subscriptions::SubscriptionRepository,
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{plans::PlanPostgres, subscriptions::SubscriptionPostgres},
        },
        redis::quota_store::RedisQuotaStore,
    },
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::error_response,
    config::config_model::DotEnvyConfig,
    usecases::{entitlement::EntitlementUseCase, subscription_lifecycle::SubscriptionLifecycle},
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    quota_store: Arc<RedisQuotaStore>,
    config: Arc<DotEnvyConfig>,
) -> Router {
    let subscription_repo = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let lifecycle = SubscriptionLifecycle::new(
        Arc::new(subscription_repo),
        config.entitlement.grace_period_days,
    );
    let plan_repo = PlanPostgres::new(Arc::clone(&db_pool));

    let entitlement_usecase = EntitlementUseCase::new(
        Arc::new(lifecycle),
        Arc::new(plan_repo),
        quota_store,
        config.entitlement.free_daily_quota,
    );

    Router::new()
        .route("/", get(check))
        .route("/consume", post(consume))
        .with_state(Arc::new(entitlement_usecase))
}

pub async fn check<S, P, Q>(
    State(entitlement_usecase): State<Arc<EntitlementUseCase<S, P, Q>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    match entitlement_usecase.check(auth.user_id).await {
        Ok(decision) => Json(decision).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn consume<S, P, Q>(
    State(entitlement_usecase): State<Arc<EntitlementUseCase<S, P, Q>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    match entitlement_usecase.consume(auth.user_id).await {
        Ok(decision) => Json(decision).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
