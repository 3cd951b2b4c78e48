use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{ad_rewards::AdRewardRepository, quota::QuotaStore},
        value_objects::ad_rewards::{AdRewardOutcome, RecordAdViewModel},
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad, repositories::ad_rewards::AdRewardPostgres,
        },
        redis::quota_store::RedisQuotaStore,
    },
};
use serde::Serialize;

use crate::{
    auth::AuthUser, axum_http::error_responses::error_response,
    config::config_model::DotEnvyConfig, usecases::ad_rewards::AdRewardUseCase,
};

#[derive(Debug, Serialize)]
pub struct AdRewardResponse {
    pub status: &'static str,
    pub remaining: Option<i64>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    quota_store: Arc<RedisQuotaStore>,
    config: Arc<DotEnvyConfig>,
) -> Router {
    let ad_repo = AdRewardPostgres::new(Arc::clone(&db_pool));
    let ad_reward_usecase = AdRewardUseCase::new(
        Arc::new(ad_repo),
        quota_store,
        config.entitlement.max_daily_ad_rewards,
        config.entitlement.free_daily_quota,
    );

    Router::new()
        .route("/", post(record_view))
        .route("/today", get(count_today))
        .with_state(Arc::new(ad_reward_usecase))
}

#[derive(Debug, Serialize)]
pub struct AdViewCountResponse {
    pub views_today: i64,
    pub max_daily: i64,
}

pub async fn count_today<A, Q>(
    State(ad_reward_usecase): State<Arc<AdRewardUseCase<A, Q>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    A: AdRewardRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    match ad_reward_usecase.count_today(auth.user_id).await {
        Ok(views_today) => Json(AdViewCountResponse {
            views_today,
            max_daily: ad_reward_usecase.max_daily_ad_rewards(),
        })
        .into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn record_view<A, Q>(
    State(ad_reward_usecase): State<Arc<AdRewardUseCase<A, Q>>>,
    auth: AuthUser,
    Json(record_ad_view_model): Json<RecordAdViewModel>,
) -> impl IntoResponse
where
    A: AdRewardRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    match ad_reward_usecase
        .record_view(auth.user_id, record_ad_view_model)
        .await
    {
        Ok(AdRewardOutcome::Granted { remaining }) => Json(AdRewardResponse {
            status: "granted",
            remaining: Some(remaining),
        })
        .into_response(),
        Ok(AdRewardOutcome::AlreadyGranted { remaining }) => Json(AdRewardResponse {
            status: "already_granted",
            remaining,
        })
        .into_response(),
        Ok(AdRewardOutcome::DailyLimitReached) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(AdRewardResponse {
                status: "daily_limit_reached",
                remaining: None,
            }),
        )
            .into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
