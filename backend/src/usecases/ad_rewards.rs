use std::sync::Arc;

use chrono::{Duration, Utc};
use crates::domain::{
    entities::ad_rewards::InsertAdRewardEntity,
    repositories::{ad_rewards::AdRewardRepository, quota::QuotaStore},
    value_objects::ad_rewards::{AdRewardOutcome, RecordAdViewModel},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AdRewardError {
    #[error("quota store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdRewardError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AdRewardError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AdRewardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AdRewardResult<T> = std::result::Result<T, AdRewardError>;

/// Append-only ledger of rewarded ad views, capped per UTC day. The ledger
/// row is written before the quota grant so a crash can never grant quota
/// without a matching audit entry.
pub struct AdRewardUseCase<A, Q>
where
    A: AdRewardRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    ad_repo: Arc<A>,
    quota_store: Arc<Q>,
    max_daily_ad_rewards: i64,
    free_daily_quota: i64,
}

impl<A, Q> AdRewardUseCase<A, Q>
where
    A: AdRewardRepository + Send + Sync + 'static,
    Q: QuotaStore + Send + Sync + 'static,
{
    pub fn new(
        ad_repo: Arc<A>,
        quota_store: Arc<Q>,
        max_daily_ad_rewards: i64,
        free_daily_quota: i64,
    ) -> Self {
        Self {
            ad_repo,
            quota_store,
            max_daily_ad_rewards,
            free_daily_quota,
        }
    }

    pub async fn record_view(
        &self,
        user_id: Uuid,
        model: RecordAdViewModel,
    ) -> AdRewardResult<AdRewardOutcome> {
        if let Some(token) = &model.request_token {
            if let Some(existing) = self
                .ad_repo
                .find_by_request_token(user_id, token.clone())
                .await?
            {
                info!(
                    %user_id,
                    entry_id = %existing.id,
                    "ad rewards: repeated request token, replaying grant"
                );
                let remaining = self
                    .quota_store
                    .peek(user_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|snapshot| snapshot.remaining);
                return Ok(AdRewardOutcome::AlreadyGranted { remaining });
            }
        }

        let now = Utc::now();
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_else(|| now.naive_utc())
            .and_utc();
        let views_today = self
            .ad_repo
            .count_views_between(user_id, day_start, day_start + Duration::days(1))
            .await?;

        if views_today >= self.max_daily_ad_rewards {
            info!(%user_id, views_today, "ad rewards: daily cap reached");
            return Ok(AdRewardOutcome::DailyLimitReached);
        }

        let entry = self
            .ad_repo
            .insert_view(InsertAdRewardEntity {
                user_id,
                ad_type: model.ad_type,
                reward_type: model.reward_type,
                reward_value: model.reward_value,
                request_token: model.request_token,
                watched_at: now,
            })
            .await?;

        let remaining = self
            .quota_store
            .grant(
                user_id,
                self.free_daily_quota,
                i64::from(entry.reward_value),
            )
            .await
            .map_err(|err| {
                // The ledger row exists but the counter was never topped up;
                // the entry id is what reconciliation needs to find it.
                error!(
                    %user_id,
                    entry_id = %entry.id,
                    error = %err,
                    "ad rewards: grant failed after ledger insert"
                );
                AdRewardError::StoreUnavailable(err)
            })?;

        info!(
            %user_id,
            entry_id = %entry.id,
            reward_value = entry.reward_value,
            remaining,
            "ad rewards: view recorded and quota granted"
        );

        Ok(AdRewardOutcome::Granted { remaining })
    }

    pub fn max_daily_ad_rewards(&self) -> i64 {
        self.max_daily_ad_rewards
    }

    pub async fn count_today(&self, user_id: Uuid) -> AdRewardResult<i64> {
        let now = Utc::now();
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_else(|| now.naive_utc())
            .and_utc();

        let count = self
            .ad_repo
            .count_views_between(user_id, day_start, day_start + Duration::days(1))
            .await
            .inspect_err(|err| warn!(%user_id, error = %err, "ad rewards: count failed"))?;

        Ok(count)
    }
}
