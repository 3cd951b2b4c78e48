use anyhow::{Ok, Result};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = super::config_model::BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let quota_store = super::config_model::QuotaStore {
        url: std::env::var("QUOTA_STORE_URL").expect("QUOTA_STORE_URL is invalid"),
    };

    let auth = super::config_model::Auth {
        jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET is invalid"),
    };

    let stripe = super::config_model::GatewaySecret {
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET is invalid"),
    };

    let paddle = super::config_model::GatewaySecret {
        webhook_secret: std::env::var("PADDLE_WEBHOOK_SECRET")
            .expect("PADDLE_WEBHOOK_SECRET is invalid"),
    };

    let entitlement = super::config_model::Entitlement {
        free_daily_quota: std::env::var("FREE_DAILY_QUOTA")
            .unwrap_or_else(|_| "20".to_string())
            .parse()?,
        max_daily_ad_rewards: std::env::var("MAX_DAILY_AD_REWARDS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?,
        grace_period_days: std::env::var("GRACE_PERIOD_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        quota_store,
        auth,
        stripe,
        paddle,
        entitlement,
    })
}
