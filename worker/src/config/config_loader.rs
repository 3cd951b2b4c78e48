use anyhow::{Ok, Result};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let sweeper = super::config_model::Sweeper {
        interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?,
        batch_size: std::env::var("SWEEP_BATCH_SIZE")
            .unwrap_or_else(|_| "200".to_string())
            .parse()?,
        grace_period_days: std::env::var("GRACE_PERIOD_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()?,
    };

    let retry = super::config_model::Retry {
        interval_secs: std::env::var("RETRY_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()?,
        batch_size: std::env::var("RETRY_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()?,
        max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?,
        stale_after_secs: std::env::var("RETRY_STALE_AFTER_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        database,
        sweeper,
        retry,
    })
}
