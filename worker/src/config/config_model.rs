#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub sweeper: Sweeper,
    pub retry: Retry,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Sweeper {
    pub interval_secs: u64,
    pub batch_size: i64,
    pub grace_period_days: i64,
}

#[derive(Debug, Clone)]
pub struct Retry {
    pub interval_secs: u64,
    pub batch_size: usize,
    pub max_attempts: i32,
    pub stale_after_secs: i64,
}
