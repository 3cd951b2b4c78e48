#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub quota_store: QuotaStore,
    pub auth: Auth,
    pub stripe: GatewaySecret,
    pub paddle: GatewaySecret,
    pub entitlement: Entitlement,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct QuotaStore {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct GatewaySecret {
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Entitlement {
    pub free_daily_quota: i64,
    pub max_daily_ad_rewards: i64,
    pub grace_period_days: i64,
}
