use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use redis::{Client, Script, aio::ConnectionManager};
use tokio::time::timeout;
use uuid::Uuid;

use crate::domain::{
    repositories::quota::QuotaStore,
    value_objects::quota::{QuotaConsumption, QuotaSnapshot},
};

/// Every quota mutation is one Lua round trip so that two concurrent callers
/// can never interleave a read-then-write on the same counter.
const ENSURE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
end
return tonumber(redis.call('GET', KEYS[1]))
"#;

/// Returns -1 for a refused decrement; the counter value itself is never
/// negative, so the sentinel is unambiguous.
const CONSUME_SCRIPT: &str = r#"
local remaining = redis.call('GET', KEYS[1])
if remaining == false then
  return -1
end
remaining = tonumber(remaining)
if remaining < tonumber(ARGV[1]) then
  return -1
end
return redis.call('DECRBY', KEYS[1], ARGV[1])
"#;

/// An absent counter is seeded with the plain default before the INCRBY, so
/// a first-touch grant lands on default + amount exactly once. INCRBY
/// preserves the existing TTL, so a grant never stretches a counter past its
/// midnight expiry.
const GRANT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
end
return redis.call('INCRBY', KEYS[1], ARGV[1])
"#;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisQuotaStore {
    manager: ConnectionManager,
    ensure_script: Script,
    consume_script: Script,
    grant_script: Script,
}

impl RedisQuotaStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to quota store")?;

        Ok(Self {
            manager,
            ensure_script: Script::new(ENSURE_SCRIPT),
            consume_script: Script::new(CONSUME_SCRIPT),
            grant_script: Script::new(GRANT_SCRIPT),
        })
    }

    fn day_key(user_id: Uuid) -> String {
        format!("quota:{}:{}", user_id, Utc::now().format("%Y%m%d"))
    }

    fn seconds_until_utc_midnight() -> i64 {
        let now = Utc::now();
        let midnight = (now + chrono::Duration::days(1))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_else(|| now.naive_utc());
        (midnight - now.naive_utc()).num_seconds().max(1)
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    async fn ensure(&self, user_id: Uuid, default_amount: i64) -> Result<i64> {
        let key = Self::day_key(user_id);
        let ttl = Self::seconds_until_utc_midnight();
        let mut conn = self.manager.clone();

        let remaining: i64 = timeout(
            COMMAND_TIMEOUT,
            self.ensure_script
                .key(&key)
                .arg(default_amount)
                .arg(ttl)
                .invoke_async(&mut conn),
        )
        .await
        .context("quota store timed out on ensure")??;

        Ok(remaining)
    }

    async fn try_consume(&self, user_id: Uuid, amount: i64) -> Result<QuotaConsumption> {
        let key = Self::day_key(user_id);
        let mut conn = self.manager.clone();

        let remaining: i64 = timeout(
            COMMAND_TIMEOUT,
            self.consume_script
                .key(&key)
                .arg(amount)
                .invoke_async(&mut conn),
        )
        .await
        .context("quota store timed out on try_consume")??;

        if remaining < 0 {
            Ok(QuotaConsumption::Denied)
        } else {
            Ok(QuotaConsumption::Allowed { remaining })
        }
    }

    async fn grant(&self, user_id: Uuid, default_amount: i64, amount: i64) -> Result<i64> {
        let key = Self::day_key(user_id);
        let ttl = Self::seconds_until_utc_midnight();
        let mut conn = self.manager.clone();

        let remaining: i64 = timeout(
            COMMAND_TIMEOUT,
            self.grant_script
                .key(&key)
                .arg(amount)
                .arg(default_amount)
                .arg(ttl)
                .invoke_async(&mut conn),
        )
        .await
        .context("quota store timed out on grant")??;

        Ok(remaining)
    }

    async fn peek(&self, user_id: Uuid) -> Result<Option<QuotaSnapshot>> {
        let key = Self::day_key(user_id);
        let mut conn = self.manager.clone();

        let (remaining, ttl_seconds): (Option<i64>, i64) = timeout(
            COMMAND_TIMEOUT,
            redis::pipe()
                .cmd("GET")
                .arg(&key)
                .cmd("TTL")
                .arg(&key)
                .query_async(&mut conn),
        )
        .await
        .context("quota store timed out on peek")??;

        Ok(remaining.map(|remaining| QuotaSnapshot {
            remaining,
            ttl_seconds,
        }))
    }
}
