/// Result of one atomic conditional decrement on a daily counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaConsumption {
    Allowed { remaining: i64 },
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub remaining: i64,
    pub ttl_seconds: i64,
}
