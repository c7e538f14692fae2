use crate::backoff::RetryableError;
use crate::domain::{MetricKeys, MetricsSnapshot, MetricsStorage};
use anyhow::{anyhow, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, FromRedisValue, Value};
use std::collections::HashMap;

const GAUGES_KEY: &str = "metrics:gauges";
const COUNTERS_KEY: &str = "metrics:counters";

/// Redis backend. Gauges live in one hash (`HSET` overwrites), counters in
/// another (`HINCRBY` accumulates).
pub struct RedisStorage {
    // ---
    client: Client,
}

impl RedisStorage {
    // ---
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn open(url: &str) -> Result<Self> {
        Ok(Self::new(Client::open(url)?))
    }

    /// Creates a new multiplexed connection for one storage call.
    ///
    /// No command has been sent when this fails, so its errors are always
    /// safe to retry.
    async fn conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(RetryableError::wrap)
    }
}

/// Pairs the requested `names` with an `HMGET` reply, dropping absent fields.
fn found<T: FromRedisValue>(names: &[String], reply: Option<Value>) -> Result<Vec<(String, T)>> {
    // ---
    let reply = reply.ok_or_else(|| anyhow!("HMGET reply missing from pipeline"))?;
    let values: Vec<Option<T>> = redis::from_owned_redis_value(reply)?;

    Ok(names
        .iter()
        .zip(values)
        .filter_map(|(name, value)| value.map(|v| (name.clone(), v)))
        .collect())
}

#[async_trait::async_trait]
impl MetricsStorage for RedisStorage {
    // ---
    async fn get_gauge(&self, name: &str) -> Result<Option<f64>> {
        // ---
        let mut conn = self.conn().await?;
        let value: Option<f64> = conn.hget(GAUGES_KEY, name).await?;
        Ok(value)
    }

    async fn get_counter(&self, name: &str) -> Result<Option<i64>> {
        // ---
        let mut conn = self.conn().await?;
        let value: Option<i64> = conn.hget(COUNTERS_KEY, name).await?;
        Ok(value)
    }

    async fn get_many(&self, keys: &MetricKeys) -> Result<MetricsSnapshot> {
        // ---
        let mut snapshot = MetricsSnapshot::new();
        if keys.gauges.is_empty() && keys.counters.is_empty() {
            return Ok(snapshot);
        }

        // HMGET rejects an empty field list, so each kind is queried only
        // when it has names.
        let mut pipe = redis::pipe();
        pipe.atomic();
        if !keys.gauges.is_empty() {
            pipe.cmd("HMGET").arg(GAUGES_KEY).arg(&keys.gauges);
        }
        if !keys.counters.is_empty() {
            pipe.cmd("HMGET").arg(COUNTERS_KEY).arg(&keys.counters);
        }

        let mut conn = self.conn().await?;
        let replies: Vec<Value> = pipe.query_async(&mut conn).await?;
        let mut replies = replies.into_iter();

        if !keys.gauges.is_empty() {
            snapshot.gauges.extend(found::<f64>(&keys.gauges, replies.next())?);
        }
        if !keys.counters.is_empty() {
            snapshot.counters.extend(found::<i64>(&keys.counters, replies.next())?);
        }

        Ok(snapshot)
    }

    async fn get_all(&self) -> Result<MetricsSnapshot> {
        // ---
        let mut conn = self.conn().await?;
        let (gauges, counters): (HashMap<String, f64>, HashMap<String, i64>) = redis::pipe()
            .atomic()
            .hgetall(GAUGES_KEY)
            .hgetall(COUNTERS_KEY)
            .query_async(&mut conn)
            .await?;

        Ok(MetricsSnapshot {
            gauges: gauges.into_iter().collect(),
            counters: counters.into_iter().collect(),
        })
    }

    async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: () = conn.hset(GAUGES_KEY, name, value).await?;
        Ok(())
    }

    async fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: i64 = conn.hincr(COUNTERS_KEY, name, delta).await?;
        Ok(())
    }

    async fn set_many(&self, items: &MetricsSnapshot) -> Result<()> {
        // ---
        if items.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (name, value) in &items.gauges {
            pipe.hset(GAUGES_KEY, name, *value).ignore();
        }
        for (name, delta) in &items.counters {
            pipe.hincr(COUNTERS_KEY, name, *delta).ignore();
        }

        let mut conn = self.conn().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Redis failures that guarantee the command never ran: a refused
/// connection. Timeouts and dropped connections are not retried, since
/// `HINCRBY` may already have been applied and a replay would double count.
/// Failures to open a connection are marked retryable at the source.
pub fn is_retryable_error(err: &anyhow::Error) -> bool {
    // ---
    err.chain().any(|cause| {
        cause
            .downcast_ref::<redis::RedisError>()
            .is_some_and(|e| e.is_connection_refusal())
    })
}
