use crate::ResultCache;
use async_trait::async_trait;
use pulse_config::CacheConfig;
use pulse_core::{PulseError, Result};
use redis::aio::MultiplexedConnection;
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use std::future::Future;
use std::time::Duration;

/// Redis-backed result cache.
///
/// Opens a short-lived connection per operation (the client authenticates and
/// selects the configured database on connect).  Every operation is bounded by
/// the configured timeout, so an unreachable server costs a request at most
/// that long and never blocks the analytics pipeline.
#[derive(Debug, Clone)]
pub struct RedisCache {
    client:  Client,
    timeout: Duration,
}

impl RedisCache {
    /// Fails only if `config.addr` is not a `host:port` pair; the server is
    /// not contacted until the first operation.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let client = Client::open(connection_info(config)?).map_err(cache_err)?;
        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    async fn connect(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(cache_err)
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| PulseError::Cache(format!("timed out after {:?}", self.timeout)))?
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.bounded(async {
            let mut conn = self.connect().await?;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(cache_err)?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            cmd.arg("PX").arg(millis);
        }

        self.bounded(async {
            let mut conn = self.connect().await?;
            let _: () = cmd.query_async(&mut conn).await.map_err(cache_err)?;
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded(async {
            let mut conn = self.connect().await?;
            let pong: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(cache_err)?;
            if pong == "PONG" {
                Ok(())
            } else {
                Err(PulseError::Cache(format!("unexpected reply to PING: {pong}")))
            }
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Split `host:port` and attach the credentials and database.
fn connection_info(config: &CacheConfig) -> Result<ConnectionInfo> {
    let invalid = || PulseError::Config(format!("cache.addr '{}' is not host:port", config.addr));

    let (host, port) = config.addr.rsplit_once(':').ok_or_else(invalid)?;
    let port: u16 = port.parse().map_err(|_| invalid())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid());
    }

    Ok(ConnectionInfo {
        addr:  ConnectionAddr::Tcp(host.to_string(), port),
        redis: RedisConnectionInfo {
            db: i64::from(config.db),
            password: (!config.password.is_empty()).then(|| config.password.clone()),
            ..RedisConnectionInfo::default()
        },
    })
}

fn cache_err(e: RedisError) -> PulseError {
    PulseError::Cache(e.to_string())
}
