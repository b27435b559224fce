use async_trait::async_trait;
use lynx_core::error::Result;
use lynx_core::expire::{format_expire, parse_expire};
use lynx_core::{LinkId, LinkRecord, NewLink, Repository, StorageError};
use parking_lot::RwLock;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult, Script};
use std::collections::HashMap;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_KEY_PREFIX: &str = "url:";
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Writes the hash and schedules physical expiry, unless the key is taken.
static CREATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 1 then
            return 0
        end
        redis.call('HSET', KEYS[1], 'url', ARGV[1], 'visits', 0, 'once', ARGV[2], 'expire', ARGV[3])
        redis.call('EXPIREAT', KEYS[1], ARGV[4])
        return 1
        ",
    )
});

/// HINCRBY alone would create a missing hash. With ARGV[1] == '1' a
/// hash that already has visits is left alone.
static INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return false
        end
        if ARGV[1] == '1' then
            local visits = tonumber(redis.call('HGET', KEYS[1], 'visits')) or 0
            if visits > 0 then
                return false
            end
        end
        return redis.call('HINCRBY', KEYS[1], 'visits', 1)
        ",
    )
});

/// Connection settings for [`RedisRepository`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisSettings {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`.
    #[builder(setter(into))]
    pub url: String,
    /// Prefix prepended to the decimal id to form the key.
    #[builder(default = DEFAULT_KEY_PREFIX.to_string(), setter(into))]
    pub key_prefix: String,
    /// Upper bound for every round trip, including the initial connect.
    #[builder(default = DEFAULT_OPERATION_TIMEOUT)]
    pub operation_timeout: Duration,
}

/// A Redis-backed implementation of [`Repository`].
///
/// Each link is a hash at `{prefix}{id}` with the fields `url`, `visits`,
/// `once` and `expire`. Keys carry an `EXPIREAT` so Redis drops them on
/// its own; reads still go through the link service's expiry check.
///
/// `create` and `increment_visits` run as Lua scripts and `delete` as a
/// `MULTI`/`EXEC` pipeline, so each of them is atomic on the server.
#[derive(Debug)]
pub struct RedisRepository {
    conn: RwLock<Option<MultiplexedConnection>>,
    key_prefix: String,
    operation_timeout: Duration,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        StorageError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Query(message)
    }
}

impl RedisRepository {
    /// Wraps an existing multiplexed connection with default settings.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_options(conn, DEFAULT_KEY_PREFIX, DEFAULT_OPERATION_TIMEOUT)
    }

    /// Wraps an existing connection with a custom key prefix and timeout.
    pub fn with_options(
        conn: MultiplexedConnection,
        key_prefix: impl Into<String>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            conn: RwLock::new(Some(conn)),
            key_prefix: key_prefix.into(),
            operation_timeout,
        }
    }

    /// Opens a new multiplexed connection.
    pub async fn connect(settings: &RedisSettings) -> Result<Self> {
        let client = redis::Client::open(settings.url.as_str()).map_err(|e| {
            StorageError::Unavailable(format!("invalid redis url '{}': {e}", settings.url))
        })?;

        let conn = match tokio::time::timeout(
            settings.operation_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => conn.map_err(|e| map_redis_error("failed to connect to redis", e))?,
            Err(_) => {
                return Err(StorageError::Timeout(format!(
                    "failed to connect to redis within {:?}",
                    settings.operation_timeout
                )))
            }
        };

        debug!(url = %settings.url, "connected to redis");
        Ok(Self::with_options(
            conn,
            settings.key_prefix.clone(),
            settings.operation_timeout,
        ))
    }

    /// Generates the storage key for an id.
    fn key(&self, id: LinkId) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    /// Hands out a clone of the shared connection for one operation.
    fn connection(&self) -> Result<MultiplexedConnection> {
        self.conn
            .read()
            .clone()
            .ok_or_else(|| StorageError::Unavailable("repository is closed".to_string()))
    }

    /// Runs one round trip under the operation timeout.
    async fn run<T, F>(&self, operation: &str, request: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, request).await {
            Ok(result) => result.map_err(|e| map_redis_error(operation, e)),
            Err(_) => Err(StorageError::Timeout(format!(
                "{operation}: no reply within {:?}",
                self.operation_timeout
            ))),
        }
    }
}

/// Rebuilds a record from an `HGETALL` reply. An empty reply means the
/// key does not exist.
fn decode_record(id: LinkId, mut fields: HashMap<String, String>) -> Result<Option<LinkRecord>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| StorageError::InvalidData(format!("link {id} has no '{name}' field")))
    };

    let url = take("url")?;
    let visits = take("visits")?;
    let once = take("once")?;
    let expire = take("expire")?;

    let visits = visits.parse::<u64>().map_err(|e| {
        StorageError::InvalidData(format!("link {id} has invalid visits '{visits}': {e}"))
    })?;

    Ok(Some(LinkRecord {
        id,
        url,
        expire_at: parse_expire(&expire)?,
        once: parse_flag(id, &once)?,
        visits,
    }))
}

fn parse_flag(id: LinkId, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "TRUE" | "True" | "t" | "T" => Ok(true),
        "0" | "false" | "FALSE" | "False" | "f" | "F" => Ok(false),
        other => Err(StorageError::InvalidData(format!(
            "link {id} has invalid once flag '{other}'"
        ))),
    }
}

#[async_trait]
impl Repository for RedisRepository {
    async fn exists(&self, id: LinkId) -> Result<bool> {
        let key = self.key(id);
        let mut conn = self.connection()?;
        trace!(id = %id, "checking existence in redis");

        self.run("failed to check key in redis", conn.exists::<_, bool>(&key))
            .await
    }

    async fn create(&self, id: LinkId, link: NewLink) -> Result<()> {
        let key = self.key(id);
        let mut conn = self.connection()?;
        trace!(id = %id, "storing link in redis");

        let mut invocation = CREATE_SCRIPT.key(&key);
        invocation
            .arg(&link.url)
            .arg(u8::from(link.once))
            .arg(format_expire(link.expire_at))
            .arg(link.expire_at.as_second());

        let created: bool = self
            .run(
                "failed to write link to redis",
                invocation.invoke_async(&mut conn),
            )
            .await?;

        if !created {
            debug!(id = %id, "key already taken in redis");
            return Err(StorageError::Conflict(id));
        }
        Ok(())
    }

    async fn get(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        let key = self.key(id);
        let mut conn = self.connection()?;
        trace!(id = %id, "fetching link from redis");

        let fields = self
            .run(
                "failed to fetch link from redis",
                conn.hgetall::<_, HashMap<String, String>>(&key),
            )
            .await?;

        decode_record(id, fields).inspect_err(|e| {
            warn!(id = %id, error = %e, "malformed link hash in redis");
        })
    }

    async fn delete(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        let key = self.key(id);
        let mut conn = self.connection()?;
        trace!(id = %id, "deleting link from redis");

        let mut pipe = redis::pipe();
        pipe.atomic().hgetall(&key).del(&key);

        let (fields, _removed): (HashMap<String, String>, u64) = self
            .run(
                "failed to delete link from redis",
                pipe.query_async(&mut conn),
            )
            .await?;

        decode_record(id, fields)
    }

    async fn increment_visits(&self, id: LinkId, single_use: bool) -> Result<Option<u64>> {
        let key = self.key(id);
        let mut conn = self.connection()?;
        trace!(id = %id, single_use, "incrementing visits in redis");

        let mut invocation = INCREMENT_SCRIPT.key(&key);
        invocation.arg(u8::from(single_use));
        self.run(
            "failed to increment visits in redis",
            invocation.invoke_async(&mut conn),
        )
        .await
    }

    async fn close(&self) -> Result<()> {
        if self.conn.write().take().is_some() {
            debug!("closed redis repository");
        }
        Ok(())
    }
}
