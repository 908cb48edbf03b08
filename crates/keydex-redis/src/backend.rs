use crate::config::RedisConfig;
use keydex_core::{
    db::{Backend, BackendError, ConnectionDetails, SessionFactory},
    error::InternalError,
};
use parking_lot::Mutex;
use redis::{Connection, FromRedisValue, RedisError};
use std::{fmt, sync::Arc};
use tracing::{debug, info};

/// Keys requested per SCAN round trip.
const SCAN_COUNT: usize = 512;

///
/// RedisBackend
///
/// `Backend` over one blocking Redis connection. Commands from concurrent
/// callers are serialized on the connection.
///

pub struct RedisBackend {
    conn: Mutex<Connection>,
    url: String,
}

impl RedisBackend {
    /// Open and configure a connection. Read and write timeouts follow
    /// `config.timeout_ms`.
    pub fn connect(config: &RedisConfig) -> Result<Self, InternalError> {
        config.validate()?;

        let url = config.redacted_url();
        let timeout = config.timeout();
        let client = redis::Client::open(config.connection_info())
            .map_err(|err| BackendError::Unavailable(format!("invalid redis target {url}: {err}")))?;
        let conn = client
            .get_connection_with_timeout(timeout)
            .map_err(|err| BackendError::Unavailable(format!("connect to {url}: {err}")))?;
        conn.set_read_timeout(Some(timeout))
            .and_then(|()| conn.set_write_timeout(Some(timeout)))
            .map_err(|err| BackendError::Unavailable(format!("configure {url}: {err}")))?;

        info!(%url, "redis backend connected");

        Ok(Self {
            conn: Mutex::new(conn),
            url,
        })
    }

    fn run<T: FromRedisValue>(
        &self,
        command: &'static str,
        key: &str,
        cmd: &redis::Cmd,
    ) -> Result<T, BackendError> {
        let mut conn = self.conn.lock();

        cmd.query(&mut *conn)
            .map_err(|err| map_error(command, key, &err))
    }
}

impl Backend for RedisBackend {
    fn sadd(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let added: i64 = self.run("SADD", key, redis::cmd("SADD").arg(key).arg(member))?;

        Ok(added > 0)
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let removed: i64 = self.run("SREM", key, redis::cmd("SREM").arg(key).arg(member))?;

        Ok(removed > 0)
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
        self.run("SMEMBERS", key, redis::cmd("SMEMBERS").arg(key))
    }

    // SORT ... ALPHA gives a stable lexical order, so pages line up across
    // calls while the set is unchanged.
    fn smembers_page(
        &self,
        key: &str,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<String>, BackendError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let count = count.map_or(-1, |c| i64::try_from(c).unwrap_or(i64::MAX));

        self.run(
            "SORT",
            key,
            redis::cmd("SORT")
                .arg(key)
                .arg("ALPHA")
                .arg("LIMIT")
                .arg(offset)
                .arg(count),
        )
    }

    fn zadd(&self, key: &str, score: f64, member: &str) -> Result<bool, BackendError> {
        if score.is_nan() {
            return Err(BackendError::command("ZADD", "score is not a number"));
        }
        let added: i64 = self.run(
            "ZADD",
            key,
            redis::cmd("ZADD").arg(key).arg(score_arg(score)).arg(member),
        )?;

        Ok(added > 0)
    }

    fn zrem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let removed: i64 = self.run("ZREM", key, redis::cmd("ZREM").arg(key).arg(member))?;

        Ok(removed > 0)
    }

    fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, BackendError> {
        self.run("ZSCORE", key, redis::cmd("ZSCORE").arg(key).arg(member))
    }

    fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, BackendError> {
        self.run(
            "ZRANGEBYSCORE",
            key,
            redis::cmd("ZRANGEBYSCORE")
                .arg(key)
                .arg(score_arg(min))
                .arg(score_arg(max))
                .arg("WITHSCORES"),
        )
    }

    // SCAN instead of KEYS keeps the server responsive on large keyspaces.
    // SCAN may repeat keys, so the result is sorted and deduplicated.
    fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = self.run(
                "SCAN",
                pattern,
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT),
            )?;
            keys.extend(batch);

            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort_unstable();
        keys.dedup();

        Ok(keys)
    }

    fn del(&self, keys: &[String]) -> Result<u64, BackendError> {
        let Some(first) = keys.first() else {
            return Ok(0);
        };

        self.run("DEL", first, redis::cmd("DEL").arg(keys))
    }

    fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let found: i64 = self.run("EXISTS", key, redis::cmd("EXISTS").arg(key))?;

        Ok(found > 0)
    }

    fn incr(&self, key: &str) -> Result<i64, BackendError> {
        self.run("INCR", key, redis::cmd("INCR").arg(key))
    }

    fn counter(&self, key: &str) -> Result<i64, BackendError> {
        let value: Option<i64> = self.run("GET", key, redis::cmd("GET").arg(key))?;

        Ok(value.unwrap_or(0))
    }
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

///
/// RedisSessionFactory
///
/// Opens one Redis connection per session. Connection details passed to
/// `connect` are overlaid on the factory's base config.
///

#[derive(Clone, Debug, Default)]
pub struct RedisSessionFactory {
    base: RedisConfig,
}

impl RedisSessionFactory {
    #[must_use]
    pub const fn new(base: RedisConfig) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(&self) -> &RedisConfig {
        &self.base
    }

    /// Effective config for one session.
    pub fn resolve(&self, details: &ConnectionDetails) -> Result<RedisConfig, InternalError> {
        let config = self.base.clone().apply(details)?;
        config.validate()?;

        Ok(config)
    }
}

impl SessionFactory for RedisSessionFactory {
    fn create_backend(
        &self,
        details: &ConnectionDetails,
    ) -> Result<Arc<dyn Backend>, InternalError> {
        let config = self.resolve(details)?;
        debug!(?config, "opening redis session");

        Ok(Arc::new(RedisBackend::connect(&config)?))
    }
}

fn score_arg(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        score.to_string()
    }
}

fn map_error(command: &'static str, key: &str, err: &RedisError) -> BackendError {
    if err.code() == Some("WRONGTYPE") {
        BackendError::WrongType {
            command,
            key: key.to_string(),
        }
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        BackendError::Unavailable(format!("{command}: {err}"))
    } else {
        BackendError::command(command, err.to_string())
    }
}
