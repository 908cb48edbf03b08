use keydex_core::{db::ConnectionDetails, error::InternalError};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::Deserialize;
use std::{str::FromStr, time::Duration};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid value '{value}' for redis setting '{key}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("redis host must not be empty")]
    EmptyHost,

    #[error("redis port must not be 0")]
    ZeroPort,

    #[error("redis timeout must be positive")]
    ZeroTimeout,

    #[error("redis username must not be empty")]
    EmptyUsername,

    #[error("failed to parse redis config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

///
/// RedisConfig
///
/// Where and how to reach one Redis server.
/// Built from `ConnectionDetails` keys (`host`, `port`, `db`, `username`,
/// `password`, `timeout_ms`) or from the `[redis]` table of a TOML file.
///

#[derive(Clone, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            username: None,
            password: None,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    redis: RedisConfig,
}

impl RedisConfig {
    /// Parse the `[redis]` table of a TOML document. A missing table yields
    /// the defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        file.redis.validate()?;

        Ok(file.redis)
    }

    /// Overlay the recognized keys of `details` onto this config.
    pub fn apply(mut self, details: &ConnectionDetails) -> Result<Self, ConfigError> {
        for (key, value) in details.iter() {
            match key {
                "host" => self.host = value.to_string(),
                "port" => self.port = parse("port", value)?,
                "db" => self.db = parse("db", value)?,
                "username" => self.username = Some(value.to_string()),
                "password" => self.password = Some(value.to_string()),
                "timeout_ms" => self.timeout_ms = parse("timeout_ms", value)?,
                _ => {}
            }
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.username.as_deref() == Some("") {
            return Err(ConfigError::EmptyUsername);
        }

        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Connection parameters for `redis::Client::open`. Credentials are
    /// passed as fields, so they need no URL escaping.
    #[must_use]
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: self.username.clone(),
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }

    /// Display form of the target with the password masked, for logs.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(_)) => format!("{user}:***@"),
            (None, Some(_)) => ":***@".to_string(),
            (Some(user), None) => format!("{user}@"),
            (None, None) => String::new(),
        };

        format!("redis://{auth}{}:{}/{}", self.host, self.port, self.db)
    }
}

impl TryFrom<&ConnectionDetails> for RedisConfig {
    type Error = ConfigError;

    fn try_from(details: &ConnectionDetails) -> Result<Self, Self::Error> {
        let config = Self::default().apply(details)?;
        config.validate()?;

        Ok(config)
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &self.redacted_url())
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
