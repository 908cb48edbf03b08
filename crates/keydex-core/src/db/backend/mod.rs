//! Module: db::backend
//! Responsibility: the command surface the index engine consumes from a
//! key-value store.
//! Does not own: connection lifecycle or wire protocol.
//! Boundary: adapters (`MemoryBackend`, the Redis adapter) implement
//! `Backend`; the engine only ever holds `Arc<dyn Backend>`.

mod glob;
mod memory;

pub use glob::glob_match;
pub use memory::MemoryBackend;

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use thiserror::Error as ThisError;

///
/// BackendError
///

#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend command {command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },

    #[error("key '{key}' holds a value of the wrong type for {command}")]
    WrongType { command: &'static str, key: String },
}

impl BackendError {
    pub fn command(command: &'static str, message: impl Into<String>) -> Self {
        Self::Command {
            command,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) => ErrorClass::Unavailable,
            Self::Command { .. } => ErrorClass::Unavailable,
            Self::WrongType { .. } => ErrorClass::Corruption,
        }
    }
}

impl From<BackendError> for InternalError {
    fn from(err: BackendError) -> Self {
        Self::new(err.class(), ErrorOrigin::Backend, err.to_string())
    }
}

///
/// Backend
///
/// Single-command primitives of a Redis-like store. Each call is one round
/// trip and is atomic on its own; sequences of calls are not.
///

pub trait Backend: Send + Sync {
    /// Add `member` to the set at `key`. Returns whether it was newly added.
    fn sadd(&self, key: &str, member: &str) -> Result<bool, BackendError>;

    /// Remove `member` from the set at `key`. Empty sets are dropped.
    fn srem(&self, key: &str, member: &str) -> Result<bool, BackendError>;

    /// All members of the set at `key`; empty when absent.
    fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError>;

    /// A slice of the set at `key`: skip `offset`, return at most `count`
    /// (all remaining when `None`). Iteration order is adapter-defined.
    fn smembers_page(
        &self,
        key: &str,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<String>, BackendError>;

    /// Set `member`'s score in the sorted set at `key`. Returns whether it
    /// was newly added (an existing member is overwritten in place).
    fn zadd(&self, key: &str, score: f64, member: &str) -> Result<bool, BackendError>;

    /// Remove `member` from the sorted set at `key`. Empty sets are dropped.
    fn zrem(&self, key: &str, member: &str) -> Result<bool, BackendError>;

    fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, BackendError>;

    /// Members with `min <= score <= max`, ascending by (score, member).
    fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, BackendError>;

    /// Increment the integer at `key`, creating it at 0 first when absent.
    /// Returns the new value.
    fn incr(&self, key: &str) -> Result<i64, BackendError>;

    /// The integer at `key`; 0 when absent.
    fn counter(&self, key: &str) -> Result<i64, BackendError>;

    /// Keys matching a glob pattern (`*`, `?`, `[...]`, `\` escapes).
    fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError>;

    /// Delete keys; returns how many existed.
    fn del(&self, keys: &[String]) -> Result<u64, BackendError>;

    fn exists(&self, key: &str) -> Result<bool, BackendError>;
}
