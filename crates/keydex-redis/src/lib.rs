//! Redis adapter for keydex: a blocking `Backend` over one connection per
//! session, plus the config that says where that connection goes.

mod backend;
mod config;

pub use backend::{RedisBackend, RedisSessionFactory};
pub use config::{ConfigError, RedisConfig};
