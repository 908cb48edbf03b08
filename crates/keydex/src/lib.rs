//! ## Crate layout
//! - `core`: entity models, values, the key codec, the index engine,
//!   interceptors, sessions, and observability.
//! - `redis`: Redis backend and session factory (feature `redis`).
//!
//! The `prelude` module carries what application code needs to map, write,
//! and query entities.

pub use keydex_core as core;
#[cfg(feature = "redis")]
pub use keydex_redis as redis;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::error::InternalError as Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        db::{
            ConnectionDetails, Datastore, EntityInterceptor, MappingContext,
            MemorySessionFactory, Page, Persister, PropertyIndexer, Session, SessionScope,
            WriteOutcome, clear_current_connection, current_session,
        },
        prelude::*,
        traits::EntityRecord,
    };
    #[cfg(feature = "redis")]
    pub use crate::redis::{RedisConfig, RedisSessionFactory};
}
