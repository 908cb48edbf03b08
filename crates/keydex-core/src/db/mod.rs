//! Index engine and its collaborators.
//!
//! Leaves first: `codec` maps values to store keys, `backend` is the command
//! port onto the key-value store, `index` maintains and reads membership and
//! ordering indexes, `interceptor` and `persister` form the write path, and
//! `session` binds a backend handle to the current unit of work.

pub mod backend;
pub mod codec;
pub mod index;
pub mod interceptor;
pub mod persister;
pub mod registry;
pub mod session;

pub use backend::{Backend, BackendError, MemoryBackend};
pub use codec::IndexNamespace;
pub use index::{CacheInvalidator, Page, PropertyIndexer};
pub use interceptor::{EntityInterceptor, InterceptorChain, WriteKind};
pub use persister::{Persister, WriteOutcome};
pub use registry::MappingContext;
pub use session::{
    ConnectionDetails, Datastore, MemorySessionFactory, Session, SessionFactory, SessionScope,
    clear_current_connection, current_session,
};
