//! Module: db::session
//! Responsibility: bind one backend session to the current unit of work.
//! Does not own: backend construction (`SessionFactory`) or write policy
//! (`Persister`).
//! Boundary: the binding is thread-local. It reaches child threads only
//! through `SessionScope`, and never flows back to the parent.

use crate::{
    db::{
        backend::{Backend, MemoryBackend},
        index::PropertyIndexer,
        interceptor::{EntityInterceptor, InterceptorChain},
        persister::Persister,
        registry::MappingContext,
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::entity::EntityModel,
};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
};
use thiserror::Error as ThisError;
use tracing::{debug, trace};

thread_local! {
    static CURRENT: RefCell<Option<Arc<Session>>> = const { RefCell::new(None) };
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

///
/// SessionError
///

#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("no datastore session found; call Datastore::connect before current_session")]
    NoSession,

    #[error("entity '{0}' is not mapped by this session")]
    UnmappedEntity(&'static str),
}

impl SessionError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::NoSession => ErrorClass::NoSession,
            Self::UnmappedEntity(_) => ErrorClass::InvariantViolation,
        }
    }
}

impl From<SessionError> for InternalError {
    fn from(err: SessionError) -> Self {
        Self::new(err.class(), ErrorOrigin::Session, err.to_string())
    }
}

///
/// ConnectionDetails
///
/// Ordered string settings handed to a `SessionFactory`. Adapters interpret
/// the keys they understand and ignore the rest.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectionDetails(BTreeMap<String, String>);

impl ConnectionDetails {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConnectionDetails {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

///
/// SessionFactory
///
/// Opens a backend handle for a set of connection details.
///

pub trait SessionFactory: Send + Sync {
    fn create_backend(&self, details: &ConnectionDetails)
    -> Result<Arc<dyn Backend>, InternalError>;
}

///
/// MemorySessionFactory
///
/// Hands every session the same in-process backend, so sessions opened by
/// one factory observe each other's writes.
///

#[derive(Clone, Debug, Default)]
pub struct MemorySessionFactory {
    backend: Arc<MemoryBackend>,
}

impl MemorySessionFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }
}

impl SessionFactory for MemorySessionFactory {
    fn create_backend(
        &self,
        _details: &ConnectionDetails,
    ) -> Result<Arc<dyn Backend>, InternalError> {
        Ok(self.backend.clone())
    }
}

///
/// Session
///
/// One open connection plus everything the write and read paths need.
///

pub struct Session {
    id: u64,
    backend: Arc<dyn Backend>,
    mapping: Arc<MappingContext>,
    interceptors: InterceptorChain,
    details: ConnectionDetails,
}

impl Session {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    #[must_use]
    pub fn mapping(&self) -> &MappingContext {
        &self.mapping
    }

    #[must_use]
    pub const fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    #[must_use]
    pub const fn details(&self) -> &ConnectionDetails {
        &self.details
    }

    /// Persister for a mapped entity, looked up by name.
    pub fn persister(&self, entity: &str) -> Result<Persister, InternalError> {
        let model = self.mapping.try_get(entity)?;

        Ok(self.build_persister(model))
    }

    /// Persister for a model; the model itself must be the mapped one.
    pub fn persister_for(&self, model: &'static EntityModel) -> Result<Persister, InternalError> {
        if !self.mapping.contains(model) {
            return Err(SessionError::UnmappedEntity(model.name).into());
        }

        Ok(self.build_persister(model))
    }

    /// Indexer for a mapped (entity, property) pair.
    pub fn indexer(&self, entity: &str, property: &str) -> Result<PropertyIndexer, InternalError> {
        let model = self.mapping.try_get(entity)?;

        PropertyIndexer::for_property(self.backend.clone(), model, property)
    }

    /// Unbind this session if it is the current one. Other bindings are
    /// left alone.
    pub fn disconnect(self: &Arc<Self>) {
        let unbound = CURRENT.with_borrow_mut(|slot| {
            let is_current = slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, self));
            if is_current {
                *slot = None;
            }
            is_current
        });

        if unbound {
            debug!(session = self.id, "session disconnected");
        }
    }

    fn build_persister(&self, model: &'static EntityModel) -> Persister {
        Persister::new(self.backend.clone(), model, self.interceptors.clone())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("entities", &self.mapping.len())
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

///
/// Datastore
///
/// Session source: mapping, interceptors, default connection details, and
/// the factory that opens backends.
///

pub struct Datastore<F: SessionFactory> {
    mapping: Arc<MappingContext>,
    interceptors: InterceptorChain,
    details: ConnectionDetails,
    factory: F,
}

impl<F: SessionFactory> Datastore<F> {
    #[must_use]
    pub fn new(mapping: MappingContext, factory: F) -> Self {
        Self {
            mapping: Arc::new(mapping),
            interceptors: InterceptorChain::new(),
            details: ConnectionDetails::new(),
            factory,
        }
    }

    /// Details used by [`connect`](Self::connect).
    #[must_use]
    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.details = details;
        self
    }

    /// Append an interceptor. Sessions opened afterwards consult it.
    pub fn add_entity_interceptor(&mut self, interceptor: Arc<dyn EntityInterceptor>) {
        self.interceptors.push(interceptor);
    }

    #[must_use]
    pub fn mapping(&self) -> &MappingContext {
        &self.mapping
    }

    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// Open a session with the configured details and bind it.
    pub fn connect(&self) -> Result<Arc<Session>, InternalError> {
        self.connect_with(self.details.clone())
    }

    /// Open a session and bind it to the current thread, replacing any
    /// previous binding.
    pub fn connect_with(&self, details: ConnectionDetails) -> Result<Arc<Session>, InternalError> {
        let backend = self.factory.create_backend(&details)?;
        let session = Arc::new(Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            mapping: self.mapping.clone(),
            interceptors: self.interceptors.clone(),
            details,
        });

        let replaced = CURRENT.with_borrow_mut(|slot| slot.replace(session.clone()));
        debug!(
            session = session.id,
            replaced = replaced.as_ref().map(|s| s.id),
            "session bound"
        );

        Ok(session)
    }
}

impl<F: SessionFactory + fmt::Debug> fmt::Debug for Datastore<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastore")
            .field("mapping", &self.mapping)
            .field("interceptors", &self.interceptors)
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

/// The session bound to the current unit of work.
pub fn current_session() -> Result<Arc<Session>, InternalError> {
    CURRENT
        .with_borrow(Clone::clone)
        .ok_or_else(|| SessionError::NoSession.into())
}

/// Unbind whatever session the current unit of work holds.
pub fn clear_current_connection() {
    if let Some(session) = CURRENT.with_borrow_mut(Option::take) {
        debug!(session = session.id, "session unbound");
    }
}

///
/// SessionScope
///
/// Snapshot of the current binding, carried into child threads.
///

#[derive(Clone, Debug, Default)]
pub struct SessionScope {
    session: Option<Arc<Session>>,
}

impl SessionScope {
    /// Capture the calling thread's binding (possibly none).
    #[must_use]
    pub fn capture() -> Self {
        Self {
            session: CURRENT.with_borrow(Clone::clone),
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Run `f` with the captured binding installed, then restore whatever
    /// the thread had before. Restoration happens even if `f` panics.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with_borrow_mut(|slot| {
            std::mem::replace(slot, self.session.clone())
        });
        trace!(
            session = self.session.as_ref().map(|s| s.id),
            "session scope entered"
        );

        let _guard = Restore(Some(previous));
        f()
    }

    /// Spawn a thread that inherits the calling thread's binding.
    pub fn spawn<R, T>(f: T) -> JoinHandle<R>
    where
        T: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let scope = Self::capture();

        thread::spawn(move || scope.run(f))
    }
}

// Puts the previous binding back when a scope ends.
struct Restore(Option<Option<Arc<Session>>>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            CURRENT.with_borrow_mut(|slot| *slot = previous);
        }
    }
}
