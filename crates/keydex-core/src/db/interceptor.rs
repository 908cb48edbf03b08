use crate::traits::Indexable;
use std::{fmt, sync::Arc};

///
/// WriteKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{label}")
    }
}

///
/// EntityInterceptor
///
/// Hook consulted before a write reaches the index engine.
/// Returning `false` cancels the operation.
///

pub trait EntityInterceptor: Send + Sync {
    fn before_insert(&self, _entity: &dyn Indexable) -> bool {
        true
    }

    fn before_update(&self, _entity: &dyn Indexable) -> bool {
        true
    }

    fn before_delete(&self, _entity: &dyn Indexable) -> bool {
        true
    }
}

///
/// InterceptorChain
///
/// Interceptors in registration order. Evaluation stops at the first veto.
///

#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn EntityInterceptor>>,
}

impl InterceptorChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: Arc<dyn EntityInterceptor>) {
        self.interceptors.push(interceptor);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Whether every interceptor lets `kind` proceed for `entity`.
    #[must_use]
    pub fn allows(&self, kind: WriteKind, entity: &dyn Indexable) -> bool {
        self.interceptors.iter().all(|i| match kind {
            WriteKind::Insert => i.before_insert(entity),
            WriteKind::Update => i.before_update(entity),
            WriteKind::Delete => i.before_delete(entity),
        })
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

impl FromIterator<Arc<dyn EntityInterceptor>> for InterceptorChain {
    fn from_iter<T: IntoIterator<Item = Arc<dyn EntityInterceptor>>>(iter: T) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}
