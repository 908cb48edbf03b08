use crate::{
    db::{backend::Backend, codec::IndexNamespace},
    error::InternalError,
    obs::sink::{self, MetricsEvent},
};
use tracing::debug;

///
/// CacheInvalidator
///
/// Deletes every cached range-query result under one property's ordering
/// key. Cached results are disposable: dropping them only costs a cache miss.
///

pub struct CacheInvalidator<'a> {
    backend: &'a dyn Backend,
    entity: &'static str,
    namespace: &'a IndexNamespace,
}

impl<'a> CacheInvalidator<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a dyn Backend,
        entity: &'static str,
        namespace: &'a IndexNamespace,
    ) -> Self {
        Self {
            backend,
            entity,
            namespace,
        }
    }

    /// Delete all matching cache keys and return how many existed.
    /// Nothing to delete is success, not an error.
    pub fn invalidate(&self) -> Result<u64, InternalError> {
        let pattern = self.namespace.cache_pattern();
        let stale = self.backend.keys(&pattern)?;

        let deleted = if stale.is_empty() {
            0
        } else {
            self.backend.del(&stale)?
        };

        if deleted > 0 {
            debug!(pattern = %pattern, deleted, "invalidated cached range results");
        }
        sink::record(MetricsEvent::CacheInvalidated {
            entity: self.entity,
            keys: deleted,
        });

        Ok(deleted)
    }
}
