//! Module: db::index
//! Responsibility: maintain and read the membership and ordering indexes of
//! one entity property.
//! Does not own: key layout (`db::codec`) or interceptor policy (`db::persister`).
//! Boundary: the persister writes through `PropertyIndexer`; query code reads
//! through it.
//!
//! No operation here is atomic across backend commands. A reader racing a
//! writer may see the membership set updated before the ordering index, or a
//! cached range result that is about to be invalidated. Callers needing more
//! serialize writes per (entity, property) themselves.

mod cache;
mod page;
mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use cache::CacheInvalidator;
pub use page::Page;

use crate::{
    db::{backend::Backend, codec::IndexNamespace},
    error::InternalError,
    model::{entity::EntityModel, property::PropertyModel},
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// PropertyIndexer
///
/// Index writer and reader for one (entity, property) pair.
///

#[derive(Clone)]
pub struct PropertyIndexer {
    backend: Arc<dyn Backend>,
    entity: &'static EntityModel,
    property: &'static PropertyModel,
    namespace: IndexNamespace,
}

impl PropertyIndexer {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        entity: &'static EntityModel,
        property: &'static PropertyModel,
    ) -> Self {
        Self {
            backend,
            entity,
            property,
            namespace: IndexNamespace::new(entity, property),
        }
    }

    /// Build an indexer for a property looked up by name.
    pub fn for_property(
        backend: Arc<dyn Backend>,
        entity: &'static EntityModel,
        property: &str,
    ) -> Result<Self, InternalError> {
        let property = entity.property(property).ok_or_else(|| {
            InternalError::index_unsupported(format!(
                "entity '{}' has no property '{property}'",
                entity.name
            ))
        })?;

        Ok(Self::new(backend, entity, property))
    }

    #[must_use]
    pub const fn entity(&self) -> &'static EntityModel {
        self.entity
    }

    #[must_use]
    pub const fn property(&self) -> &'static PropertyModel {
        self.property
    }

    #[must_use]
    pub const fn namespace(&self) -> &IndexNamespace {
        &self.namespace
    }

    /// Raw membership key for `value` (diagnostics).
    pub fn index_name(&self, value: &Value) -> Result<String, InternalError> {
        self.namespace.encode_key(value)
    }

    /// Wildcard key pattern for bulk enumeration; `%` matches any run.
    #[must_use]
    pub fn index_pattern(&self, pattern: &str) -> String {
        self.namespace.build_pattern(pattern)
    }

    /// The property's single ordering-index key.
    #[must_use]
    pub fn ordering_key(&self) -> String {
        self.namespace.ordering_key()
    }

    /// Drop every cached range result of this property.
    pub fn invalidate_cache(&self) -> Result<u64, InternalError> {
        self.invalidator().invalidate()
    }

    fn invalidator(&self) -> CacheInvalidator<'_> {
        CacheInvalidator::new(self.backend.as_ref(), self.entity.name, &self.namespace)
    }
}

impl fmt::Debug for PropertyIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyIndexer")
            .field("entity", &self.entity.name)
            .field("property", &self.property.name)
            .finish_non_exhaustive()
    }
}
