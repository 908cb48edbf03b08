//! Module: db::persister
//! Responsibility: the entity write path. Consults the interceptor chain,
//! then drives the property indexers for every indexed property.
//! Does not own: key layout, interceptor policy, or row storage.
//! Boundary: a vetoed write never reaches `PropertyIndexer`.

use crate::{
    db::{
        backend::Backend,
        index::PropertyIndexer,
        interceptor::{InterceptorChain, WriteKind},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::entity::EntityModel,
    obs::sink::{self, MetricsEvent},
    traits::Indexable,
};
use std::{fmt, sync::Arc};
use tracing::{debug, info};

///
/// WriteOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum WriteOutcome {
    Applied,
    Vetoed,
}

impl WriteOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

///
/// Persister
///
/// Write path for one entity model. Holds one indexer per indexed property.
///

pub struct Persister {
    model: &'static EntityModel,
    indexers: Vec<PropertyIndexer>,
    interceptors: InterceptorChain,
}

impl Persister {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        model: &'static EntityModel,
        interceptors: InterceptorChain,
    ) -> Self {
        let indexers = model
            .indexed_properties()
            .map(|property| PropertyIndexer::new(backend.clone(), model, property))
            .collect();

        Self {
            model,
            indexers,
            interceptors,
        }
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    /// Indexer of one indexed property, for queries.
    pub fn indexer(&self, property: &str) -> Result<&PropertyIndexer, InternalError> {
        self.indexers
            .iter()
            .find(|indexer| indexer.property().name == property)
            .ok_or_else(|| {
                InternalError::new(
                    ErrorClass::Unsupported,
                    ErrorOrigin::Persister,
                    format!(
                        "property '{property}' of '{}' is not indexed",
                        self.model.name
                    ),
                )
            })
    }

    pub fn insert(&self, entity: &dyn Indexable) -> Result<WriteOutcome, InternalError> {
        self.check(entity)?;
        if !self.admit(WriteKind::Insert, entity) {
            return Ok(WriteOutcome::Vetoed);
        }

        let key = entity.primary_key();
        for indexer in &self.indexers {
            indexer.index(&entity.value(indexer.property().name), key)?;
        }

        debug!(entity = self.model.name, %key, "inserted");
        Ok(WriteOutcome::Applied)
    }

    /// Move `old`'s index entries to `new`'s. Interceptors see `new`.
    pub fn update(
        &self,
        old: &dyn Indexable,
        new: &dyn Indexable,
    ) -> Result<WriteOutcome, InternalError> {
        self.check(old)?;
        self.check(new)?;

        let key = new.primary_key();
        if old.primary_key() != key {
            return Err(InternalError::persister_invariant(format!(
                "update of '{}' changes primary key {} to {key}",
                self.model.name,
                old.primary_key()
            )));
        }
        if !self.admit(WriteKind::Update, new) {
            return Ok(WriteOutcome::Vetoed);
        }

        for indexer in &self.indexers {
            let property = indexer.property().name;
            indexer.reindex(&old.value(property), &new.value(property), key)?;
        }

        debug!(entity = self.model.name, %key, "updated");
        Ok(WriteOutcome::Applied)
    }

    pub fn delete(&self, entity: &dyn Indexable) -> Result<WriteOutcome, InternalError> {
        self.check(entity)?;
        if !self.admit(WriteKind::Delete, entity) {
            return Ok(WriteOutcome::Vetoed);
        }

        let key = entity.primary_key();
        for indexer in &self.indexers {
            indexer.deindex(&entity.value(indexer.property().name), key)?;
        }

        debug!(entity = self.model.name, %key, "deleted");
        Ok(WriteOutcome::Applied)
    }

    fn admit(&self, kind: WriteKind, entity: &dyn Indexable) -> bool {
        if self.interceptors.allows(kind, entity) {
            return true;
        }

        info!(entity = self.model.name, key = %entity.primary_key(), %kind, "write vetoed");
        sink::record(MetricsEvent::Vetoed {
            entity: self.model.name,
            kind,
        });

        false
    }

    // Runs before any backend write so a bad instance never half-indexes:
    // every indexed value must match its declared kind and render to a key.
    fn check(&self, entity: &dyn Indexable) -> Result<(), InternalError> {
        if !std::ptr::eq(entity.model(), self.model) {
            return Err(InternalError::persister_invariant(format!(
                "instance of '{}' handed to the '{}' persister",
                entity.model().name,
                self.model.name
            )));
        }

        for indexer in &self.indexers {
            let property = indexer.property();
            let value = entity.value(property.name);

            if let Some(kind) = value.kind()
                && kind != property.kind
            {
                return Err(InternalError::new(
                    ErrorClass::Configuration,
                    ErrorOrigin::Persister,
                    format!(
                        "{}.{} is declared {} but holds a {kind} value",
                        self.model.name, property.name, property.kind
                    ),
                ));
            }

            if !value.is_null() {
                indexer.index_name(&value)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Persister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persister")
            .field("entity", &self.model.name)
            .field("indexers", &self.indexers)
            .field("interceptors", &self.interceptors)
            .finish()
    }
}
