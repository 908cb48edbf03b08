use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{ModelError, entity::EntityModel},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("entity '{0}' not mapped")]
    EntityNotFound(String),

    #[error("entity '{0}' already mapped")]
    EntityAlreadyRegistered(String),

    #[error(transparent)]
    InvalidModel(#[from] ModelError),
}

impl RegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::EntityNotFound(_) | Self::InvalidModel(_) => ErrorClass::Configuration,
            Self::EntityAlreadyRegistered(_) => ErrorClass::InvariantViolation,
        }
    }
}

impl From<RegistryError> for InternalError {
    fn from(err: RegistryError) -> Self {
        Self::new(err.class(), ErrorOrigin::Registry, err.to_string())
    }
}

///
/// MappingContext
///
/// The set of entity models known to a datastore, keyed by entity name.
/// Models are validated on registration; a context never holds a model whose
/// names would produce ambiguous index keys.
///

#[derive(Clone, Debug, Default)]
pub struct MappingContext {
    entities: BTreeMap<&'static str, &'static EntityModel>,
}

impl MappingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a model.
    pub fn register(&mut self, model: &'static EntityModel) -> Result<(), InternalError> {
        model.validate().map_err(RegistryError::from)?;

        if self.entities.contains_key(model.name) {
            return Err(RegistryError::EntityAlreadyRegistered(model.name.to_string()).into());
        }

        self.entities.insert(model.name, model);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, model: &'static EntityModel) -> Result<Self, InternalError> {
        self.register(model)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, entity: &str) -> Option<&'static EntityModel> {
        self.entities.get(entity).copied()
    }

    pub fn try_get(&self, entity: &str) -> Result<&'static EntityModel, InternalError> {
        self.get(entity)
            .ok_or_else(|| RegistryError::EntityNotFound(entity.to_string()).into())
    }

    /// Whether this exact model (not merely its name) is registered.
    #[must_use]
    pub fn contains(&self, model: &'static EntityModel) -> bool {
        self.get(model.name)
            .is_some_and(|mapped| std::ptr::eq(mapped, model))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static EntityModel> + '_ {
        self.entities.values().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
