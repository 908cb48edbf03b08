use crate::{key::PrimaryKey, model::entity::EntityModel, value::Value};
use std::collections::BTreeMap;

///
/// Indexable
///
/// An entity instance as seen by interceptors and the persister: its model,
/// its identity, and a way to read each property's current value.
///

pub trait Indexable {
    fn model(&self) -> &'static EntityModel;

    fn primary_key(&self) -> PrimaryKey;

    /// Current value of a property; `Value::Null` when unset.
    fn value(&self, property: &str) -> Value;
}

///
/// EntityRecord
///
/// Map-backed `Indexable` for callers without a typed entity struct.
///

#[derive(Clone, Debug)]
pub struct EntityRecord {
    model: &'static EntityModel,
    key: PrimaryKey,
    values: BTreeMap<&'static str, Value>,
}

impl EntityRecord {
    #[must_use]
    pub const fn new(model: &'static EntityModel, key: PrimaryKey) -> Self {
        Self {
            model,
            key,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter. Unknown property names are kept but never
    /// indexed, since the persister only walks the model's properties.
    #[must_use]
    pub fn with(mut self, property: &'static str, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: &'static str, value: impl Into<Value>) {
        self.values.insert(property, value.into());
    }
}

impl Indexable for EntityRecord {
    fn model(&self) -> &'static EntityModel {
        self.model
    }

    fn primary_key(&self) -> PrimaryKey {
        self.key
    }

    fn value(&self, property: &str) -> Value {
        self.values.get(property).cloned().unwrap_or(Value::Null)
    }
}
