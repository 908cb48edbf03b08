use crate::model::{ModelError, property::PropertyModel, validate_name};

///
/// EntityModel
/// Minimal runtime model for one persistent entity.
///

#[derive(Debug, Eq, PartialEq)]
pub struct EntityModel {
    /// Stable external name; root of every index key for this entity.
    pub name: &'static str,
    /// Ordered property list.
    pub properties: &'static [PropertyModel],
}

impl EntityModel {
    #[must_use]
    pub const fn new(name: &'static str, properties: &'static [PropertyModel]) -> Self {
        Self { name, properties }
    }

    /// Look up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&'static PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Properties the persister keeps indexes for, in declaration order.
    pub fn indexed_properties(&self) -> impl Iterator<Item = &'static PropertyModel> {
        self.properties.iter().filter(|p| p.indexed)
    }

    /// Check names and property uniqueness before the model is registered.
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_name(self.name)?;

        for (i, property) in self.properties.iter().enumerate() {
            validate_name(property.name)?;

            if self.properties[..i].iter().any(|p| p.name == property.name) {
                return Err(ModelError::DuplicateProperty {
                    entity: self.name.to_string(),
                    property: property.name.to_string(),
                });
            }
        }

        Ok(())
    }
}
