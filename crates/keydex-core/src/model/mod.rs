//! Runtime mapping metadata.
//!
//! Types in `model` describe entity shapes as the index engine consumes them:
//! a named entity, its properties, and each property's declared value kind.
//! They are `'static`, read-only, and owned by the surrounding mapping
//! context; the engine never mutates them.
//!
//! In general:
//! - The mapping layer defines *what exists*
//! - `model` defines *what gets indexed*
pub mod entity;
pub mod property;

use thiserror::Error as ThisError;

///
/// ModelError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ModelError {
    #[error("model name must not be empty")]
    EmptyName,

    #[error("model name '{name}' contains reserved character '{reserved}'")]
    ReservedCharacter { name: String, reserved: char },

    #[error("entity '{entity}' declares property '{property}' more than once")]
    DuplicateProperty { entity: String, property: String },
}

/// Characters that would make an index key ambiguous or turn it into a
/// key-scan pattern.
const RESERVED: &[char] = &[':', crate::CACHE_DELIMITER, '*', '?', '[', ']', ' '];

/// Validate an entity or property name for use inside store keys.
pub(crate) fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.is_empty() {
        return Err(ModelError::EmptyName);
    }
    if let Some(reserved) = name.chars().find(|c| RESERVED.contains(c)) {
        return Err(ModelError::ReservedCharacter {
            name: name.to_string(),
            reserved,
        });
    }

    Ok(())
}
