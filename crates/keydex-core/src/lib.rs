//! Core runtime for keydex: entity metadata, values, the key codec, the
//! backend port, the property index engine, interceptors, and session binding.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod key;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

///
/// CONSTANTS
///

/// Delimiter between an ordering-index key and the suffix of a cached
/// range-query result. Never produced by the key codec for encoded values.
pub const CACHE_DELIMITER: char = '~';

/// Suffix that turns a property namespace into its ordering-index key.
pub const ORDERING_SUFFIX: &str = "sorted";

/// Suffix of the per-property counter bumped on every ordering-index write.
pub const GENERATION_SUFFIX: &str = "generation";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, backends, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        key::PrimaryKey,
        model::{entity::EntityModel, property::PropertyKind, property::PropertyModel},
        traits::Indexable,
        value::Value,
    };
}
