//! Module: db::codec
//! Responsibility: deterministic mapping from (entity, property, value) to
//! store key strings.
//! Does not own: backend access or value-kind dispatch.
//! Boundary: the index writer and reader build every key through here.
//!
//! Key-space layout for one property:
//!
//! ```text
//! Person:age:30                 membership set for value 30
//! Person:age~sorted             ordering index (sorted set, one per property)
//! Person:age~generation         ordering-index write counter
//! Person:age~sorted~-inf:40.0   cached range-query result
//! ```
//!
//! Value components use the `application/x-www-form-urlencoded` alphabet, so
//! `:` `~` `%` `+` are always escaped and the encoding is injective.


use crate::{
    CACHE_DELIMITER, GENERATION_SUFFIX, ORDERING_SUFFIX,
    error::InternalError,
    model::{entity::EntityModel, property::PropertyModel},
    value::Value,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Bytes left unescaped: ASCII alphanumerics plus `.-*_`.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

/// Store key-scan wildcard substituted for `%` in caller patterns.
pub const SCAN_WILDCARD: &str = "*";

///
/// IndexNamespace
///
/// Key builder for one (entity, property) pair.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexNamespace {
    entity: &'static str,
    property: &'static str,
}

impl IndexNamespace {
    #[must_use]
    pub const fn new(entity: &EntityModel, property: &PropertyModel) -> Self {
        Self {
            entity: entity.name,
            property: property.name,
        }
    }

    /// `"{entity}:{property}:"`
    #[must_use]
    pub fn root(&self) -> String {
        format!("{}:{}:", self.entity, self.property)
    }

    /// Membership-set key for one value.
    pub fn encode_key(&self, value: &Value) -> Result<String, InternalError> {
        let text = value.stringify()?;

        Ok(self.root() + &percent_encode(&text))
    }

    /// Key-scan pattern; each literal `%` becomes the scan wildcard before
    /// the rest is encoded.
    #[must_use]
    pub fn build_pattern(&self, pattern: &str) -> String {
        self.root() + &percent_encode(&pattern.replace('%', SCAN_WILDCARD))
    }

    /// The single ordering-index key for this property.
    #[must_use]
    pub fn ordering_key(&self) -> String {
        format!(
            "{}:{}{CACHE_DELIMITER}{ORDERING_SUFFIX}",
            self.entity, self.property
        )
    }

    /// Counter bumped on every ordering-index write. Sits beside the
    /// ordering key, outside the cache pattern.
    #[must_use]
    pub fn generation_key(&self) -> String {
        format!(
            "{}:{}{CACHE_DELIMITER}{GENERATION_SUFFIX}",
            self.entity, self.property
        )
    }

    /// Pattern matching every cached range-query result of this property.
    #[must_use]
    pub fn cache_pattern(&self) -> String {
        format!("{}{CACHE_DELIMITER}{SCAN_WILDCARD}", self.ordering_key())
    }

    /// Cached result key for one inclusive score range.
    #[must_use]
    pub fn range_cache_key(&self, lower: Option<f64>, upper: Option<f64>) -> String {
        let lower = lower.map_or_else(|| "-inf".to_string(), |v| format!("{v:?}"));
        let upper = upper.map_or_else(|| "+inf".to_string(), |v| format!("{v:?}"));

        format!("{}{CACHE_DELIMITER}{lower}:{upper}", self.ordering_key())
    }
}

/// Form-encode text for use as a key component.
#[must_use]
pub fn percent_encode(text: &str) -> String {
    // '%' itself encodes to "%25", so "%20" can only come from a space.
    utf8_percent_encode(text, FORM_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// Invert [`percent_encode`].
pub fn decode_component(encoded: &str) -> Result<String, InternalError> {
    let spaced = encoded.replace('+', " ");

    percent_decode_str(&spaced)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|err| {
            InternalError::index_corruption(format!(
                "index key component '{encoded}' is not valid UTF-8: {err}"
            ))
        })
}
