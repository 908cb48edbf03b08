use crate::error::InternalError;
use derive_more::{Deref, Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

///
/// PrimaryKey
///
/// Integer identity of one entity instance within its entity's namespace.
/// Stored in index sets as its decimal text form.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deref,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct PrimaryKey(i64);

impl PrimaryKey {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Member string written into membership and ordering sets.
    #[must_use]
    pub fn to_member(self) -> String {
        self.0.to_string()
    }

    /// Decode a raw set member back into a typed key.
    pub fn from_member(member: &str) -> Result<Self, InternalError> {
        i64::from_str(member).map(Self).map_err(|err| {
            InternalError::index_corruption(format!(
                "index member '{member}' is not a primary key: {err}"
            ))
        })
    }

    /// Decode a batch of raw members, failing on the first corrupt entry.
    pub fn decode_members(members: Vec<String>) -> Result<Vec<Self>, InternalError> {
        members.iter().map(|m| Self::from_member(m)).collect()
    }
}
