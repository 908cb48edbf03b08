use std::fmt::{self, Display};

///
/// PropertyModel
/// Runtime property metadata used by the index engine.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PropertyModel {
    /// Property name as used in index keys.
    pub name: &'static str,
    /// Declared value kind.
    pub kind: PropertyKind,
    /// Whether the persister maintains indexes for this property.
    pub indexed: bool,
}

impl PropertyModel {
    #[must_use]
    pub const fn new(name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            kind,
            indexed: false,
        }
    }

    #[must_use]
    pub const fn indexed(name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            kind,
            indexed: true,
        }
    }

    /// Whether values of this property get an ordering index.
    #[must_use]
    pub const fn is_orderable(&self) -> bool {
        matches!(self.kind, PropertyKind::Numeric)
    }
}

///
/// PropertyKind
///
/// Declared value kind of a property. Only `Numeric` properties get an
/// ordering index; `Temporal` properties are membership-indexed only.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropertyKind {
    Numeric,
    Temporal,
    Text,
    Bool,
    Opaque,
}

impl Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Numeric => "numeric",
            Self::Temporal => "temporal",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Opaque => "opaque",
        };
        write!(f, "{label}")
    }
}
