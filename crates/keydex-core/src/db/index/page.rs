///
/// Page
///
/// Slice of a membership set: skip `offset`, return at most `limit`.
/// Pages are best-effort; they are only stable across calls when the
/// backend iterates sets in a stable order.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Page {
    offset: usize,
    limit: Option<usize>,
}

impl Page {
    /// Every member, unpaginated.
    pub const ALL: Self = Self {
        offset: 0,
        limit: None,
    };

    /// Build from caller-style `(offset, max)`. Non-positive values mean
    /// "no skip" and "no limit"; `(0, -1)` is `Page::ALL`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn new(offset: i64, max: i64) -> Self {
        Self {
            offset: if offset > 0 { offset as usize } else { 0 },
            limit: if max > 0 { Some(max as usize) } else { None },
        }
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether this page covers the whole set.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }
}
