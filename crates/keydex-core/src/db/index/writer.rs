use crate::{
    db::index::PropertyIndexer,
    error::InternalError,
    key::PrimaryKey,
    obs::sink::{self, MetricsEvent},
    value::Value,
};
use tracing::{debug, trace};

impl PropertyIndexer {
    /// Index `value` for `key`.
    ///
    /// Adds `key` to the membership set of `value`. Numeric values also set
    /// `key`'s score in the ordering index (overwriting any previous score)
    /// and drop cached range results. Temporal values get membership only.
    /// `Null` is a no-op.
    ///
    /// Each step is its own backend round trip; a failure part-way leaves the
    /// earlier steps applied.
    pub fn index(&self, value: &Value, key: PrimaryKey) -> Result<(), InternalError> {
        if value.is_null() {
            trace!(entity = self.entity.name, property = self.property.name, %key, "null value not indexed");
            return Ok(());
        }

        let member = key.to_member();
        let index_key = self.namespace.encode_key(value)?;
        self.backend.sadd(&index_key, &member)?;

        let score = value.score();
        if let Some(score) = score {
            let ordering_key = self.namespace.ordering_key();
            self.backend.zadd(&ordering_key, score, &member)?;
            self.ordering_changed()?;
        }

        debug!(
            entity = self.entity.name,
            property = self.property.name,
            %key,
            index_key = %index_key,
            ordered = score.is_some(),
            "indexed value"
        );
        sink::record(MetricsEvent::IndexInsert {
            entity: self.entity.name,
            ordered: score.is_some(),
        });

        Ok(())
    }

    /// Remove `key`'s entries for `value`: the membership set of `value`,
    /// and for numeric values the ordering-index score, followed by cache
    /// invalidation. `Null` is a no-op.
    pub fn deindex(&self, value: &Value, key: PrimaryKey) -> Result<(), InternalError> {
        if value.is_null() {
            return Ok(());
        }

        let member = key.to_member();
        let index_key = self.namespace.encode_key(value)?;
        self.backend.srem(&index_key, &member)?;

        let ordered = value.is_numeric();
        if ordered {
            self.backend.zrem(&self.namespace.ordering_key(), &member)?;
            self.ordering_changed()?;
        }

        debug!(
            entity = self.entity.name,
            property = self.property.name,
            %key,
            index_key = %index_key,
            "removed index entry"
        );
        sink::record(MetricsEvent::IndexRemove {
            entity: self.entity.name,
            ordered,
        });

        Ok(())
    }

    /// Move `key` from `old`'s entries to `new`'s. Values that render to the
    /// same index key touch nothing.
    ///
    /// When `old` is numeric and `new` is not, the ordering-index entry is
    /// removed; when both are numeric the score is overwritten in place.
    pub fn reindex(&self, old: &Value, new: &Value, key: PrimaryKey) -> Result<(), InternalError> {
        if same_index_entry(old, new) {
            return Ok(());
        }

        if new.is_numeric() && old.is_numeric() {
            // zadd in index() overwrites the score, so only membership moves.
            let old_key = self.namespace.encode_key(old)?;
            self.backend.srem(&old_key, &key.to_member())?;
            sink::record(MetricsEvent::IndexRemove {
                entity: self.entity.name,
                ordered: false,
            });
        } else {
            self.deindex(old, key)?;
        }

        self.index(new, key)
    }

    // Bump the generation before invalidating, so a range query that read
    // the ordering index before this write can tell its answer is stale.
    fn ordering_changed(&self) -> Result<(), InternalError> {
        let generation = self.backend.incr(&self.namespace.generation_key())?;
        trace!(
            entity = self.entity.name,
            property = self.property.name,
            generation,
            "ordering index changed"
        );
        self.invalidator().invalidate()?;

        Ok(())
    }
}

// Compares rendered forms, not `Value` equality: `0.0 == -0.0` but they index
// under different keys. Unrenderable values never compare equal.
fn same_index_entry(old: &Value, new: &Value) -> bool {
    if old.is_null() || new.is_null() {
        return old.is_null() && new.is_null();
    }

    match (old.stringify(), new.stringify()) {
        (Ok(old), Ok(new)) => old == new,
        _ => false,
    }
}
