use crate::{
    db::index::{Page, PropertyIndexer},
    error::InternalError,
    key::PrimaryKey,
    model::property::PropertyKind,
    obs::sink::{self, MetricsEvent, QueryKind},
    value::Value,
};
use tracing::{debug, trace, warn};

impl PropertyIndexer {
    /// Every primary key whose indexed value equals `value`.
    /// Order follows the backend's set iteration and is not guaranteed.
    pub fn query(&self, value: &Value) -> Result<Vec<PrimaryKey>, InternalError> {
        self.query_page(value, Page::ALL)
    }

    /// A best-effort page of the membership set for `value`.
    ///
    /// `Page::ALL` fetches the whole set; any other page asks the backend for
    /// that slice only. Pages are not a stable cursor unless the backend
    /// iterates sets in a stable order.
    pub fn query_page(&self, value: &Value, page: Page) -> Result<Vec<PrimaryKey>, InternalError> {
        let index_key = self.namespace.encode_key(value)?;

        let (members, kind) = if page.is_all() {
            (self.backend.smembers(&index_key)?, QueryKind::Equality)
        } else {
            (
                self.backend
                    .smembers_page(&index_key, page.offset(), page.limit())?,
                QueryKind::Paged,
            )
        };
        let keys = PrimaryKey::decode_members(members)?;

        trace!(index_key = %index_key, ?page, found = keys.len(), "membership lookup");
        sink::record(MetricsEvent::Query {
            entity: self.entity.name,
            kind,
            keys: keys.len() as u64,
        });

        Ok(keys)
    }

    /// Primary keys whose numeric value lies in `[lower, upper]`, ascending
    /// by value. `None` leaves that side open.
    ///
    /// Results are materialized under the ordering key's cache namespace and
    /// served from there until the next numeric write to this property. An
    /// answer that raced such a write is returned but not left cached.
    pub fn query_range(
        &self,
        lower: Option<&Value>,
        upper: Option<&Value>,
    ) -> Result<Vec<PrimaryKey>, InternalError> {
        let lower = lower.map(|v| self.range_score(v)).transpose()?;
        let upper = upper.map(|v| self.range_score(v)).transpose()?;

        if let (Some(lo), Some(hi)) = (lower, upper)
            && lo > hi
        {
            return Ok(Vec::new());
        }

        let cache_key = self.namespace.range_cache_key(lower, upper);
        let (min, max) = (
            lower.unwrap_or(f64::NEG_INFINITY),
            upper.unwrap_or(f64::INFINITY),
        );

        let members = if self.backend.exists(&cache_key)? {
            sink::record(MetricsEvent::RangeCacheHit {
                entity: self.entity.name,
            });
            self.backend.zrangebyscore(&cache_key, min, max)?
        } else {
            let generation_key = self.namespace.generation_key();
            let generation = self.backend.counter(&generation_key)?;
            let scored = self
                .backend
                .zrangebyscore(&self.namespace.ordering_key(), min, max)?;
            self.materialize(&cache_key, &scored)?;

            // A write between the read and the materialize may have
            // invalidated before the cache key existed.
            let current = self.backend.counter(&generation_key)?;
            if current != generation {
                debug!(cache_key = %cache_key, generation, current, "dropping stale range cache");
                self.backend.del(&[cache_key.clone()])?;
            }
            scored
        };

        let keys = PrimaryKey::decode_members(members.into_iter().map(|(m, _)| m).collect())?;

        trace!(cache_key = %cache_key, found = keys.len(), "range lookup");
        sink::record(MetricsEvent::Query {
            entity: self.entity.name,
            kind: QueryKind::Range,
            keys: keys.len() as u64,
        });

        Ok(keys)
    }

    // Write a range answer into its cache key. A partial write is removed so
    // a later hit never serves an incomplete answer.
    fn materialize(&self, cache_key: &str, scored: &[(String, f64)]) -> Result<(), InternalError> {
        for (member, score) in scored {
            if let Err(err) = self.backend.zadd(cache_key, *score, member) {
                if let Err(cleanup) = self.backend.del(&[cache_key.to_string()]) {
                    warn!(cache_key, error = %cleanup, "failed to drop partial range cache");
                }
                return Err(err.into());
            }
        }

        Ok(())
    }

    fn range_score(&self, value: &Value) -> Result<f64, InternalError> {
        match (value.kind(), value.score()) {
            (_, Some(score)) if score.is_finite() => Ok(score),
            (Some(PropertyKind::Temporal), _) => Err(InternalError::index_unsupported(format!(
                "range queries over temporal values are not supported ({}.{})",
                self.entity.name, self.property.name
            ))),
            _ => Err(InternalError::index_unsupported(format!(
                "range bound '{value}' for {}.{} is not a finite number",
                self.entity.name, self.property.name
            ))),
        }
    }
}
