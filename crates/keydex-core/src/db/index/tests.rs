use super::*;
use crate::{
    db::backend::{Backend, BackendError, MemoryBackend},
    error::{ErrorClass, ErrorOrigin},
    key::PrimaryKey,
    model::property::PropertyKind,
};
use std::collections::BTreeSet;
use time::OffsetDateTime;

static PERSON: EntityModel = EntityModel::new(
    "Person",
    &[
        PropertyModel::indexed("name", PropertyKind::Text),
        PropertyModel::indexed("age", PropertyKind::Numeric),
        PropertyModel::indexed("born", PropertyKind::Temporal),
    ],
);

fn setup(property: &str) -> (Arc<MemoryBackend>, PropertyIndexer) {
    let backend = Arc::new(MemoryBackend::new());
    let indexer = PropertyIndexer::for_property(backend.clone(), &PERSON, property)
        .expect("property should exist");

    (backend, indexer)
}

fn pk(id: i64) -> PrimaryKey {
    PrimaryKey::new(id)
}

fn key_set(keys: Vec<PrimaryKey>) -> BTreeSet<i64> {
    keys.into_iter().map(PrimaryKey::get).collect()
}

// Seed a cached range result the way a prior range query would have.
fn seed_cache(backend: &MemoryBackend, suffix: &str) {
    backend
        .zadd(&format!("Person:age~sorted~{suffix}"), 1.0, "99")
        .unwrap();
}

#[test]
fn query_includes_key_right_after_index() {
    let (_, indexer) = setup("name");

    indexer.index(&Value::from("Bob"), pk(7)).unwrap();

    assert_eq!(indexer.query(&Value::from("Bob")).unwrap(), vec![pk(7)]);
    assert!(indexer.query(&Value::from("Alice")).unwrap().is_empty());
}

#[test]
fn person_age_scenario() {
    let (backend, indexer) = setup("age");

    indexer.index(&Value::Int(30), pk(1)).unwrap();
    assert_eq!(indexer.query(&Value::Int(30)).unwrap(), vec![pk(1)]);

    indexer.index(&Value::Int(30), pk(2)).unwrap();
    assert_eq!(
        key_set(indexer.query(&Value::Int(30)).unwrap()),
        BTreeSet::from([1, 2])
    );

    seed_cache(&backend, "-inf:+inf");
    indexer.index(&Value::Int(40), pk(1)).unwrap();

    assert_eq!(backend.zscore("Person:age~sorted", "1").unwrap(), Some(40.0));
    assert!(backend.keys("Person:age~sorted~*").unwrap().is_empty());
}

#[test]
fn numeric_reindex_overwrites_single_ordering_entry() {
    let (backend, indexer) = setup("age");

    indexer.index(&Value::Int(30), pk(1)).unwrap();
    indexer.index(&Value::Float(31.5), pk(1)).unwrap();

    let entries = backend
        .zrangebyscore(&indexer.ordering_key(), f64::NEG_INFINITY, f64::INFINITY)
        .unwrap();
    assert_eq!(entries, vec![("1".to_string(), 31.5)]);
}

#[test]
fn numeric_index_drops_every_cached_range() {
    let (backend, indexer) = setup("age");
    seed_cache(&backend, "18.0:+inf");
    seed_cache(&backend, "-inf:65.0");

    indexer.index(&Value::Uint(20), pk(3)).unwrap();

    assert!(backend.keys(&indexer.namespace().cache_pattern()).unwrap().is_empty());
    assert!(backend.exists("Person:age~sorted").unwrap());
}

#[test]
fn invalidation_with_nothing_cached_is_silent() {
    let (_, indexer) = setup("age");

    assert_eq!(indexer.invalidate_cache().unwrap(), 0);
    indexer.index(&Value::Int(5), pk(1)).unwrap();
}

#[test]
fn text_values_skip_the_ordering_index() {
    let (backend, indexer) = setup("name");
    seed_cache(&backend, "-inf:+inf");

    indexer.index(&Value::from("30"), pk(1)).unwrap();

    assert!(!backend.exists("Person:name~sorted").unwrap());
    assert_eq!(backend.keys("Person:age~sorted~*").unwrap().len(), 1);
}

#[test]
fn temporal_values_get_membership_only() {
    let (backend, indexer) = setup("born");
    let born = Value::from(OffsetDateTime::from_unix_timestamp(0).unwrap());

    indexer.index(&born, pk(4)).unwrap();

    assert_eq!(indexer.query(&born).unwrap(), vec![pk(4)]);
    assert!(!backend.exists(&indexer.ordering_key()).unwrap());
    assert_eq!(
        indexer.index_name(&born).unwrap(),
        "Person:born:1970-01-01T00%3A00%3A00Z"
    );
}

#[test]
fn null_is_not_indexed() {
    let (backend, indexer) = setup("age");

    indexer.index(&Value::Null, pk(1)).unwrap();
    indexer.deindex(&Value::Null, pk(1)).unwrap();

    assert!(backend.is_empty());
}

#[test]
fn unrenderable_value_is_a_configuration_error() {
    let (backend, indexer) = setup("name");

    let err = indexer.index(&Value::Blob(vec![1, 2]), pk(1)).unwrap_err();

    assert_eq!(err.class, ErrorClass::Configuration);
    assert_eq!(err.origin, ErrorOrigin::Codec);
    assert!(backend.is_empty());
}

#[test]
fn pagination_returns_bounded_slices() {
    let (_, indexer) = setup("age");
    for id in 1..=5 {
        indexer.index(&Value::Int(30), pk(id)).unwrap();
    }
    let thirty = Value::Int(30);

    assert_eq!(indexer.query_page(&thirty, Page::new(0, -1)).unwrap().len(), 5);
    assert_eq!(indexer.query_page(&thirty, Page::new(0, 2)).unwrap().len(), 2);
    assert_eq!(
        indexer.query_page(&thirty, Page::new(1, 2)).unwrap(),
        vec![pk(2), pk(3)]
    );
    assert_eq!(
        indexer.query_page(&thirty, Page::new(3, 0)).unwrap(),
        vec![pk(4), pk(5)]
    );
    assert!(indexer.query_page(&thirty, Page::new(9, 2)).unwrap().is_empty());
}

#[test]
fn index_name_and_pattern_expose_raw_keys() {
    let (_, indexer) = setup("name");

    assert_eq!(
        indexer.index_name(&Value::from("Ann Lee")).unwrap(),
        "Person:name:Ann+Lee"
    );
    assert_eq!(indexer.index_pattern("A%B"), "Person:name:A*B");
}

#[test]
fn index_pattern_enumerates_matching_memberships() {
    let (backend, indexer) = setup("name");
    indexer.index(&Value::from("AxB"), pk(1)).unwrap();
    indexer.index(&Value::from("AyyB"), pk(2)).unwrap();
    indexer.index(&Value::from("AyyC"), pk(3)).unwrap();

    let keys = backend.keys(&indexer.index_pattern("A%B")).unwrap();

    assert_eq!(keys, vec!["Person:name:AxB", "Person:name:AyyB"]);
}

#[test]
fn deindex_removes_membership_and_score() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(30), pk(1)).unwrap();
    indexer.index(&Value::Int(30), pk(2)).unwrap();

    indexer.deindex(&Value::Int(30), pk(1)).unwrap();

    assert_eq!(indexer.query(&Value::Int(30)).unwrap(), vec![pk(2)]);
    assert_eq!(backend.zscore("Person:age~sorted", "1").unwrap(), None);
}

#[test]
fn reindex_evicts_old_membership() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(30), pk(1)).unwrap();
    seed_cache(&backend, "-inf:+inf");

    indexer.reindex(&Value::Int(30), &Value::Int(40), pk(1)).unwrap();

    assert!(indexer.query(&Value::Int(30)).unwrap().is_empty());
    assert_eq!(indexer.query(&Value::Int(40)).unwrap(), vec![pk(1)]);
    assert_eq!(backend.zscore("Person:age~sorted", "1").unwrap(), Some(40.0));
    assert!(backend.keys("Person:age~sorted~*").unwrap().is_empty());
}

#[test]
fn reindex_to_null_clears_everything() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(30), pk(1)).unwrap();

    indexer.reindex(&Value::Int(30), &Value::Null, pk(1)).unwrap();

    // Only the write counter outlives the entries.
    assert_eq!(backend.keys("Person:*").unwrap(), vec!["Person:age~generation"]);
}

#[test]
fn reindex_with_equal_values_writes_nothing() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(30), pk(1)).unwrap();
    seed_cache(&backend, "-inf:+inf");

    indexer.reindex(&Value::Int(30), &Value::Int(30), pk(1)).unwrap();

    assert_eq!(backend.keys("Person:age~sorted~*").unwrap().len(), 1);
}

#[test]
fn reindex_between_signed_zeros_moves_membership() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Float(0.0), pk(1)).unwrap();

    indexer
        .reindex(&Value::Float(0.0), &Value::Float(-0.0), pk(1))
        .unwrap();

    assert!(indexer.query(&Value::Float(0.0)).unwrap().is_empty());
    assert_eq!(indexer.query(&Value::Float(-0.0)).unwrap(), vec![pk(1)]);
    assert!(!backend.exists("Person:age:0.0").unwrap());
    assert_eq!(backend.zscore("Person:age~sorted", "1").unwrap(), Some(0.0));
}

#[test]
fn numeric_writes_bump_the_generation() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(30), pk(1)).unwrap();
    indexer.index(&Value::Int(40), pk(1)).unwrap();
    indexer.deindex(&Value::Int(40), pk(1)).unwrap();

    assert_eq!(backend.counter("Person:age~generation").unwrap(), 3);

    let (backend, indexer) = setup("name");
    indexer.index(&Value::from("Ann"), pk(1)).unwrap();
    assert!(!backend.exists("Person:name~generation").unwrap());
}

#[test]
fn range_query_orders_by_score_and_caches() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(40), pk(1)).unwrap();
    indexer.index(&Value::Int(20), pk(2)).unwrap();
    indexer.index(&Value::Int(30), pk(3)).unwrap();
    indexer.index(&Value::Int(70), pk(4)).unwrap();

    let keys = indexer
        .query_range(Some(&Value::Int(18)), Some(&Value::Int(65)))
        .unwrap();

    assert_eq!(keys, vec![pk(2), pk(3), pk(1)]);
    assert_eq!(
        backend.keys("Person:age~sorted~*").unwrap(),
        vec!["Person:age~sorted~18.0:65.0"]
    );
}

#[test]
fn range_query_is_served_from_cache_until_next_write() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(20), pk(1)).unwrap();
    assert_eq!(indexer.query_range(None, None).unwrap(), vec![pk(1)]);

    // Bypass the indexer so the cache goes stale.
    backend.zadd("Person:age~sorted", 25.0, "2").unwrap();
    assert_eq!(indexer.query_range(None, None).unwrap(), vec![pk(1)]);

    indexer.index(&Value::Int(30), pk(3)).unwrap();
    assert_eq!(
        indexer.query_range(None, None).unwrap(),
        vec![pk(1), pk(2), pk(3)]
    );
}

#[test]
fn open_and_inverted_ranges() {
    let (backend, indexer) = setup("age");
    indexer.index(&Value::Int(20), pk(1)).unwrap();
    indexer.index(&Value::Int(50), pk(2)).unwrap();

    assert_eq!(
        indexer.query_range(Some(&Value::Int(30)), None).unwrap(),
        vec![pk(2)]
    );
    assert_eq!(
        indexer.query_range(None, Some(&Value::Float(20.0))).unwrap(),
        vec![pk(1)]
    );
    assert!(
        indexer
            .query_range(Some(&Value::Int(60)), Some(&Value::Int(10)))
            .unwrap()
            .is_empty()
    );
    assert!(!backend.exists("Person:age~sorted~60.0:10.0").unwrap());
}

#[test]
fn empty_range_results_are_not_cached() {
    let (backend, indexer) = setup("age");

    assert!(indexer.query_range(Some(&Value::Int(1)), None).unwrap().is_empty());
    assert!(backend.keys("Person:age~sorted~*").unwrap().is_empty());
}

#[test]
fn range_bounds_must_be_finite_numbers() {
    let (_, indexer) = setup("born");
    let born = Value::from(OffsetDateTime::UNIX_EPOCH);

    let temporal = indexer.query_range(Some(&born), None).unwrap_err();
    assert_eq!(temporal.class, ErrorClass::Unsupported);
    assert!(temporal.message.contains("temporal"));

    let text = indexer.query_range(None, Some(&Value::from("x"))).unwrap_err();
    assert_eq!(text.class, ErrorClass::Unsupported);
}

#[test]
fn corrupt_members_surface_as_index_corruption() {
    let (backend, indexer) = setup("name");
    backend.sadd("Person:name:Bob", "not-a-key").unwrap();

    let err = indexer.query(&Value::from("Bob")).unwrap_err();

    assert_eq!(err.class, ErrorClass::Corruption);
    assert_eq!(err.origin, ErrorOrigin::Index);
}

#[test]
fn unknown_property_is_rejected() {
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());

    let err = PropertyIndexer::for_property(backend, &PERSON, "height").unwrap_err();
    assert!(err.message.contains("height"));
}

///
/// FailingBackend
///
/// Delegates to a memory backend but fails one named command.
///

struct FailingBackend {
    inner: MemoryBackend,
    fail: &'static str,
}

impl FailingBackend {
    fn check(&self, command: &'static str) -> Result<(), BackendError> {
        if self.fail == command {
            Err(BackendError::Unavailable(format!("{command} refused")))
        } else {
            Ok(())
        }
    }
}

impl Backend for FailingBackend {
    fn sadd(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.check("SADD")?;
        self.inner.sadd(key, member)
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.check("SREM")?;
        self.inner.srem(key, member)
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
        self.check("SMEMBERS")?;
        self.inner.smembers(key)
    }

    fn smembers_page(
        &self,
        key: &str,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<String>, BackendError> {
        self.check("SORT")?;
        self.inner.smembers_page(key, offset, count)
    }

    fn zadd(&self, key: &str, score: f64, member: &str) -> Result<bool, BackendError> {
        self.check("ZADD")?;
        self.inner.zadd(key, score, member)
    }

    fn zrem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.check("ZREM")?;
        self.inner.zrem(key, member)
    }

    fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, BackendError> {
        self.inner.zscore(key, member)
    }

    fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, BackendError> {
        self.inner.zrangebyscore(key, min, max)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        self.check("KEYS")?;
        self.inner.keys(pattern)
    }

    fn del(&self, keys: &[String]) -> Result<u64, BackendError> {
        self.check("DEL")?;
        self.inner.del(keys)
    }

    fn exists(&self, key: &str) -> Result<bool, BackendError> {
        self.inner.exists(key)
    }

    fn incr(&self, key: &str) -> Result<i64, BackendError> {
        self.check("INCR")?;
        self.inner.incr(key)
    }

    fn counter(&self, key: &str) -> Result<i64, BackendError> {
        self.inner.counter(key)
    }
}

#[test]
fn backend_failure_propagates_after_partial_write() {
    let backend = Arc::new(FailingBackend {
        inner: MemoryBackend::new(),
        fail: "ZADD",
    });
    let indexer = PropertyIndexer::for_property(backend.clone(), &PERSON, "age").unwrap();

    let err = indexer.index(&Value::Int(30), pk(1)).unwrap_err();

    assert_eq!(err.class, ErrorClass::Unavailable);
    assert_eq!(err.origin, ErrorOrigin::Backend);
    // Membership landed before the ordering write failed; nothing rolls back.
    assert_eq!(backend.inner.smembers("Person:age:30").unwrap(), vec!["1"]);
    assert!(!backend.inner.exists("Person:age~sorted").unwrap());
}

#[test]
fn invalidation_failure_propagates() {
    let backend = Arc::new(FailingBackend {
        inner: MemoryBackend::new(),
        fail: "KEYS",
    });
    let indexer = PropertyIndexer::for_property(backend, &PERSON, "age").unwrap();

    let err = indexer.index(&Value::Int(30), pk(1)).unwrap_err();
    assert!(err.is_unavailable());
}

///
/// InterleavingBackend
///
/// Delegates to a memory backend and runs a one-shot action right after the
/// first read of an ordering index, standing in for a concurrent writer.
///

struct InterleavingBackend {
    inner: Arc<MemoryBackend>,
    after_ordering_read: parking_lot::Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Backend for InterleavingBackend {
    fn sadd(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.inner.sadd(key, member)
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.inner.srem(key, member)
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
        self.inner.smembers(key)
    }

    fn smembers_page(
        &self,
        key: &str,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<String>, BackendError> {
        self.inner.smembers_page(key, offset, count)
    }

    fn zadd(&self, key: &str, score: f64, member: &str) -> Result<bool, BackendError> {
        self.inner.zadd(key, score, member)
    }

    fn zrem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.inner.zrem(key, member)
    }

    fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, BackendError> {
        self.inner.zscore(key, member)
    }

    fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, BackendError> {
        let scored = self.inner.zrangebyscore(key, min, max)?;
        if key.ends_with("~sorted")
            && let Some(action) = self.after_ordering_read.lock().take()
        {
            action();
        }

        Ok(scored)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        self.inner.keys(pattern)
    }

    fn del(&self, keys: &[String]) -> Result<u64, BackendError> {
        self.inner.del(keys)
    }

    fn exists(&self, key: &str) -> Result<bool, BackendError> {
        self.inner.exists(key)
    }

    fn incr(&self, key: &str) -> Result<i64, BackendError> {
        self.inner.incr(key)
    }

    fn counter(&self, key: &str) -> Result<i64, BackendError> {
        self.inner.counter(key)
    }
}

#[test]
fn range_answer_racing_a_write_is_not_cached() {
    let inner = Arc::new(MemoryBackend::new());
    let writer = PropertyIndexer::for_property(inner.clone(), &PERSON, "age").unwrap();
    writer.index(&Value::Int(20), pk(1)).unwrap();

    let backend = Arc::new(InterleavingBackend {
        inner: inner.clone(),
        after_ordering_read: parking_lot::Mutex::new(Some(Box::new(move || {
            writer.index(&Value::Int(35), pk(2)).unwrap();
        }))),
    });
    let reader = PropertyIndexer::for_property(backend, &PERSON, "age").unwrap();
    let (lo, hi) = (Value::Int(0), Value::Int(100));

    // The answer predates the concurrent write, so it must not be kept.
    assert_eq!(reader.query_range(Some(&lo), Some(&hi)).unwrap(), vec![pk(1)]);
    assert!(!inner.exists("Person:age~sorted~0.0:100.0").unwrap());

    assert_eq!(
        reader.query_range(Some(&lo), Some(&hi)).unwrap(),
        vec![pk(1), pk(2)]
    );
    assert!(inner.exists("Person:age~sorted~0.0:100.0").unwrap());
}
