use crate::db::backend::{Backend, BackendError, glob::glob_match};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

///
/// Entry
///

#[derive(Clone, Debug)]
enum Entry {
    Set(BTreeSet<String>),
    SortedSet(HashMap<String, f64>),
    Counter(i64),
}

///
/// MemoryBackend
///
/// In-process `Backend` with Redis set, sorted-set and counter semantics: writing an
/// element to an absent key creates it, removing the last element drops the
/// key, and commands against a key of the other type fail with
/// `WrongType`. Sets iterate in lexicographic member order.
///

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn with_set<R>(
        &self,
        command: &'static str,
        key: &str,
        f: impl FnOnce(Option<&BTreeSet<String>>) -> R,
    ) -> Result<R, BackendError> {
        match self.entries.read().get(key) {
            None => Ok(f(None)),
            Some(Entry::Set(set)) => Ok(f(Some(set))),
            Some(_) => Err(wrong_type(command, key)),
        }
    }

    fn with_zset<R>(
        &self,
        command: &'static str,
        key: &str,
        f: impl FnOnce(Option<&HashMap<String, f64>>) -> R,
    ) -> Result<R, BackendError> {
        match self.entries.read().get(key) {
            None => Ok(f(None)),
            Some(Entry::SortedSet(zset)) => Ok(f(Some(zset))),
            Some(_) => Err(wrong_type(command, key)),
        }
    }
}

fn wrong_type(command: &'static str, key: &str) -> BackendError {
    BackendError::WrongType {
        command,
        key: key.to_string(),
    }
}

impl Backend for MemoryBackend {
    fn sadd(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));

        match entry {
            Entry::Set(set) => Ok(set.insert(member.to_string())),
            _ => Err(wrong_type("SADD", key)),
        }
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };

        match entry {
            Entry::Set(set) => {
                let removed = set.remove(member);
                if set.is_empty() {
                    entries.remove(key);
                }
                Ok(removed)
            }
            _ => Err(wrong_type("SREM", key)),
        }
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
        self.with_set("SMEMBERS", key, |set| {
            set.map(|s| s.iter().cloned().collect()).unwrap_or_default()
        })
    }

    fn smembers_page(
        &self,
        key: &str,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<String>, BackendError> {
        self.with_set("SORT", key, |set| {
            let Some(set) = set else {
                return Vec::new();
            };
            let iter = set.iter().skip(offset).cloned();

            match count {
                Some(count) => iter.take(count).collect(),
                None => iter.collect(),
            }
        })
    }

    fn zadd(&self, key: &str, score: f64, member: &str) -> Result<bool, BackendError> {
        if score.is_nan() {
            return Err(BackendError::command("ZADD", "score is not a valid float"));
        }

        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::SortedSet(HashMap::new()));

        match entry {
            Entry::SortedSet(zset) => Ok(zset.insert(member.to_string(), score).is_none()),
            _ => Err(wrong_type("ZADD", key)),
        }
    }

    fn zrem(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };

        match entry {
            Entry::SortedSet(zset) => {
                let removed = zset.remove(member).is_some();
                if zset.is_empty() {
                    entries.remove(key);
                }
                Ok(removed)
            }
            _ => Err(wrong_type("ZREM", key)),
        }
    }

    fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, BackendError> {
        self.with_zset("ZSCORE", key, |zset| {
            zset.and_then(|z| z.get(member).copied())
        })
    }

    fn zrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, BackendError> {
        self.with_zset("ZRANGEBYSCORE", key, |zset| {
            let Some(zset) = zset else {
                return Vec::new();
            };

            let mut out: Vec<(String, f64)> = zset
                .iter()
                .filter(|(_, score)| **score >= min && **score <= max)
                .map(|(member, score)| (member.clone(), *score))
                .collect();
            out.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

            out
        })
    }

    fn incr(&self, key: &str) -> Result<i64, BackendError> {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.to_string())
            .or_insert(Entry::Counter(0));

        match entry {
            Entry::Counter(value) => {
                *value = value
                    .checked_add(1)
                    .ok_or_else(|| BackendError::command("INCR", "increment would overflow"))?;
                Ok(*value)
            }
            _ => Err(wrong_type("INCR", key)),
        }
    }

    fn counter(&self, key: &str) -> Result<i64, BackendError> {
        match self.entries.read().get(key) {
            None => Ok(0),
            Some(Entry::Counter(value)) => Ok(*value),
            Some(_) => Err(wrong_type("GET", key)),
        }
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();

        Ok(keys)
    }

    fn del(&self, keys: &[String]) -> Result<u64, BackendError> {
        let mut entries = self.entries.write();

        Ok(keys
            .iter()
            .filter(|key| entries.remove(key.as_str()).is_some())
            .count() as u64)
    }

    fn exists(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.read().contains_key(key))
    }
}
