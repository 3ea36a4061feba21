//! Keyed document persistence.
//!
//! Records are whole JSON documents read and written back under one key. The
//! store offers no transactions and no compare-and-swap. Callers that
//! read-modify-write a record do so inside a [`UnitOfWork`], which keeps
//! interactions and scheduled jobs from interleaving.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::error::{PollError, Result};
use crate::models::poll::Poll;
use crate::models::record::{LivePollSet, PollRecord, PollSetDraft};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Writes `document` under `key`. Without `upsert` the key must already exist.
    async fn write(&self, key: &str, document: Value, upsert: bool) -> Result<()>;

    /// Creates a new record. Fails if `key` is taken.
    async fn create(&self, document: Value, key: &str) -> Result<()>;
}

/// Serializes units of work against the store. Every vote, form submission
/// and scheduled job holds the guard from its first read to its last write.
#[derive(Clone, Default)]
pub struct UnitOfWork(Arc<Mutex<()>>);

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, document: Value, upsert: bool) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(key) {
            Some(existing) => *existing = document,
            None if upsert => {
                records.insert(key.to_owned(), document);
            }
            None => return Err(PollError::Store(format!("no record to update at {key}"))),
        }
        debug!("Stored record {}", key);
        Ok(())
    }

    async fn create(&self, document: Value, key: &str) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(key) {
            return Err(PollError::Store(format!("record {key} already exists")));
        }
        records.insert(key.to_owned(), document);
        debug!("Created record {}", key);
        Ok(())
    }
}

pub async fn read_record(store: &dyn RecordStore, key: &str) -> Result<Option<PollRecord>> {
    match store.read(key).await? {
        Some(document) => Ok(Some(serde_json::from_value(document)?)),
        None => Ok(None),
    }
}

pub async fn write_record(store: &dyn RecordStore, key: &str, record: &PollRecord) -> Result<()> {
    debug!("Writing {} record {}", record.kind(), key);
    store.write(key, serde_json::to_value(record)?, true).await
}

pub async fn create_record(store: &dyn RecordStore, key: &str, record: &PollRecord) -> Result<()> {
    store.create(serde_json::to_value(record)?, key).await
}

/// Loads a displayed poll. Any other kind of record under `key` counts as missing.
pub async fn load_poll(store: &dyn RecordStore, key: &str) -> Result<Poll> {
    match read_record(store, key).await? {
        Some(PollRecord::Poll(poll)) => Ok(poll),
        _ => Err(PollError::NotFound(key.to_owned())),
    }
}

pub async fn save_poll(store: &dyn RecordStore, poll: &Poll) -> Result<()> {
    write_record(store, &poll.id, &PollRecord::Poll(poll.clone())).await
}

pub async fn load_draft(store: &dyn RecordStore, key: &str) -> Result<PollSetDraft> {
    match read_record(store, key).await? {
        Some(PollRecord::Draft(draft)) => Ok(draft),
        _ => Err(PollError::NotFound(key.to_owned())),
    }
}

pub async fn load_live_set(store: &dyn RecordStore, key: &str) -> Result<LivePollSet> {
    match read_record(store, key).await? {
        Some(PollRecord::LiveSet(set)) => Ok(set),
        _ => Err(PollError::NotFound(key.to_owned())),
    }
}

pub async fn save_live_set(store: &dyn RecordStore, set: &LivePollSet) -> Result<()> {
    write_record(store, &set.id, &PollRecord::LiveSet(set.clone())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::poll::PollSpec;
    use crate::models::user::User;
    use serde_json::json;

    #[tokio::test]
    async fn write_without_upsert_needs_an_existing_record() {
        let store = MemoryStore::new();

        let err = store.write("a", json!({}), false).await.unwrap_err();
        assert!(matches!(err, PollError::Store(_)));

        store.write("a", json!({ "n": 1 }), true).await.unwrap();
        store.write("a", json!({ "n": 2 }), false).await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), Some(json!({ "n": 2 })));
    }

    #[tokio::test]
    async fn create_refuses_taken_keys() {
        let store = MemoryStore::new();
        store.create(json!({}), "a").await.unwrap();

        assert!(store.create(json!({}), "a").await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn typed_loaders_treat_wrong_kinds_as_missing() {
        let store = MemoryStore::new();
        let spec = PollSpec {
            question: "Q".to_owned(),
            options: vec!["a".to_owned(), "b".to_owned()],
            anonymous_options: Default::default(),
            multiple_choice: false,
            ttv: None,
        };
        let poll = Poll::from_spec("msg-1", &spec, &User::new("u1", "alice", ""), "app", "general", None);
        save_poll(&store, &poll).await.unwrap();

        assert_eq!(load_poll(&store, "msg-1").await.unwrap(), poll);
        assert!(matches!(
            load_live_set(&store, "msg-1").await,
            Err(PollError::NotFound(key)) if key == "msg-1"
        ));
        assert!(matches!(load_poll(&store, "nope").await, Err(PollError::NotFound(_))));
    }

    #[tokio::test]
    async fn units_of_work_do_not_interleave() {
        let work = UnitOfWork::new();
        let other = work.clone();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = async {
            let _guard = work.begin().await;
            log.lock().await.push("first:start");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            log.lock().await.push("first:end");
        };
        let second = async {
            tokio::task::yield_now().await;
            let _guard = other.begin().await;
            log.lock().await.push("second:start");
            log.lock().await.push("second:end");
        };
        tokio::join!(first, second);

        assert_eq!(
            *log.lock().await,
            vec!["first:start", "first:end", "second:start", "second:end"]
        );
    }
}
