use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{PollError, Result};
use crate::host::Host;
use crate::models::user::User;
use crate::scheduler::{JobContext, Scheduler};
use crate::store::{MemoryStore, RecordStore};
use crate::view::PollView;

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: String,
    pub room: String,
    pub view: PollView,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub user: String,
    pub room: String,
    pub text: String,
}

/// Host that records everything sent through it.
#[derive(Default)]
pub struct RecordingHost {
    sent: Mutex<Vec<SentMessage>>,
    updates: Mutex<Vec<(String, PollView)>>,
    notices: Mutex<Vec<Notice>>,
    settings: Mutex<HashMap<String, Value>>,
    fail_sends: Mutex<bool>,
    latency: Mutex<Duration>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_setting(&self, key: &str, value: Value) {
        self.settings.lock().await.insert(key.to_owned(), value);
    }

    pub async fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().await = fail;
    }

    /// Makes every send and update take `latency` before it lands.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    async fn wait(&self) {
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn updates(&self) -> Vec<(String, PollView)> {
        self.updates.lock().await.clone()
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.notices.lock().await.clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn send_message(&self, room: &str, _sender: &User, view: &PollView) -> Result<String> {
        if *self.fail_sends.lock().await {
            return Err(PollError::Host("send failed".to_owned()));
        }
        self.wait().await;
        let mut sent = self.sent.lock().await;
        let id = format!("msg-{}", sent.len() + 1);
        sent.push(SentMessage {
            id: id.clone(),
            room: room.to_owned(),
            view: view.clone(),
        });
        Ok(id)
    }

    async fn update_message(&self, message_id: &str, view: &PollView) -> Result<()> {
        self.wait().await;
        self.updates
            .lock()
            .await
            .push((message_id.to_owned(), view.clone()));
        Ok(())
    }

    async fn notify_user(&self, user: &User, room: &str, text: &str) -> Result<()> {
        self.notices.lock().await.push(Notice {
            user: user.id.clone(),
            room: room.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn read_setting(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.settings.lock().await.get(key).cloned())
    }
}

/// Scheduler that only records jobs; tests fire them by hand.
#[derive(Default)]
pub struct ManualScheduler {
    jobs: Mutex<Vec<(String, JobContext, Duration)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self) -> Vec<(String, JobContext, Duration)> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    async fn schedule(&self, job_id: &str, context: JobContext, delay: Duration) -> Result<()> {
        self.jobs
            .lock()
            .await
            .push((job_id.to_owned(), context, delay));
        Ok(())
    }
}

/// Memory store that holds back writes of open polls, so a vote's write-back
/// lands after anything written in the meantime.
pub struct SlowStore {
    inner: MemoryStore,
    open_poll_delay: Duration,
}

impl SlowStore {
    pub fn new(open_poll_delay: Duration) -> Self {
        SlowStore {
            inner: MemoryStore::new(),
            open_poll_delay,
        }
    }
}

#[async_trait]
impl RecordStore for SlowStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, document: Value, upsert: bool) -> Result<()> {
        if document["kind"] == "POLL" && document["finished"] == false {
            tokio::time::sleep(self.open_poll_delay).await;
        }
        self.inner.write(key, document, upsert).await
    }

    async fn create(&self, document: Value, key: &str) -> Result<()> {
        self.inner.create(document, key).await
    }
}
