use std::sync::Arc;

use async_trait::async_trait;
use chat_poll::error::Result;
use chat_poll::host::Host;
use chat_poll::models::user::User;
use chat_poll::scheduler::{NextPollProcessor, TokioScheduler};
use chat_poll::sequencer::LivePollSequencer;
use chat_poll::store::MemoryStore;
use chat_poll::view::PollView;
use chat_poll::PollApp;
use serde_json::Value;
use tokio::sync::Mutex;

/// In-process stand-in for the chat host.
#[derive(Default)]
pub struct FakeHost {
    pub sent: Mutex<Vec<(String, PollView)>>,
    pub updated: Mutex<Vec<(String, PollView)>>,
    pub notices: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Host for FakeHost {
    async fn send_message(&self, _room: &str, _sender: &User, view: &PollView) -> Result<String> {
        let mut sent = self.sent.lock().await;
        let id = format!("m{}", sent.len());
        sent.push((id.clone(), view.clone()));
        Ok(id)
    }

    async fn update_message(&self, message_id: &str, view: &PollView) -> Result<()> {
        self.updated
            .lock()
            .await
            .push((message_id.to_owned(), view.clone()));
        Ok(())
    }

    async fn notify_user(&self, user: &User, _room: &str, text: &str) -> Result<()> {
        self.notices
            .lock()
            .await
            .push((user.id.clone(), text.to_owned()));
        Ok(())
    }

    async fn read_setting(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }
}

pub struct Stack {
    pub store: Arc<MemoryStore>,
    pub host: Arc<FakeHost>,
    pub app: PollApp,
}

/// Wires the app the way the binary does, with the tokio scheduler.
pub fn stack() -> Stack {
    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(FakeHost::default());
    let scheduler = Arc::new(TokioScheduler::new());
    let sequencer = Arc::new(LivePollSequencer::new(
        store.clone(),
        host.clone(),
        scheduler.clone(),
    ));
    scheduler
        .register_processors(vec![Arc::new(NextPollProcessor::new(
            sequencer.clone(),
            host.clone(),
        ))])
        .unwrap();
    let app = PollApp::new(store.clone(), host.clone(), sequencer);
    Stack { store, host, app }
}

pub fn user(id: &str) -> User {
    User::new(id, id, "")
}
