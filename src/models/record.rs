use serde::{Deserialize, Serialize};

use crate::models::poll::{Poll, PollSpec};
use crate::models::user::User;

/// Every document kept in the record store.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind")]
pub enum PollRecord {
    #[serde(rename = "POLL")]
    Poll(Poll),
    #[serde(rename = "DRAFT")]
    Draft(PollSetDraft),
    #[serde(rename = "LIVE_SET")]
    LiveSet(LivePollSet),
}

impl PollRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            PollRecord::Poll(_) => "POLL",
            PollRecord::Draft(_) => "DRAFT",
            PollRecord::LiveSet(_) => "LIVE_SET",
        }
    }
}

/// A live poll set while its polls are still being composed.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PollSetDraft {
    pub polls: Vec<PollSpec>,
    #[serde(rename = "pollIndex")]
    pub poll_index: usize,
    #[serde(rename = "totalPolls")]
    pub total_polls: usize,
    #[serde(default)]
    pub save: bool,
    pub user: User,
    pub room: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "triggerId", default)]
    pub trigger_id: Option<String>,
}

impl PollSetDraft {
    pub fn is_complete(&self) -> bool {
        self.poll_index >= self.total_polls
    }
}

/// A complete live poll set, displayed one poll at a time.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LivePollSet {
    pub id: String,
    pub polls: Vec<PollSpec>,
    #[serde(rename = "totalPolls")]
    pub total_polls: usize,
    #[serde(default)]
    pub save: bool,
    /// Index of the poll on display; `None` until the set is first shown.
    #[serde(rename = "currentIndex", default)]
    pub current_index: Option<usize>,
    #[serde(rename = "currentMessageId", default)]
    pub current_message_id: Option<String>,
    #[serde(default)]
    pub finished: bool,
    pub user: User,
    pub room: String,
    #[serde(rename = "appId")]
    pub app_id: String,
}

impl LivePollSet {
    pub fn from_draft(id: impl Into<String>, draft: PollSetDraft) -> Self {
        LivePollSet {
            id: id.into(),
            total_polls: draft.polls.len(),
            polls: draft.polls,
            save: draft.save,
            current_index: None,
            current_message_id: None,
            finished: false,
            user: draft.user,
            room: draft.room,
            app_id: draft.app_id,
        }
    }
}
