use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// Voters of one option, keyed by user id.
pub type VoterSet = BTreeMap<String, User>;

/// A validated poll that has not been displayed yet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PollSpec {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "anonymousOptions", default)]
    pub anonymous_options: BTreeSet<usize>,
    #[serde(rename = "multipleChoice", default)]
    pub multiple_choice: bool,
    /// Seconds until the poll advances on its own.
    #[serde(default)]
    pub ttv: Option<f64>,
}

/// Position of a displayed poll inside its live set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LiveSlot {
    #[serde(rename = "setId")]
    pub set_id: String,
    #[serde(rename = "pollIndex")]
    pub poll_index: usize,
    #[serde(rename = "totalPolls")]
    pub total_polls: usize,
    pub ttv: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Poll {
    /// Id of the hosting message.
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// One voter set per option, index-aligned with `options`.
    pub votes: Vec<VoterSet>,
    #[serde(rename = "anonymousOptions", default)]
    pub anonymous_options: BTreeSet<usize>,
    #[serde(rename = "multipleChoice", default)]
    pub multiple_choice: bool,
    pub finished: bool,
    #[serde(rename = "finishedAt", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    pub room: String,
    #[serde(default)]
    pub live: Option<LiveSlot>,
}

impl Poll {
    pub fn from_spec(
        id: impl Into<String>,
        spec: &PollSpec,
        creator: &User,
        app_id: &str,
        room: &str,
        live: Option<LiveSlot>,
    ) -> Self {
        Poll {
            id: id.into(),
            question: spec.question.clone(),
            options: spec.options.clone(),
            votes: vec![VoterSet::new(); spec.options.len()],
            anonymous_options: spec.anonymous_options.clone(),
            multiple_choice: spec.multiple_choice,
            finished: false,
            finished_at: None,
            user_id: creator.id.clone(),
            app_id: app_id.to_owned(),
            room: room.to_owned(),
            live,
        }
    }

    pub fn is_anonymous(&self, option: usize) -> bool {
        self.anonymous_options.contains(&option)
    }

    pub fn vote_count(&self, option: usize) -> usize {
        self.votes.get(option).map_or(0, BTreeMap::len)
    }

    pub fn total_votes(&self) -> usize {
        self.votes.iter().map(BTreeMap::len).sum()
    }

    pub fn has_voted(&self, option: usize, voter_id: &str) -> bool {
        self.votes
            .get(option)
            .is_some_and(|voters| voters.contains_key(voter_id))
    }

    /// Marks the poll finished. Returns false if it already was.
    pub fn finish(&mut self, at: DateTime<Utc>) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.finished_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> PollSpec {
        PollSpec {
            question: "Lunch?".to_owned(),
            options: vec!["Pizza".to_owned(), "Salad".to_owned()],
            anonymous_options: BTreeSet::from([1]),
            multiple_choice: false,
            ttv: None,
        }
    }

    #[test]
    fn from_spec_starts_open_with_empty_voter_sets() {
        let creator = User::new("u1", "alice", "Alice");
        let poll = Poll::from_spec("msg-1", &spec(), &creator, "app", "general", None);

        assert!(!poll.finished);
        assert_eq!(poll.votes.len(), poll.options.len());
        assert_eq!(poll.total_votes(), 0);
        assert!(poll.is_anonymous(1));
        assert!(!poll.is_anonymous(0));
        assert_eq!(poll.user_id, "u1");
    }

    #[test]
    fn finish_is_monotonic() {
        let creator = User::new("u1", "alice", "");
        let mut poll = Poll::from_spec("msg-1", &spec(), &creator, "app", "general", None);
        let first = Utc::now();

        assert!(poll.finish(first));
        assert!(!poll.finish(Utc::now()));
        assert!(poll.finished);
        assert_eq!(poll.finished_at, Some(first));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let creator = User::new("u1", "alice", "");
        let poll = Poll::from_spec("msg-1", &spec(), &creator, "app", "general", None);
        let json = serde_json::to_value(&poll).unwrap();

        assert!(json.get("anonymousOptions").is_some());
        assert!(json.get("multipleChoice").is_some());
        assert_eq!(json["userId"], "u1");
    }
}
