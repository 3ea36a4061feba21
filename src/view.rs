//! Message layout for a poll.
//!
//! Pure: the same poll and settings always render the same blocks.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::host::DisplaySettings;
use crate::models::poll::Poll;

pub const VOTE_ACTION: &str = "vote";
pub const NEXT_POLL_ACTION: &str = "nextPoll";
pub const FINISH_ACTION: &str = "finish";
pub const ADD_CHOICE_ACTION: &str = "addUserChoice";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Button {
    pub text: String,
    #[serde(rename = "actionId")]
    pub action_id: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "section")]
    Section { text: String },
    #[serde(rename = "context")]
    Context { elements: Vec<String> },
    #[serde(rename = "actions")]
    Actions { elements: Vec<Button> },
    #[serde(rename = "divider")]
    Divider,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PollView {
    /// Plain text fallback for clients without block support.
    pub text: String,
    pub blocks: Vec<Block>,
}

impl PollView {
    pub fn plain(text: impl Into<String>) -> Self {
        PollView {
            text: text.into(),
            blocks: Vec::new(),
        }
    }
}

fn button(text: impl Into<String>, action_id: &str, value: impl Into<String>) -> Button {
    Button {
        text: text.into(),
        action_id: action_id.to_owned(),
        value: value.into(),
    }
}

fn format_finished_at(at: DateTime<Utc>, timezone: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => at.with_timezone(&tz).format("%B %-d, %Y %H:%M %Z").to_string(),
        Err(_) => {
            warn!("Unknown timezone {}, falling back to UTC", timezone);
            at.format("%B %-d, %Y %H:%M UTC").to_string()
        }
    }
}

pub fn render_poll(poll: &Poll, settings: &DisplaySettings) -> PollView {
    let mut blocks = Vec::new();

    let mut header = format!("*{}*", poll.question);
    if let Some(live) = &poll.live {
        header.push_str(&format!("\nPoll {} of {}", live.poll_index + 1, live.total_polls));
        if let (Some(ttv), false) = (live.ttv, poll.finished) {
            header.push_str(&format!(" · closes after {ttv}s"));
        }
    }
    blocks.push(Block::Section { text: header });
    blocks.push(Block::Divider);

    for (index, option) in poll.options.iter().enumerate() {
        blocks.push(Block::Section {
            text: format!("{option} `{}`", poll.vote_count(index)),
        });

        if !poll.is_anonymous(index) {
            let voters: Vec<String> = poll.votes[index]
                .values()
                .map(|voter| {
                    if settings.show_names {
                        voter.display_name().to_owned()
                    } else {
                        format!("@{}", voter.username)
                    }
                })
                .collect();
            if !voters.is_empty() {
                blocks.push(Block::Context { elements: voters });
            }
        }

        if !poll.finished {
            blocks.push(Block::Actions {
                elements: vec![button("Vote", VOTE_ACTION, index.to_string())],
            });
        }
    }

    blocks.push(Block::Divider);
    if poll.finished {
        let when = poll
            .finished_at
            .map(|at| format!(" on {}", format_finished_at(at, &settings.timezone)))
            .unwrap_or_default();
        blocks.push(Block::Context {
            elements: vec![format!("The poll has been finished{when}")],
        });
    } else {
        let mut controls = vec![
            button("Add option", ADD_CHOICE_ACTION, ""),
            button("Finish poll", FINISH_ACTION, ""),
        ];
        if let Some(live) = &poll.live {
            controls.push(button("Next poll", NEXT_POLL_ACTION, live.set_id.clone()));
        }
        blocks.push(Block::Actions { elements: controls });
    }

    PollView {
        text: poll.question.clone(),
        blocks,
    }
}
