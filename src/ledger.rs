//! Vote mutation rules.
//!
//! A vote is the membership of a voter id in one option's voter set. Clicking
//! an option you already hold retracts it. Without multiple choice, taking a
//! new option drops the voter from every other option first.

use std::sync::Arc;

use log::{debug, info};

use crate::error::{PollError, Result};
use crate::host::{DisplaySettings, Host};
use crate::models::poll::Poll;
use crate::models::user::User;
use crate::store::{self, RecordStore, UnitOfWork};
use crate::view::render_poll;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Cast,
    Retracted,
}

pub fn apply_vote(poll: &mut Poll, option: usize, voter: &User) -> Result<VoteOutcome> {
    if poll.finished {
        return Err(PollError::AlreadyFinished);
    }
    if option >= poll.options.len() {
        return Err(PollError::validation(
            "option",
            format!("Option {option} does not exist on this poll"),
        ));
    }

    if poll.votes[option].remove(&voter.id).is_some() {
        return Ok(VoteOutcome::Retracted);
    }

    if !poll.multiple_choice {
        for voters in poll.votes.iter_mut() {
            voters.remove(&voter.id);
        }
    }
    poll.votes[option].insert(voter.id.clone(), voter.clone());
    Ok(VoteOutcome::Cast)
}

pub struct VoteLedger {
    store: Arc<dyn RecordStore>,
    host: Arc<dyn Host>,
    work: UnitOfWork,
}

impl VoteLedger {
    /// `work` must be the one the poll sequencer uses, or a timer closing a
    /// poll can interleave with a vote on it.
    pub fn new(store: Arc<dyn RecordStore>, host: Arc<dyn Host>, work: UnitOfWork) -> Self {
        VoteLedger { store, host, work }
    }

    /// Toggles `voter` on `option` of the poll hosted by `message_id`, then
    /// refreshes the shared message.
    pub async fn vote(&self, message_id: &str, option: usize, voter: &User) -> Result<Poll> {
        let _work = self.work.begin().await;
        let mut poll = store::load_poll(self.store.as_ref(), message_id).await?;
        let outcome = apply_vote(&mut poll, option, voter)?;
        debug!("{:?} vote of {} on poll {} option {}", outcome, voter.id, poll.id, option);

        store::save_poll(self.store.as_ref(), &poll).await?;
        self.refresh(&poll).await?;
        Ok(poll)
    }

    pub async fn add_option(&self, message_id: &str, label: &str) -> Result<Poll> {
        let label = label.trim();
        if label.is_empty() {
            return Err(PollError::validation("option", "Please provide an option"));
        }

        let _work = self.work.begin().await;
        let mut poll = store::load_poll(self.store.as_ref(), message_id).await?;
        if poll.finished {
            return Err(PollError::AlreadyFinished);
        }
        poll.options.push(label.to_owned());
        poll.votes.push(Default::default());
        info!("Added option {:?} to poll {}", label, poll.id);

        store::save_poll(self.store.as_ref(), &poll).await?;
        self.refresh(&poll).await?;
        Ok(poll)
    }

    /// Re-renders the hosting message from the stored poll.
    pub async fn refresh(&self, poll: &Poll) -> Result<()> {
        let settings = DisplaySettings::load(self.host.as_ref()).await?;
        self.host
            .update_message(&poll.id, &render_poll(poll, &settings))
            .await
    }
}
