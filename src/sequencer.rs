//! Poll lifecycle: publishing, live poll sets and finishing.
//!
//! A live set moves DRAFTING -> ACTIVE[0] -> .. -> ACTIVE[n-1] -> FINISHED.
//! `currentIndex` on the stored set only ever moves forward, and an advance
//! is applied only when the caller's expected index still matches it. A late
//! timer firing after a manual advance (or after a finish) is therefore a
//! no-op rather than a second advance.
//!
//! Every public operation runs as one [`UnitOfWork`], shared with the vote
//! ledger, so a timer and a click never observe the same index.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PollError, Result};
use crate::host::{DisplaySettings, Host};
use crate::models::form::PollForm;
use crate::models::poll::{LiveSlot, Poll, PollSpec};
use crate::models::record::{LivePollSet, PollRecord, PollSetDraft};
use crate::models::user::User;
use crate::scheduler::{JobContext, Scheduler, NEXT_POLL_JOB};
use crate::store::{self, RecordStore, UnitOfWork};
use crate::view::{render_poll, PollView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftProgress {
    /// More polls are needed before the set is complete.
    Pending { filled: usize, total: usize },
    /// The set was stored for later; nothing is on display.
    Saved { set_id: String },
    /// The first poll of the set is on display.
    Started { set_id: String, message_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next { index: usize, message_id: String },
    Completed,
    /// The set was finished or had already moved on.
    Stale,
}

/// Sends `spec` as a new message and stores it under the message id.
pub async fn publish_poll(
    store: &dyn RecordStore,
    host: &dyn Host,
    spec: &PollSpec,
    creator: &User,
    app_id: &str,
    room: &str,
    live: Option<LiveSlot>,
) -> Result<Poll> {
    let settings = DisplaySettings::load(host).await?;
    let mut poll = Poll::from_spec("", spec, creator, app_id, room, live);

    let message_id = host
        .send_message(room, creator, &render_poll(&poll, &settings))
        .await?;
    poll.id = message_id;
    store::create_record(store, &poll.id, &PollRecord::Poll(poll.clone())).await?;

    info!("Published poll {} in {}", poll.id, room);
    Ok(poll)
}

pub struct LivePollSequencer {
    store: Arc<dyn RecordStore>,
    host: Arc<dyn Host>,
    scheduler: Arc<dyn Scheduler>,
    work: UnitOfWork,
}

impl LivePollSequencer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        host: Arc<dyn Host>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        LivePollSequencer {
            store,
            host,
            scheduler,
            work: UnitOfWork::new(),
        }
    }

    /// The lock shared by everything that mutates poll records.
    pub fn unit_of_work(&self) -> UnitOfWork {
        self.work.clone()
    }

    pub async fn create_poll(
        &self,
        form: &PollForm,
        creator: &User,
        app_id: &str,
        room: &str,
    ) -> Result<Poll> {
        let spec = form.validate(false)?;
        let _work = self.work.begin().await;
        publish_poll(
            self.store.as_ref(),
            self.host.as_ref(),
            &spec,
            creator,
            app_id,
            room,
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn begin_draft(
        &self,
        draft_key: &str,
        total_polls: usize,
        save: bool,
        user: &User,
        room: &str,
        app_id: &str,
        trigger_id: Option<String>,
    ) -> Result<PollSetDraft> {
        if total_polls == 0 {
            return Err(PollError::validation(
                "totalPolls",
                "A live poll set needs at least one poll",
            ));
        }

        let _work = self.work.begin().await;
        let draft = PollSetDraft {
            polls: Vec::with_capacity(total_polls),
            poll_index: 0,
            total_polls,
            save,
            user: user.clone(),
            room: room.to_owned(),
            app_id: app_id.to_owned(),
            trigger_id,
        };
        store::write_record(
            self.store.as_ref(),
            draft_key,
            &PollRecord::Draft(draft.clone()),
        )
        .await?;
        debug!("Started draft {} for {} polls", draft_key, total_polls);
        Ok(draft)
    }

    /// Adds one poll to the draft under `draft_key`. Completing the draft turns
    /// it into a live poll set, which is either saved or started right away.
    pub async fn add_poll(&self, draft_key: &str, form: &PollForm) -> Result<DraftProgress> {
        let _work = self.work.begin().await;
        let mut draft = store::load_draft(self.store.as_ref(), draft_key).await?;
        if draft.is_complete() {
            return Err(PollError::validation(
                "totalPolls",
                format!("This live poll set already has all {} polls", draft.total_polls),
            ));
        }
        let spec = form.validate(true)?;

        draft.polls.push(spec);
        draft.poll_index = draft.polls.len();
        store::write_record(
            self.store.as_ref(),
            draft_key,
            &PollRecord::Draft(draft.clone()),
        )
        .await?;

        if !draft.is_complete() {
            return Ok(DraftProgress::Pending {
                filled: draft.poll_index,
                total: draft.total_polls,
            });
        }

        let set_id = format!("live-{}", Uuid::new_v4().simple());
        let set = LivePollSet::from_draft(set_id.clone(), draft);
        store::create_record(self.store.as_ref(), &set_id, &PollRecord::LiveSet(set.clone()))
            .await?;
        info!("Live poll set {} created with {} polls", set_id, set.total_polls);

        if set.save {
            self.host
                .notify_user(
                    &set.user,
                    &set.room,
                    &format!(
                        "Live Poll has been saved with id {set_id}. Use `/poll live load {set_id}` to start."
                    ),
                )
                .await?;
            return Ok(DraftProgress::Saved { set_id });
        }

        let message_id = self.start_unlocked(&set_id).await?;
        Ok(DraftProgress::Started { set_id, message_id })
    }

    /// Shows the first poll of a set that has never been on display.
    pub async fn start_set(&self, set_id: &str) -> Result<String> {
        let _work = self.work.begin().await;
        self.start_unlocked(set_id).await
    }

    /// Moves a set from poll `expected_index` to the next one, or ends it.
    pub async fn advance(&self, set_id: &str, expected_index: usize) -> Result<Advance> {
        let _work = self.work.begin().await;
        self.advance_unlocked(set_id, expected_index).await
    }

    /// Manual "next poll" from the message hosting a live poll.
    pub async fn advance_from_message(&self, message_id: &str) -> Result<Advance> {
        let _work = self.work.begin().await;
        let poll = store::load_poll(self.store.as_ref(), message_id).await?;
        let live = poll.live.ok_or_else(|| {
            PollError::validation("poll", "This poll is not part of a live poll set")
        })?;
        self.advance_unlocked(&live.set_id, live.poll_index).await
    }

    // The set only records index 0 once its first poll is on display, so a
    // failed first render can be retried.
    async fn start_unlocked(&self, set_id: &str) -> Result<String> {
        let mut set = store::load_live_set(self.store.as_ref(), set_id).await?;
        if set.finished || set.current_index.is_some() {
            return Err(PollError::AlreadyFinished);
        }

        set.current_index = Some(0);
        self.show(&mut set, 0).await
    }

    async fn advance_unlocked(&self, set_id: &str, expected_index: usize) -> Result<Advance> {
        let mut set = store::load_live_set(self.store.as_ref(), set_id).await?;
        if set.finished || set.current_index != Some(expected_index) {
            debug!(
                "Set {} is at {:?} (finished: {}), not advancing from {}",
                set_id, set.current_index, set.finished, expected_index
            );
            return Ok(Advance::Stale);
        }

        if let Some(message_id) = set.current_message_id.clone() {
            self.close_poll(&message_id).await?;
        }

        let next = expected_index + 1;
        if next < set.total_polls {
            set.current_index = Some(next);
            set.current_message_id = None;
            store::save_live_set(self.store.as_ref(), &set).await?;

            let message_id = self.show(&mut set, next).await?;
            return Ok(Advance::Next {
                index: next,
                message_id,
            });
        }

        set.finished = true;
        store::save_live_set(self.store.as_ref(), &set).await?;
        info!("Live poll set {} finished", set_id);
        self.host
            .send_message(
                &set.room,
                &set.user,
                &PollView::plain(format!(
                    "Live poll {set_id} is over. All {} polls have been finished.",
                    set.total_polls
                )),
            )
            .await?;
        Ok(Advance::Completed)
    }

    /// Finishes the poll hosted by `message_id`. A live set the poll belongs to
    /// is retired with it, so pending timers for the set become stale.
    pub async fn finish(&self, message_id: &str, actor: &User) -> Result<Poll> {
        let _work = self.work.begin().await;
        let mut poll = store::load_poll(self.store.as_ref(), message_id).await?;
        if poll.finished {
            return Err(PollError::AlreadyFinished);
        }
        if poll.user_id != actor.id {
            return Err(PollError::NotPollCreator);
        }

        poll.finish(Utc::now());
        store::save_poll(self.store.as_ref(), &poll).await?;
        self.refresh(&poll).await?;
        info!("Poll {} finished by {}", poll.id, actor.id);

        if let Some(live) = &poll.live {
            let mut set = store::load_live_set(self.store.as_ref(), &live.set_id).await?;
            if !set.finished {
                set.finished = true;
                store::save_live_set(self.store.as_ref(), &set).await?;
                info!("Live poll set {} finished early", set.id);
            }
        }
        Ok(poll)
    }

    async fn show(&self, set: &mut LivePollSet, index: usize) -> Result<String> {
        let spec = set
            .polls
            .get(index)
            .cloned()
            .ok_or_else(|| PollError::NotFound(format!("poll {index} of {}", set.id)))?;
        let live = LiveSlot {
            set_id: set.id.clone(),
            poll_index: index,
            total_polls: set.total_polls,
            ttv: spec.ttv,
        };

        let poll = publish_poll(
            self.store.as_ref(),
            self.host.as_ref(),
            &spec,
            &set.user,
            &set.app_id,
            &set.room,
            Some(live),
        )
        .await?;
        set.current_message_id = Some(poll.id.clone());
        store::save_live_set(self.store.as_ref(), set).await?;

        if let Some(ttv) = spec.ttv {
            let delay = Duration::try_from_secs_f64(ttv)
                .map_err(|e| PollError::Scheduler(format!("bad time to vote {ttv}: {e}")))?;
            let context = JobContext {
                set_id: set.id.clone(),
                expected_index: index,
                user: set.user.clone(),
                room: set.room.clone(),
            };
            self.scheduler.schedule(NEXT_POLL_JOB, context, delay).await?;
        }
        Ok(poll.id)
    }

    async fn close_poll(&self, message_id: &str) -> Result<()> {
        let mut poll = store::load_poll(self.store.as_ref(), message_id).await?;
        if !poll.finish(Utc::now()) {
            warn!("Poll {} was already finished", message_id);
            return Ok(());
        }
        store::save_poll(self.store.as_ref(), &poll).await?;
        self.refresh(&poll).await
    }

    async fn refresh(&self, poll: &Poll) -> Result<()> {
        let settings = DisplaySettings::load(self.host.as_ref()).await?;
        self.host
            .update_message(&poll.id, &render_poll(poll, &settings))
            .await
    }
}
