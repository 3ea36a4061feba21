//! Entry points the chat host calls into.
//!
//! Every entry point answers with an `InteractionResponse`. Button actions
//! also send a failure notice to the acting user, since there is no form to
//! show errors on.

use std::sync::Arc;

use log::{error, info, warn};

use crate::error::{PollError, Result};
use crate::host::Host;
use crate::ledger::VoteLedger;
use crate::models::events::{Interaction, InteractionResponse, MessageRef};
use crate::models::form::PollForm;
use crate::models::user::User;
use crate::sequencer::{Advance, DraftProgress, LivePollSequencer};
use crate::store::RecordStore;
use crate::view::{ADD_CHOICE_ACTION, FINISH_ACTION, NEXT_POLL_ACTION, VOTE_ACTION};

pub const CREATE_POLL_VIEW: &str = "create-poll-modal";
pub const CREATE_LIVE_POLL_VIEW: &str = "create-live-poll-modal";
pub const ADD_OPTION_VIEW: &str = "add-option-modal-";

pub struct PollApp {
    host: Arc<dyn Host>,
    ledger: VoteLedger,
    sequencer: Arc<LivePollSequencer>,
}

impl PollApp {
    pub fn new(
        store: Arc<dyn RecordStore>,
        host: Arc<dyn Host>,
        sequencer: Arc<LivePollSequencer>,
    ) -> Self {
        PollApp {
            ledger: VoteLedger::new(store, host.clone(), sequencer.unit_of_work()),
            host,
            sequencer,
        }
    }

    pub async fn handle(&self, interaction: Interaction) -> InteractionResponse {
        match interaction {
            Interaction::BlockAction {
                action_id,
                value,
                user,
                room,
                message,
                ..
            } => {
                let Some(MessageRef { id: message_id }) = message else {
                    warn!("Ignoring {} action without a message", action_id);
                    return InteractionResponse::success();
                };
                match action_id.as_str() {
                    VOTE_ACTION => {
                        self.vote(&message_id, value.as_deref(), &user, &room)
                            .await
                    }
                    NEXT_POLL_ACTION => self.advance(&message_id, &user, &room).await,
                    FINISH_ACTION => self.finish(&message_id, &user, &room).await,
                    // the host opens the add-option form itself
                    ADD_CHOICE_ACTION => InteractionResponse::success(),
                    other => {
                        warn!("Unknown block action {}", other);
                        InteractionResponse::success()
                    }
                }
            }
            Interaction::ViewSubmit {
                view_id,
                user,
                room,
                app_id,
                state,
            } => {
                if let Some(message_id) = view_id.strip_prefix(ADD_OPTION_VIEW) {
                    self.add_option(message_id, &state).await
                } else if view_id.starts_with(CREATE_LIVE_POLL_VIEW) {
                    self.add_live_poll(&view_id, &state).await
                } else if view_id.starts_with(CREATE_POLL_VIEW) {
                    self.create_poll(&state, &user, &app_id, &room).await
                } else {
                    warn!("Unknown view {}", view_id);
                    InteractionResponse::success()
                }
            }
            Interaction::StartLiveSet {
                draft_id,
                total_polls,
                save,
                user,
                room,
                app_id,
                trigger_id,
            } => {
                self.begin_live_set(&draft_id, total_polls, save, &user, &room, &app_id, trigger_id)
                    .await
            }
            Interaction::LoadLiveSet { set_id, user, room } => {
                self.load_live_set(&set_id, &user, &room).await
            }
        }
    }

    pub async fn create_poll(
        &self,
        form: &PollForm,
        user: &User,
        app_id: &str,
        room: &str,
    ) -> InteractionResponse {
        form_response(self.sequencer.create_poll(form, user, app_id, room).await)
    }

    /// Casts or retracts `user`'s vote. `value` is the option index carried by
    /// the clicked button.
    pub async fn vote(
        &self,
        message_id: &str,
        value: Option<&str>,
        user: &User,
        room: &str,
    ) -> InteractionResponse {
        let result = match value.and_then(|v| v.trim().parse::<usize>().ok()) {
            Some(option) => self.ledger.vote(message_id, option, user).await.map(|_| ()),
            None => Err(PollError::validation("option", "No option was selected")),
        };
        self.action_response(result, user, room).await
    }

    pub async fn advance(&self, message_id: &str, user: &User, room: &str) -> InteractionResponse {
        let result = self.sequencer.advance_from_message(message_id).await;
        if let Ok(advance) = &result {
            info!("{} advanced from {}: {:?}", user.id, message_id, advance);
        }
        self.action_response(result.map(|_: Advance| ()), user, room)
            .await
    }

    pub async fn finish(&self, message_id: &str, user: &User, room: &str) -> InteractionResponse {
        let result = self.sequencer.finish(message_id, user).await.map(|_| ());
        self.action_response(result, user, room).await
    }

    pub async fn add_option(&self, message_id: &str, form: &PollForm) -> InteractionResponse {
        let label = form.poll.get("option").map(String::as_str).unwrap_or_default();
        form_response(self.ledger.add_option(message_id, label).await)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn begin_live_set(
        &self,
        draft_id: &str,
        total_polls: usize,
        save: bool,
        user: &User,
        room: &str,
        app_id: &str,
        trigger_id: Option<String>,
    ) -> InteractionResponse {
        let result = self
            .sequencer
            .begin_draft(draft_id, total_polls, save, user, room, app_id, trigger_id)
            .await;
        self.action_response(result.map(|_| ()), user, room).await
    }

    pub async fn add_live_poll(&self, draft_id: &str, form: &PollForm) -> InteractionResponse {
        let result = self.sequencer.add_poll(draft_id, form).await;
        match &result {
            Ok(DraftProgress::Pending { filled, total }) => {
                info!("Draft {} has {}/{} polls", draft_id, filled, total)
            }
            Ok(progress) => info!("Draft {} complete: {:?}", draft_id, progress),
            Err(_) => {}
        }
        form_response(result)
    }

    pub async fn load_live_set(&self, set_id: &str, user: &User, room: &str) -> InteractionResponse {
        let result = self.sequencer.start_set(set_id).await.map(|_| ());
        self.action_response(result, user, room).await
    }

    async fn action_response(&self, result: Result<()>, user: &User, room: &str) -> InteractionResponse {
        match result {
            Ok(()) => InteractionResponse::success(),
            Err(e) => {
                warn!("Action by {} failed: {}", user.id, e);
                if let Err(notify_err) = self.host.notify_user(user, room, &e.notice()).await {
                    error!("Failed to notify {}: {}", user.id, notify_err);
                }
                InteractionResponse::errors(e.to_field_errors())
            }
        }
    }
}

fn form_response<T>(result: Result<T>) -> InteractionResponse {
    match result {
        Ok(_) => InteractionResponse::success(),
        Err(e) => {
            warn!("Form submission failed: {}", e);
            InteractionResponse::errors(e.to_field_errors())
        }
    }
}
