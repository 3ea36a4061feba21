use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;
use crate::models::form::PollForm;
use crate::models::user::User;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MessageRef {
    pub id: String,
}

/// Something a user did in the chat host.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum Interaction {
    /// A button on a poll message was clicked.
    #[serde(rename = "BLOCK_ACTION")]
    BlockAction {
        #[serde(rename = "actionId")]
        action_id: String,
        #[serde(default)]
        value: Option<String>,
        user: User,
        room: String,
        #[serde(default)]
        message: Option<MessageRef>,
        #[serde(rename = "triggerId", default)]
        trigger_id: Option<String>,
    },
    /// A poll form was submitted.
    #[serde(rename = "VIEW_SUBMIT")]
    ViewSubmit {
        #[serde(rename = "viewId")]
        view_id: String,
        user: User,
        room: String,
        #[serde(rename = "appId")]
        app_id: String,
        state: PollForm,
    },
    /// `/poll live <n> [save]`: open a draft for `total_polls` polls.
    #[serde(rename = "START_LIVE_SET")]
    StartLiveSet {
        #[serde(rename = "draftId")]
        draft_id: String,
        #[serde(rename = "totalPolls")]
        total_polls: usize,
        #[serde(default)]
        save: bool,
        user: User,
        room: String,
        #[serde(rename = "appId")]
        app_id: String,
        #[serde(rename = "triggerId", default)]
        trigger_id: Option<String>,
    },
    /// `/poll live load <id>`: display a saved set.
    #[serde(rename = "LOAD_LIVE_SET")]
    LoadLiveSet {
        #[serde(rename = "setId")]
        set_id: String,
        user: User,
        room: String,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InteractionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl InteractionResponse {
    pub fn success() -> Self {
        InteractionResponse {
            success: true,
            errors: None,
        }
    }

    pub fn errors(errors: FieldErrors) -> Self {
        InteractionResponse {
            success: false,
            errors: Some(errors),
        }
    }
}
