//! REST client for the chat host.

pub mod messages;

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::{PollError, Result};
use crate::host::{Host, POLL_ALIAS};
use crate::models::user::User;
use crate::view::PollView;

use self::messages::{NotifyRequest, SendMessageRequest};

pub struct RestHost {
    client: Client,
    base_url: String,
    token: String,
    settings: HashMap<String, Value>,
}

impl RestHost {
    pub fn new(config: &Config) -> Self {
        RestHost {
            client: Client::new(),
            base_url: config.server_url.trim_end_matches('/').to_owned(),
            token: config.bot_token.clone(),
            settings: config.settings(),
        }
    }
}

fn host_error(e: anyhow::Error) -> PollError {
    PollError::Host(format!("{:#}", e))
}

#[async_trait]
impl Host for RestHost {
    async fn send_message(&self, room: &str, sender: &User, view: &PollView) -> Result<String> {
        let request = SendMessageRequest {
            room_id: room,
            sender_id: &sender.id,
            alias: POLL_ALIAS,
            text: &view.text,
            blocks: &view.blocks,
        };
        messages::send_message(&self.client, &self.base_url, &self.token, &request)
            .await
            .map(|response| response.message_id)
            .map_err(host_error)
    }

    async fn update_message(&self, message_id: &str, view: &PollView) -> Result<()> {
        messages::update_message(&self.client, &self.base_url, &self.token, message_id, view)
            .await
            .map_err(host_error)
    }

    async fn notify_user(&self, user: &User, room: &str, text: &str) -> Result<()> {
        let request = NotifyRequest {
            user_id: &user.id,
            room_id: room,
            alias: POLL_ALIAS,
            text,
        };
        messages::notify_user(&self.client, &self.base_url, &self.token, &request)
            .await
            .map_err(host_error)
    }

    async fn read_setting(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.settings.get(key).cloned())
    }
}
