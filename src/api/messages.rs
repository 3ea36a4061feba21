use anyhow::Result;
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::view::{Block, PollView};

#[derive(Serialize, Debug)]
pub struct SendMessageRequest<'a> {
    #[serde(rename = "roomId")]
    pub room_id: &'a str,
    #[serde(rename = "senderId")]
    pub sender_id: &'a str,
    pub alias: &'a str,
    pub text: &'a str,
    pub blocks: &'a [Block],
}

#[derive(Deserialize, Debug)]
pub struct SendMessageResponse {
    #[serde(rename = "messageId")]
    pub message_id: String,
}

#[derive(Serialize, Debug)]
pub struct UpdateMessageRequest<'a> {
    pub text: &'a str,
    pub blocks: &'a [Block],
}

#[derive(Serialize, Debug)]
pub struct NotifyRequest<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    #[serde(rename = "roomId")]
    pub room_id: &'a str,
    pub alias: &'a str,
    pub text: &'a str,
}

pub async fn send_message(
    client: &Client,
    base_url: &str,
    token: &str,
    request: &SendMessageRequest<'_>,
) -> Result<SendMessageResponse, anyhow::Error> {
    let url = format!("{}/api/v1/polls/messages", base_url);
    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(request)
        .send()
        .await?;
    if resp.status().is_success() {
        let response = resp.json::<SendMessageResponse>().await?;
        info!("Message {} sent to {}", response.message_id, request.room_id);
        Ok(response)
    } else {
        error!("Failed to send message: {}", resp.status());
        Err(anyhow::anyhow!("Failed to send message ({})", resp.status()))
    }
}

pub async fn update_message(
    client: &Client,
    base_url: &str,
    token: &str,
    message_id: &str,
    view: &PollView,
) -> Result<(), anyhow::Error> {
    let url = format!("{}/api/v1/polls/messages/{}", base_url, message_id);
    let request = UpdateMessageRequest {
        text: &view.text,
        blocks: &view.blocks,
    };
    let resp = client
        .put(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&request)
        .send()
        .await?;
    if resp.status().is_success() {
        debug!("Message {} updated", message_id);
        Ok(())
    } else {
        error!("Failed to update message {}: {}", message_id, resp.status());
        Err(anyhow::anyhow!("Failed to update message {} ({})", message_id, resp.status()))
    }
}

pub async fn notify_user(
    client: &Client,
    base_url: &str,
    token: &str,
    request: &NotifyRequest<'_>,
) -> Result<(), anyhow::Error> {
    let url = format!("{}/api/v1/polls/notify", base_url);
    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(request)
        .send()
        .await?;
    if resp.status().is_success() {
        debug!("Notified {}", request.user_id);
        Ok(())
    } else {
        error!("Failed to notify {}: {}", request.user_id, resp.status());
        Err(anyhow::anyhow!("Failed to notify user ({})", resp.status()))
    }
}
