use serde::{Deserialize, Serialize};

use crate::models::events::{Interaction, InteractionResponse};

#[derive(Serialize)]
pub struct RegisterBotMessageData<'a> {
    #[serde(rename = "botName")]
    pub bot_name: &'a str,
    pub token: &'a str,
}

#[derive(Serialize)]
pub struct RegisterBotMessage<'a> {
    #[serde(rename = "requestType")]
    pub msg_type: &'a str,
    pub data: RegisterBotMessageData<'a>,
}

/// Frame the host sends for each user interaction.
#[derive(Deserialize, Debug)]
pub struct InteractionEnvelope {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub interaction: Interaction,
}

/// Frame sent back once an interaction has been handled.
#[derive(Serialize, Debug)]
pub struct ResponseEnvelope {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub response: InteractionResponse,
}
