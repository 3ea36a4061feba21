use async_trait::async_trait;
use log::warn;
use serde_json::Value;

use crate::error::Result;
use crate::models::user::User;
use crate::view::PollView;

pub const USE_USER_NAME_SETTING: &str = "use-user-name";
pub const TIMEZONE_SETTING: &str = "timezone";
pub const DEFAULT_TIMEZONE: &str = "America/Danmarkshavn";

/// Username alias poll messages are sent under.
pub const POLL_ALIAS: &str = "Poll";

/// Messaging primitives of the chat host.
#[async_trait]
pub trait Host: Send + Sync {
    /// Posts a new message to `room`, returning its id.
    async fn send_message(&self, room: &str, sender: &User, view: &PollView) -> Result<String>;

    /// Replaces the blocks of an existing message.
    async fn update_message(&self, message_id: &str, view: &PollView) -> Result<()>;

    /// Sends a notice only `user` can see.
    async fn notify_user(&self, user: &User, room: &str, text: &str) -> Result<()>;

    async fn read_setting(&self, key: &str) -> Result<Option<Value>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub show_names: bool,
    pub timezone: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            show_names: false,
            timezone: DEFAULT_TIMEZONE.to_owned(),
        }
    }
}

impl DisplaySettings {
    pub async fn load(host: &dyn Host) -> Result<Self> {
        let mut settings = DisplaySettings::default();

        match host.read_setting(USE_USER_NAME_SETTING).await? {
            Some(Value::Bool(show)) => settings.show_names = show,
            Some(other) => warn!("Ignoring non-boolean {} setting: {}", USE_USER_NAME_SETTING, other),
            None => {}
        }

        match host.read_setting(TIMEZONE_SETTING).await? {
            Some(Value::String(tz)) if !tz.trim().is_empty() => settings.timezone = tz,
            Some(other) => warn!("Ignoring invalid {} setting: {}", TIMEZONE_SETTING, other),
            None => {}
        }

        Ok(settings)
    }
}
