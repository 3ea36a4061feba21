use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::host::{DEFAULT_TIMEZONE, TIMEZONE_SETTING, USE_USER_NAME_SETTING};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub bot_token: String,
    pub bot_name: String,
    pub use_user_name: bool,
    pub timezone: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server_url = lookup("POLL_SERVER_URL").context("POLL_SERVER_URL is not set")?;
        let bot_token = lookup("POLL_BOT_TOKEN").context("POLL_BOT_TOKEN is not set")?;
        let use_user_name = match lookup("POLL_USE_USER_NAME") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .with_context(|| format!("POLL_USE_USER_NAME must be true or false, got {raw:?}"))?,
            None => false,
        };

        Ok(Config {
            server_url,
            bot_token,
            bot_name: lookup("POLL_BOT_NAME").unwrap_or_else(|| "poll".to_owned()),
            use_user_name,
            timezone: lookup("POLL_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_owned()),
        })
    }

    /// Host settings as the poll views read them.
    pub fn settings(&self) -> HashMap<String, Value> {
        HashMap::from([
            (USE_USER_NAME_SETTING.to_owned(), Value::Bool(self.use_user_name)),
            (TIMEZONE_SETTING.to_owned(), Value::String(self.timezone.clone())),
        ])
    }

    pub fn websocket_url(&self) -> String {
        format!("{}/bot", self.server_url.trim_end_matches('/').replacen("http", "ws", 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_apply_to_optional_settings() {
        let config = Config::from_lookup(lookup(&[
            ("POLL_SERVER_URL", "https://chat.example.com/"),
            ("POLL_BOT_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.bot_name, "poll");
        assert!(!config.use_user_name);
        assert_eq!(config.timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.websocket_url(), "wss://chat.example.com/bot");
        assert_eq!(config.settings()[USE_USER_NAME_SETTING], Value::Bool(false));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Config::from_lookup(lookup(&[("POLL_SERVER_URL", "http://localhost:3000")]))
            .unwrap_err();
        assert!(err.to_string().contains("POLL_BOT_TOKEN"));
    }

    #[test]
    fn use_user_name_must_be_a_bool() {
        let vars = [
            ("POLL_SERVER_URL", "http://localhost:3000"),
            ("POLL_BOT_TOKEN", "secret"),
            ("POLL_USE_USER_NAME", "yes"),
        ];
        assert!(Config::from_lookup(lookup(&vars)).is_err());

        let vars = [
            ("POLL_SERVER_URL", "http://localhost:3000"),
            ("POLL_BOT_TOKEN", "secret"),
            ("POLL_USE_USER_NAME", "true"),
            ("POLL_TIMEZONE", "Europe/Berlin"),
        ];
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.use_user_name);
        assert_eq!(config.settings()[TIMEZONE_SETTING], Value::String("Europe/Berlin".into()));
        assert_eq!(config.websocket_url(), "ws://localhost:3000/bot");
    }
}
