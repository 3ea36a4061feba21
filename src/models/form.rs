use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, PollError, Result};
use crate::models::poll::PollSpec;

const OPTION_PREFIX: &str = "option-";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
    #[serde(rename = "single")]
    #[default]
    Single,
    #[serde(rename = "multiple")]
    Multiple,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollVisibility {
    #[serde(rename = "open")]
    #[default]
    Open,
    #[serde(rename = "confidential")]
    Confidential,
    #[serde(rename = "mixed")]
    Mixed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PollConfig {
    #[serde(default)]
    pub mode: Option<PollMode>,
    #[serde(default)]
    pub visibility: Option<PollVisibility>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MixedVisibility {
    /// Option slots (as in `option-<n>`) whose voters stay hidden.
    #[serde(rename = "anonymousOptions", default)]
    pub anonymous_options: Vec<usize>,
}

/// Raw state of a submitted poll form.
///
/// `poll` holds the text inputs: `question`, `option-0`..`option-n` and, on
/// live poll forms, `ttv`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PollForm {
    #[serde(default)]
    pub poll: BTreeMap<String, String>,
    #[serde(default)]
    pub config: Option<PollConfig>,
    #[serde(rename = "mixedVisibility", default)]
    pub mixed_visibility: Option<MixedVisibility>,
}

impl PollForm {
    pub fn question(&self) -> Option<&str> {
        self.poll.get("question").map(String::as_str)
    }

    /// Option inputs ordered by slot number.
    fn option_slots(&self) -> Vec<(usize, &str)> {
        let mut slots: Vec<(usize, &str)> = self
            .poll
            .iter()
            .filter_map(|(key, value)| {
                let slot = key.strip_prefix(OPTION_PREFIX)?.parse().ok()?;
                Some((slot, value.as_str()))
            })
            .collect();
        slots.sort_by_key(|(slot, _)| *slot);
        slots
    }

    /// Validates the form, collecting every failing field.
    pub fn validate(&self, live: bool) -> Result<PollSpec> {
        let mut errors = FieldErrors::new();

        let question = self.question().map(str::trim).unwrap_or_default();
        if question.is_empty() {
            errors.insert("question", "Please type your question here");
        }

        let slots = self.option_slots();
        let mut options = Vec::new();
        let mut slot_to_option = BTreeMap::new();
        for (slot, value) in &slots {
            let label = value.trim();
            if !label.is_empty() {
                slot_to_option.insert(*slot, options.len());
                options.push(label.to_owned());
            }
        }
        if options.len() < 2 {
            let missing = 2 - options.len();
            let empty_slots = (0..)
                .filter(|slot| !slot_to_option.contains_key(slot))
                .take(missing);
            for slot in empty_slots {
                errors.insert(format!("{OPTION_PREFIX}{slot}"), "Please provide one more option");
            }
        }

        let ttv = if live {
            match self.poll.get("ttv").map(|raw| raw.trim().parse::<f64>()) {
                // must be representable as a timer delay
                Some(Ok(seconds)) if Duration::try_from_secs_f64(seconds).is_ok() => Some(seconds),
                _ => {
                    errors.insert("ttv", "Please enter a valid time for the poll to end");
                    None
                }
            }
        } else {
            None
        };

        if !errors.is_empty() {
            return Err(PollError::Validation(errors));
        }

        let config = self.config.clone().unwrap_or_default();
        let anonymous_options = match config.visibility.unwrap_or_default() {
            PollVisibility::Open => BTreeSet::new(),
            PollVisibility::Confidential => (0..options.len()).collect(),
            PollVisibility::Mixed => self
                .mixed_visibility
                .iter()
                .flat_map(|mixed| mixed.anonymous_options.iter())
                .filter_map(|slot| slot_to_option.get(slot).copied())
                .collect(),
        };

        Ok(PollSpec {
            question: question.to_owned(),
            options,
            anonymous_options,
            multiple_choice: config.mode.unwrap_or_default() == PollMode::Multiple,
            ttv,
        })
    }
}
