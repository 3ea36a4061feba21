use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field name -> message, rendered inline next to the offending form field.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error("no such poll: {0}")]
    NotFound(String),

    #[error("poll is already finished")]
    AlreadyFinished,

    #[error("only the poll creator can finish this poll")]
    NotPollCreator,

    #[error("store error: {0}")]
    Store(String),

    #[error("host error: {0}")]
    Host(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl PollError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PollError::Validation(FieldErrors::single(field, message))
    }

    /// Text of the notice the acting user gets when an action fails.
    pub fn notice(&self) -> String {
        format!("Poll: {self}")
    }

    /// Errors as shown on a form: validation maps pass through, everything else
    /// lands on the form itself.
    pub fn to_field_errors(&self) -> FieldErrors {
        match self {
            PollError::Validation(errors) => errors.clone(),
            other => FieldErrors::single("form", other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_their_fields() {
        let mut errors = FieldErrors::new();
        errors.insert("question", "Please type your question here");
        errors.insert("ttv", "Please enter a valid time for the poll to end");

        let mapped = PollError::Validation(errors.clone()).to_field_errors();
        assert_eq!(mapped, errors);
        assert_eq!(mapped.len(), 2);
    }

    #[test]
    fn other_errors_land_on_the_form() {
        let mapped = PollError::AlreadyFinished.to_field_errors();
        assert_eq!(mapped.get("form"), Some("poll is already finished"));
    }

    #[test]
    fn notice_names_the_error() {
        assert_eq!(PollError::AlreadyFinished.notice(), "Poll: poll is already finished");
    }

    #[test]
    fn field_errors_serialize_as_a_flat_map() {
        let errors = FieldErrors::single("option-1", "Please provide one more option");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["option-1"], "Please provide one more option");
    }
}
