use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, name: impl Into<String>) -> Self {
        User {
            id: id.into(),
            username: username.into(),
            name: name.into(),
        }
    }

    /// Display name if the host provided one, username otherwise.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}
