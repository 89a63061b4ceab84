use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_EMAIL: &str = "user@example.com";
pub const DEFAULT_USER_NAME: &str = "Example User";

/// Identity sent in the `X-ggrc-user` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// The administrator account the application seeds on startup.
    pub fn superuser() -> Self {
        Self::new(DEFAULT_USER_EMAIL, DEFAULT_USER_NAME)
    }
}

impl Default for User {
    fn default() -> Self {
        Self::superuser()
    }
}
