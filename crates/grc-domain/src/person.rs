use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PersonId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub const TYPE_NAME: &'static str = "Person";

    pub fn new(id: PersonId, email: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_valid_email(email: &str) -> bool {
        let email = email.trim();
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
            }
            None => false,
        }
    }
}
