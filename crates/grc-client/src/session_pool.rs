use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ClientError, ClientResult};
use crate::user::User;

pub const USER_HEADER: &str = "X-ggrc-user";
pub const REQUESTED_BY_HEADER: &str = "X-Requested-By";
pub const REQUESTED_BY: &str = "GGRC";

/// One HTTP client per user email, created on first use.
#[derive(Debug, Default)]
pub struct SessionPool {
    sessions: Mutex<HashMap<String, Client>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Client>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_session(&self, user: &User) -> ClientResult<Client> {
        if let Some(client) = self.lock().get(&user.email) {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .default_headers(Self::session_headers(user)?)
            .build()?;
        tracing::debug!(email = %user.email, "Created session");
        Ok(self
            .lock()
            .entry(user.email.clone())
            .or_insert(client)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn session_headers(user: &User) -> ClientResult<HeaderMap> {
        let identity = serde_json::to_string(user).map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_HEADER,
            HeaderValue::from_str(&identity).map_err(|e| ClientError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(REQUESTED_BY_HEADER, HeaderValue::from_static(REQUESTED_BY));
        Ok(headers)
    }
}
