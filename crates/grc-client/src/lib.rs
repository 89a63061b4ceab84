//! REST API client for the GRC web application.
//!
//! Requests are resolved against the configured app URL and sent through a
//! per-user session that carries the identity headers the application expects.

pub mod client;
pub mod error;
pub mod session_pool;
pub mod user;

pub use client::RestClient;
pub use error::{ClientError, ClientResult};
pub use session_pool::SessionPool;
pub use user::User;
