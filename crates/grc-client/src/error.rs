use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Request to {url} failed with status {status}: {body}")]
    Status { url: String, status: u16, body: String },
}
