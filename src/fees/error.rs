use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("API key file {0} does not exist")]
    MissingApiKey(PathBuf),
    #[error("API key file {0} is empty")]
    EmptyApiKey(PathBuf),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value error: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}

impl Error {
    /// Timeouts, connection failures and 5xx responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|status| status.is_server_error())
            }
            _ => false,
        }
    }
}
