//! Error taxonomy
//!
//! Config problems are caught before any network call; remote failures name
//! the operation that failed so "service unreachable" and "nothing to act on"
//! stay distinguishable.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to {op}: {message}")]
    Remote { op: &'static str, message: String },

    #[error("no timer is currently running")]
    NoRunningTimer,

    #[error("cancelled")]
    Cancelled,

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl Error {
    pub fn remote(op: &'static str, message: impl Into<String>) -> Self {
        Error::Remote {
            op,
            message: message.into(),
        }
    }
}
