//! Error types for the OrgGist client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Payload too large for server")]
    PayloadTooLarge,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A request for this session is already in flight")]
    Busy,

    #[error("Cannot submit files and pasted text together")]
    MixedSubmission,

    #[error("Nothing to submit: add a file or enter some text")]
    EmptySubmission,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
