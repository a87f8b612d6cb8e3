//! Error types for nmtv

use crate::types::Channel;
use thiserror::Error;

/// Coarse error classification, used by the CLI to pick a message tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Network errors
    NetworkError,
    CatalogError,

    // User errors
    UnknownChannel,
    InvalidConfig,

    // Engine errors
    EmptyQueue,

    // System errors
    FileError,
}

/// Main error type for nmtv
#[derive(Error, Debug)]
pub enum NmtvError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog returned an unusable response: {0}")]
    Catalog(String),

    #[error("Catalog returned no items for channel {0}")]
    EmptyBlock(Channel),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NmtvError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Catalog(_) => ErrorCode::CatalogError,
            Self::EmptyBlock(_) => ErrorCode::EmptyQueue,
            Self::UnknownChannel(_) => ErrorCode::UnknownChannel,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::File(_) => ErrorCode::FileError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::Json(_) => ErrorCode::CatalogError,
        }
    }
}

pub type Result<T> = std::result::Result<T, NmtvError>;
