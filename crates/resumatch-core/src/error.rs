//! Core error types for resumatch-core.
//!
//! This module defines the error hierarchy using thiserror. Every failure a
//! caller can see falls into one of the categories below; none of them is
//! fatal, the CLI turns each into a message and a non-zero exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for resumatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Authentication-related errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Network or backend errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credential storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error came from a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Auth(AuthError::Unauthorized))
    }
}

/// Authentication errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The backend rejected the submitted credentials
    #[error("{0}")]
    InvalidCredentials(String),

    /// The bearer token's `exp` claim lies in the past
    #[error("Access token expired")]
    TokenExpired,

    /// The bearer token could not be decoded
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// The backend answered 401 to an authenticated request
    #[error("Session expired or revoked, please log in again")]
    Unauthorized,

    /// An authenticated operation was attempted without a session
    #[error("Not logged in")]
    NotAuthenticated,
}

/// Network and backend errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("{detail} (HTTP {status})")]
    Status { status: u16, detail: String },

    /// The response body did not have the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// A success status whose body reports `"ok": false`
    #[error("Request not accepted: {0}")]
    Rejected(String),

    /// The configured base URL cannot be joined with an endpoint path
    #[error("Invalid API URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Validation errors raised before any request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required form field is missing or blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Two fields that must agree do not
    #[error("{field}: {message}")]
    Mismatch { field: String, message: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Credential storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing a scope file failed
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scope file holds something other than a JSON object of strings
    #[error("Corrupt credential file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The OS keyring refused the operation
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

impl From<keyring::Error> for StorageError {
    fn from(err: keyring::Error) -> Self {
        StorageError::Keyring(err.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Transport(TransportError::Request(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
