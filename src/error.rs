//! Error taxonomy shared by the moderation pipeline.
//!
//! Handlers and commands work with `anyhow::Result`; the types here are the
//! domain errors the pipeline inspects to decide how a failure degrades.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file does not exist.
    #[error("settings file {0} not found")]
    Missing(PathBuf),

    /// Settings file exists but could not be read or written.
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML.
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings document could not be serialized back to disk.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failure of a call against the chat platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The bot lacks a capability required for the call.
    #[error("missing permission: {0}")]
    Permission(String),

    /// Target member, channel, role or message no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or API failure, treated as transient.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    #[inline]
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission(_))
    }
}

impl From<serenity::Error> for GatewayError {
    fn from(err: serenity::Error) -> Self {
        use serenity::Error;
        use serenity::model::ModelError;

        match err {
            Error::Http(ref http) => match http.status_code().map(|s| s.as_u16()) {
                Some(401 | 403) => Self::Permission(err.to_string()),
                Some(404) => Self::NotFound(err.to_string()),
                _ => Self::Transport(err.to_string()),
            },
            Error::Model(ModelError::InvalidPermissions { .. } | ModelError::Hierarchy) => {
                Self::Permission(err.to_string())
            }
            Error::Model(ModelError::MemberNotFound | ModelError::RoleNotFound) => {
                Self::NotFound(err.to_string())
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Failure while persisting the reaction-role table.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode reaction roles: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of the text-completion endpoint used for welcome messages.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion endpoint returned no text")]
    Empty,
}
