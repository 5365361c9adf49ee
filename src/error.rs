//! Error types for mail-herald.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Top-level error type for a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Command pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("State store error: {0}")]
    State(#[from] StateError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not resolve the data directory: {0}")]
    DataDir(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// OAuth token acquisition errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(
        "Client secret not found at {}. Download the installed-app \
         client_secret.json from the Google Cloud console and place it there.",
        .path.display()
    )]
    MissingClientSecret { path: PathBuf },

    #[error("Token endpoint rejected the request: {0}")]
    TokenEndpoint(String),

    #[error("No authorization code was entered")]
    NoAuthorizationCode,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mail provider errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Mail API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed message {id}: {reason}")]
    Decode { id: String, reason: String },
}

/// Command pipeline errors.
///
/// A pipeline invocation is all-or-nothing: any stage failing to start or
/// exiting non-zero fails the whole invocation, and no output is returned.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Stage {stage} ({program}) failed to start: {source}")]
    Launch {
        stage: usize,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage {stage} ({program}) exited with {status}")]
    Execution {
        stage: usize,
        program: String,
        status: ExitStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State persistence errors. A missing state file is not an error; the
/// store reports it as `Ok(None)` and the caller bootstraps.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run-level conditions that end a sync without dispatching.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("The mailbox has no messages")]
    NoMessages,

    #[error("No new messages matched the configured filters")]
    NoApplicableMessages,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
