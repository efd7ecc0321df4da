use std::path::PathBuf;

use crate::e_command_builder::ActionKind;

/// Everything that can stop an action before (or instead of) producing a run report.
///
/// Timeouts and non-zero exits are not errors: they are run outcomes carried by
/// [`crate::e_coordinator::RunState`]. Malformed `--output json` payloads degrade to
/// [`crate::e_success::Summary::ParseFailure`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no Move.toml found in {} or any parent directory", start.display())]
    ProjectNotFound { start: PathBuf },

    #[error("`{program}` was not found on PATH: {reason}")]
    ExecutableNotFound { program: String, reason: String },

    #[error("failed to launch `{}`: {source}", program.display())]
    ProcessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} already running")]
    AlreadyRunning(ActionKind),

    #[error("{0} is not running")]
    NotRunning(ActionKind),

    #[error("invalid network `{0}` (expected one of: local, devnet, testnet, mainnet)")]
    InvalidNetwork(String),

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("process runner dropped the completion channel for {0}")]
    ChannelClosed(ActionKind),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
