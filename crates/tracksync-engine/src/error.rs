//! Error types for the replay driver binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and session execution.

use std::path::PathBuf;

/// Top-level error for the replay driver.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tracksync_core::config::ConfigError,
    },

    /// The replay script could not be read.
    #[error("failed to read replay {path}: {source}")]
    ReplayIo {
        /// Path of the replay script.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The replay script is not valid.
    #[error("invalid replay script: {message}")]
    Replay {
        /// Description of the problem.
        message: String,
    },

    /// The session runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: tracksync_core::runner::RunnerError,
    },
}
