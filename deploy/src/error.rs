use std::io;

use thiserror::Error;

/// Errors raised while discovering, building or deploying contracts.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A contract file, generated client or client class is missing.
    #[error("{0}")]
    NotFound(String),

    /// The compiler or client generator exited non-zero.
    #[error("Could not {step}:\n{output}")]
    Build { step: &'static str, output: String },

    /// The installed AlgoKit does not know the `generate client` command.
    #[error("AlgoKit >= 2.0.0 required for client generation. Please update AlgoKit.")]
    ToolchainVersion,

    #[error("{0}")]
    Deploy(String),

    #[error("{0}")]
    Usage(String),

    #[error("failed to run `{program}`: {source}")]
    Spawn { program: String, source: io::Error },

    /// The Python client host replied with something we cannot interpret.
    #[error("client host protocol error: {0}")]
    Protocol(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
