use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds surfaced to the user by every command.
///
/// Handlers return `anyhow::Result`; these travel inside it so callers and
/// tests can still tell them apart with `downcast_ref`.
#[derive(Error, Debug)]
pub enum MakerError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("{provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MakerError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        MakerError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            MakerError::Validation(_) => 2,
            _ => 1,
        }
    }
}

/// Exit status for an error chain: 2 for validation problems, 1 otherwise.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<MakerError>())
        .map(MakerError::exit_code)
        .unwrap_or(1)
}
