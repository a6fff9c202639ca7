use crate::core::models::provider::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A driver or builder was used in a way that can never succeed, e.g. a
    /// dynamics driver without a step algorithm or a run without a
    /// convergence threshold. Reported at first use, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The restart file exists but its payload cannot be decoded. The run
    /// must not silently fall back to fresh state; the user may need to
    /// delete the named file.
    #[error(
        "Could not decode restart file '{}'. You may need to delete the restart file: {source}",
        path.display()
    )]
    Restart {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The energy/force provider failed. Propagates unmodified; retries, if
    /// desired, belong to the provider.
    #[error("Provider failed: {source}")]
    Provider {
        #[from]
        source: ProviderError,
    },

    /// A log, trajectory, or restart sink could not be written or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
