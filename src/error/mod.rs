//! Errors raised at the I/O edge (scenario files, config, reports).
//!
//! The computational modules never fail; they recover with defaults.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file parsed but describes something the engine cannot use.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("{} is too large: {bytes} bytes", path.display())]
    InputTooLarge { path: PathBuf, bytes: u64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
