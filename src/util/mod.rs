//! Shared utilities: logging, bounded file reads, keyword normalization.

use crate::error::{EngineError, EngineResult};
use std::path::Path;
use tracing::Level;

/// Initialize tracing with env filter. Safe to call once at startup.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Normalize a keyword for comparison (trim, uppercase).
pub fn normalize_keyword(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Read a UTF-8 file, refusing anything larger than `max_bytes`.
pub fn read_bounded(path: &Path, max_bytes: u64) -> EngineResult<String> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(EngineError::InputTooLarge {
            path: path.to_path_buf(),
            bytes: size,
        });
    }
    Ok(std::fs::read_to_string(path)?)
}
