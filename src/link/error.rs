use std::io;

use thiserror::Error;

/// Errors the link pump and codec may encounter.
#[derive(Debug, Error)]
pub enum LinkError {
    /// IO related errors.
    #[error("Underlying IO problem")]
    Io(#[from] io::Error),
}
