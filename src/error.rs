//! Crate-level error type

use crate::directory::DirectoryError;

/// Errors surfaced by the server and its startup path
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket bind or accept failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Project directory could not be loaded
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

pub type Result<T> = std::result::Result<T, Error>;
