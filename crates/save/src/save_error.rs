//! Typed errors for the save/load pipeline.

use std::io;

use thiserror::Error;

/// Errors surfaced by save and load operations.
#[derive(Debug, Error)]
pub enum SaveError {
    /// File could not be read or written.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The file failed a structural check: bad magic, truncated header,
    /// checksum mismatch, or an undecodable payload.
    #[error("save file is corrupted: {reason}")]
    Corrupt { reason: String },
    /// The file was written by a newer build than this one.
    #[error("save format version {found} is newer than this build supports")]
    UnsupportedVersion { found: u32 },
}

impl SaveError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        SaveError::Corrupt {
            reason: reason.into(),
        }
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::corrupt(e.to_string())
    }
}
