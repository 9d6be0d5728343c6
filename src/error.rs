//! Error types for the bad sector simulator.

use crate::sector::ParseError;
use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in simulator operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request touched a bad sector that could not be used or repaired.
    #[error("Device fault at sector {sector}")]
    DeviceFault { sector: u64 },

    /// Malformed bad sector specification.
    #[error("Invalid bad sector list: {0}")]
    Parse(#[from] ParseError),

    /// Configuration file could not be read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration values are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Permission denied opening the disk image.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed line in a batch script.
    #[error("Script error on line {line}: {message}")]
    Script { line: usize, message: String },

    /// The engine has been shut down.
    #[error("Device has been shut down")]
    ShutDown,
}

impl Error {
    /// POSIX errno reported to a filesystem layer for this error.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            Error::DeviceFault { .. } => libc::EIO,
            Error::Parse(_)
            | Error::Config(_)
            | Error::InvalidConfig(_)
            | Error::Script { .. } => libc::EINVAL,
            Error::PermissionDenied(_) => libc::EACCES,
            Error::ShutDown => libc::EBADF,
        }
    }

    /// Whether this error is a simulated sector failure.
    pub fn is_device_fault(&self) -> bool {
        matches!(self, Error::DeviceFault { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
