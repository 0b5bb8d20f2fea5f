//! Local storage errors
//!
//! Filesystem faults record which backend step failed and a coarse cause,
//! so callers can tell a full disk or a locked directory apart from a
//! broken value.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The backend step that touched the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    /// Creating the data directory
    Prepare,
    Read,
    Write,
    Remove,
    /// Moving a finished temp file over the stored value
    Replace,
}

impl fmt::Display for IoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            IoAction::Prepare => "prepare",
            IoAction::Read => "read",
            IoAction::Write => "write",
            IoAction::Remove => "remove",
            IoAction::Replace => "replace",
        };
        f.write_str(verb)
    }
}

/// Why the filesystem refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCause {
    Denied,
    NoSpace,
    Other,
}

impl IoCause {
    /// Classify an I/O error
    ///
    /// Full disks have no portable error kind, so they are recognized by
    /// the OS message.
    pub fn of(error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            return IoCause::Denied;
        }
        let text = error.to_string().to_lowercase();
        let no_space = ["no space left", "disk full", "quota exceeded", "not enough space"]
            .iter()
            .any(|marker| text.contains(marker));
        if no_space {
            IoCause::NoSpace
        } else {
            IoCause::Other
        }
    }
}

impl fmt::Display for IoCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoCause::Denied => f.write_str("permission denied"),
            IoCause::NoSpace => f.write_str("out of disk space"),
            IoCause::Other => f.write_str("I/O error"),
        }
    }
}

/// Errors from a key-value backend or the local store on top of it
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot {action} '{}' ({cause}): {source}", .path.display())]
    Io {
        action: IoAction,
        cause: IoCause,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored value exists but cannot be decoded
    #[error("Stored value '{key}' is corrupted: {details}")]
    Corrupt { key: String, details: String },

    /// Caller-supplied payload has the wrong shape
    #[error("Invalid payload: {details}")]
    InvalidFormat { details: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    /// Wrap a filesystem failure, classifying its cause
    pub fn io(action: IoAction, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            action,
            cause: IoCause::of(&source),
            path: path.into(),
            source,
        }
    }

    /// Whether the operator can fix this without losing data
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Io { cause, .. } => *cause != IoCause::Other,
            StorageError::Corrupt { .. } => true,
            _ => false,
        }
    }

    /// What the operator can do about it
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::Io {
                cause: IoCause::Denied,
                ..
            } => Some("Make the data directory writable by this user, or set data_dir elsewhere."),
            StorageError::Io {
                cause: IoCause::NoSpace,
                ..
            } => Some("Free some disk space and run the command again."),
            StorageError::Io {
                action: IoAction::Prepare,
                ..
            } => Some("Point data_dir at a location that can be created."),
            StorageError::Corrupt { .. } => {
                Some("Run `folio restore` with a backup file, or import an earlier export.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
