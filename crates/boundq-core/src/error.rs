//! Error taxonomy shared by every boundq crate.
//!
//! Each queue operation reports exactly one `QueueError` to its caller.
//! Nothing is retried or swallowed inside the engine; callers decide.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Coarse classification of a [`QueueError`].
///
/// The `Display` form is the stable name printed by the command-line tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidConfig,
    InvalidName,
    PermissionDenied,
    MessageTooLarge,
    InvalidHandle,
    WouldBlock,
    Timeout,
    ResourceExhausted,
    Corrupted,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::InvalidName => "InvalidName",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::MessageTooLarge => "MessageTooLarge",
            ErrorKind::InvalidHandle => "InvalidHandle",
            ErrorKind::WouldBlock => "WouldBlock",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ResourceExhausted => "ResourceExhausted",
            ErrorKind::Corrupted => "Corrupted",
            ErrorKind::Io => "Io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue {0} does not exist")]
    NotFound(String),

    #[error("queue {0} already exists")]
    AlreadyExists(String),

    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid queue name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("payload length {len} exceeds maximum message size {max}")]
    MessageTooLarge { len: usize, max: usize },

    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    #[error("operation would block")]
    WouldBlock,

    #[error("operation timed out")]
    Timeout,

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("queue store {} is corrupted: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::NotFound(_) => ErrorKind::NotFound,
            QueueError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            QueueError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            QueueError::InvalidName { .. } => ErrorKind::InvalidName,
            QueueError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            QueueError::MessageTooLarge { .. } => ErrorKind::MessageTooLarge,
            QueueError::InvalidHandle(_) => ErrorKind::InvalidHandle,
            QueueError::WouldBlock => ErrorKind::WouldBlock,
            QueueError::Timeout => ErrorKind::Timeout,
            QueueError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            QueueError::Corrupted { .. } => ErrorKind::Corrupted,
            QueueError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Classify an OS error raised while performing `op` on `path`.
    ///
    /// `subject` names the thing the caller asked for (usually the queue
    /// name) and is what `NotFound` / `AlreadyExists` report.
    pub fn from_io(op: &'static str, subject: &str, path: &Path, source: io::Error) -> Self {
        let detail = || format!("{subject} ({op} {}: {source})", path.display());
        match source.raw_os_error() {
            Some(libc::ENOENT) => return QueueError::NotFound(subject.to_string()),
            Some(libc::EEXIST) => return QueueError::AlreadyExists(subject.to_string()),
            Some(libc::EACCES | libc::EPERM | libc::EROFS) => {
                return QueueError::PermissionDenied(detail())
            }
            Some(
                libc::ENOSPC
                | libc::ENOMEM
                | libc::EMFILE
                | libc::ENFILE
                | libc::EDQUOT
                | libc::EFBIG,
            ) => {
                return QueueError::ResourceExhausted(detail())
            }
            _ => {}
        }
        match source.kind() {
            io::ErrorKind::NotFound => QueueError::NotFound(subject.to_string()),
            io::ErrorKind::AlreadyExists => QueueError::AlreadyExists(subject.to_string()),
            io::ErrorKind::PermissionDenied => QueueError::PermissionDenied(detail()),
            io::ErrorKind::OutOfMemory => QueueError::ResourceExhausted(detail()),
            _ => QueueError::Io {
                op,
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
