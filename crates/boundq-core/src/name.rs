//! Queue names.
//!
//! Names follow the POSIX message queue convention: an optional single
//! leading slash followed by one path component. `"/jobs"` and `"jobs"`
//! refer to the same queue. The canonical display form carries the slash.

use std::fmt;
use std::str::FromStr;

use crate::error::QueueError;

/// Longest accepted name, not counting the leading slash. Leaves room for
/// [`FILE_EXTENSION`] within a 255-byte file name.
pub const MAX_NAME_LEN: usize = 252;

/// Suffix of a queue's backing file inside a namespace directory.
pub const FILE_EXTENSION: &str = ".bq";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueName(String);

impl QueueName {
    pub fn parse(raw: &str) -> Result<Self, QueueError> {
        let invalid = |reason| QueueError::InvalidName {
            name: raw.to_string(),
            reason,
        };

        let bare = raw.strip_prefix('/').unwrap_or(raw);
        if bare.is_empty() {
            return Err(invalid("name is empty"));
        }
        if bare.len() > MAX_NAME_LEN {
            return Err(invalid("name is longer than 252 bytes"));
        }
        if bare == "." || bare == ".." {
            return Err(invalid("name is a relative path component"));
        }
        if bare.contains('/') {
            return Err(invalid("only a single leading slash is allowed"));
        }
        if !bare
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        {
            return Err(invalid("allowed characters are A-Z a-z 0-9 . _ -"));
        }
        Ok(Self(bare.to_string()))
    }

    /// The name without its leading slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, FILE_EXTENSION)
    }

    /// Recover a name from a backing file name. Returns `None` for files
    /// that do not belong to a queue.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        file_name
            .strip_suffix(FILE_EXTENSION)
            .and_then(|bare| Self::parse(bare).ok())
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
