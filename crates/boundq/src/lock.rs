//! Cross-process exclusive lock on a backing store.
//!
//! `flock` locks belong to the open file description, so two handles in the
//! same process exclude each other only because each opens its own `File`.
//! Threads sharing one handle must serialize above this layer.
//! The kernel drops the lock if the holder dies, so a crashed process never
//! wedges a queue.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// Held for the duration of one queue mutation. Unlocks on drop.
pub(crate) struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    pub(crate) fn exclusive(file: &'a File) -> io::Result<Self> {
        loop {
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc == 0 {
                return Ok(Self { file });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}
