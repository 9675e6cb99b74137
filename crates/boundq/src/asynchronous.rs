//! Async wrapper for tokio callers.
//!
//! Blocking operations run on tokio's blocking pool. Dropping a pending
//! future does not cancel the operation underneath: a receive that
//! completes after its future was dropped consumes the message. Use
//! `receive_timeout` when the caller may give up.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use boundq_core::QueueError;

use crate::handle::{Handle, Message, QueueAttributes};

#[derive(Debug, Clone)]
pub struct AsyncHandle {
    inner: Arc<Handle>,
}

impl AsyncHandle {
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(handle),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.inner
    }

    pub async fn send(&self, payload: Bytes, priority: u32) -> Result<(), QueueError> {
        let handle = self.inner.clone();
        spawn(move || handle.send(&payload, priority)).await
    }

    pub async fn send_timeout(
        &self,
        payload: Bytes,
        priority: u32,
        timeout: Duration,
    ) -> Result<(), QueueError> {
        let handle = self.inner.clone();
        spawn(move || handle.send_timeout(&payload, priority, timeout)).await
    }

    pub async fn receive(&self) -> Result<Message, QueueError> {
        let handle = self.inner.clone();
        spawn(move || handle.receive()).await
    }

    pub async fn receive_timeout(&self, timeout: Duration) -> Result<Message, QueueError> {
        let handle = self.inner.clone();
        spawn(move || handle.receive_timeout(timeout)).await
    }

    /// Never blocks, so runs inline.
    pub fn try_send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError> {
        self.inner.try_send(payload, priority)
    }

    /// Never blocks, so runs inline.
    pub fn try_receive(&self) -> Result<Message, QueueError> {
        self.inner.try_receive()
    }

    pub fn attributes(&self) -> Result<QueueAttributes, QueueError> {
        self.inner.attributes()
    }

    /// Close the underlying handle for every clone. Pending operations wake
    /// up and fail with `InvalidHandle`.
    pub fn close(&self) {
        self.inner.close();
    }
}

async fn spawn<T, F>(op: F) -> Result<T, QueueError>
where
    F: FnOnce() -> Result<T, QueueError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| QueueError::Io {
            op: "join blocking queue task",
            path: PathBuf::new(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })?
}
