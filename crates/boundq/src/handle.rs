//! Handles — process-local capabilities on an open queue.
//!
//! A handle owns its own file description and mapping of the backing store.
//! Dropping or closing it never affects the queue or any other handle.
//! `Handle` is `Send + Sync`; threads may share one through an `Arc`.

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;

use boundq_core::layout::Layout;
use boundq_core::{QueueError, QueueName};

use crate::lock::FileLock;
use crate::region::Region;
use crate::wait::WakeWord;

/// One dequeued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: Bytes,
    pub priority: u32,
}

/// Snapshot of a queue's attributes and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueAttributes {
    pub capacity: usize,
    pub max_message_size: usize,
    /// Messages queued at the time of the snapshot.
    pub len: usize,
    pub total_sent: u64,
    pub total_received: u64,
}

/// Access mode a handle was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Mode {
    pub fn can_read(self) -> bool {
        matches!(self, Mode::ReadOnly | Mode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Mode::WriteOnly | Mode::ReadWrite)
    }
}

/// State shared by every thread using one handle.
struct Shared {
    file: File,
    path: PathBuf,
    // Serializes threads of this handle; `FileLock` serializes everyone else.
    region: Mutex<Region>,
    wake: WakeWord,
}

#[derive(Clone, Copy)]
enum Wait {
    Never,
    Until(Instant),
    Forever,
}

impl Wait {
    fn after(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or(Wait::Forever, Wait::Until)
    }
}

/// Whether a successful attempt changed the queue.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Publish {
    Yes,
    No,
}

pub struct Handle {
    name: QueueName,
    mode: Mode,
    layout: Layout,
    shared: RwLock<Option<Arc<Shared>>>,
}

impl Handle {
    pub(crate) fn new(name: QueueName, path: PathBuf, mode: Mode, file: File, region: Region) -> Self {
        let layout = region.layout();
        let wake = region.wake_word();
        tracing::debug!(queue = %name, ?mode, "queue handle opened");
        Self {
            name,
            mode,
            layout,
            shared: RwLock::new(Some(Arc::new(Shared {
                file,
                path,
                region: Mutex::new(region),
                wake,
            }))),
        }
    }

    pub fn name(&self) -> &QueueName {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    pub fn max_message_size(&self) -> usize {
        self.layout.max_message_size()
    }

    pub fn is_closed(&self) -> bool {
        self.shared
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Send `payload`, blocking while the queue is full.
    pub fn send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError> {
        self.send_with(payload, priority, Wait::Forever)
    }

    /// Send `payload`, failing with `WouldBlock` if the queue is full.
    pub fn try_send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError> {
        self.send_with(payload, priority, Wait::Never)
    }

    /// Send `payload`, failing with `Timeout` if no slot frees up in time.
    pub fn send_timeout(
        &self,
        payload: &[u8],
        priority: u32,
        timeout: Duration,
    ) -> Result<(), QueueError> {
        self.send_with(payload, priority, Wait::after(timeout))
    }

    /// Receive the most urgent message, blocking while the queue is empty.
    pub fn receive(&self) -> Result<Message, QueueError> {
        self.receive_with(Wait::Forever)
    }

    /// Receive the most urgent message, failing with `WouldBlock` if empty.
    pub fn try_receive(&self) -> Result<Message, QueueError> {
        self.receive_with(Wait::Never)
    }

    /// Receive the most urgent message, failing with `Timeout` if none
    /// arrives in time.
    pub fn receive_timeout(&self, timeout: Duration) -> Result<Message, QueueError> {
        self.receive_with(Wait::after(timeout))
    }

    /// Current attributes and counters of the queue.
    pub fn attributes(&self) -> Result<QueueAttributes, QueueError> {
        let shared = self.shared()?;
        self.run(&shared, Wait::Never, Publish::No, |region| {
            Ok(Some(region.attributes()))
        })
    }

    /// Release this handle. Idempotent. Threads blocked on this handle wake
    /// up and fail with `InvalidHandle`.
    pub fn close(&self) {
        let taken = self
            .shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(shared) = taken {
            shared.wake.bump_and_wake();
            tracing::debug!(queue = %self.name, "queue handle closed");
        }
    }

    fn shared(&self) -> Result<Arc<Shared>, QueueError> {
        self.shared
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(QueueError::InvalidHandle("handle is closed"))
    }

    fn send_with(&self, payload: &[u8], priority: u32, wait: Wait) -> Result<(), QueueError> {
        let shared = self.shared()?;
        if !self.mode.can_write() {
            return Err(QueueError::InvalidHandle("handle is not open for writing"));
        }
        let max = self.layout.max_message_size();
        if payload.len() > max {
            return Err(QueueError::MessageTooLarge {
                len: payload.len(),
                max,
            });
        }

        self.run(&shared, wait, Publish::Yes, |region| {
            Ok(region.push(payload, priority)?.then_some(()))
        })?;
        tracing::trace!(queue = %self.name, priority, len = payload.len(), "message sent");
        Ok(())
    }

    fn receive_with(&self, wait: Wait) -> Result<Message, QueueError> {
        let shared = self.shared()?;
        if !self.mode.can_read() {
            return Err(QueueError::InvalidHandle("handle is not open for reading"));
        }

        let message = self.run(&shared, wait, Publish::Yes, |region| region.pop())?;
        tracing::trace!(
            queue = %self.name,
            priority = message.priority,
            len = message.payload.len(),
            "message received"
        );
        Ok(message)
    }

    /// Run `attempt` under both locks until it yields a value.
    ///
    /// `attempt` returns `Ok(None)` when it cannot make progress yet; the
    /// caller then sleeps on the wake word according to `wait`. A successful
    /// mutating attempt publishes its change to every other waiter.
    fn run<T>(
        &self,
        shared: &Shared,
        wait: Wait,
        publish: Publish,
        mut attempt: impl FnMut(&mut Region) -> Result<Option<T>, String>,
    ) -> Result<T, QueueError> {
        loop {
            let observed = {
                let mut region = shared.region.lock().unwrap_or_else(PoisonError::into_inner);
                let _lock = FileLock::exclusive(&shared.file).map_err(|e| {
                    QueueError::from_io("lock", &self.name.to_string(), &shared.path, e)
                })?;
                if region.is_deleted() {
                    return Err(QueueError::NotFound(self.name.to_string()));
                }
                let observed = shared.wake.load();
                // Checked after the load: `close` clears the handle before
                // bumping the word, so a close we miss here still wakes us.
                if self.is_closed() {
                    return Err(QueueError::InvalidHandle("handle is closed"));
                }
                let outcome = attempt(&mut region).map_err(|reason| QueueError::Corrupted {
                    path: shared.path.clone(),
                    reason,
                })?;
                if let Some(value) = outcome {
                    if publish == Publish::Yes {
                        shared.wake.bump_and_wake();
                    }
                    return Ok(value);
                }
                observed
            };

            match wait {
                Wait::Never => return Err(QueueError::WouldBlock),
                Wait::Forever => shared.wake.wait(observed, None),
                Wait::Until(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(QueueError::Timeout);
                    }
                    shared.wake.wait(observed, Some(deadline - now));
                }
            }
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("capacity", &self.layout.capacity())
            .field("max_message_size", &self.layout.max_message_size())
            .field("closed", &self.is_closed())
            .finish()
    }
}
