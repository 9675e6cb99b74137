//! boundq — named, bounded, priority-ordered message queues shared between
//! unrelated processes.
//!
//! A queue is a memory-mapped file in a [`Namespace`] directory. Any process
//! that opens it gets its own [`Handle`]; the queue itself lives until
//! [`Namespace::delete`] removes it.
//!
//! Messages leave in descending priority order, FIFO within a priority.
//! `send` blocks while the queue is full and `receive` blocks while it is
//! empty; `try_*` and `*_timeout` variants return `WouldBlock` / `Timeout`
//! instead.

pub mod asynchronous;
pub mod handle;
pub mod namespace;

mod lock;
mod region;
mod wait;

pub use asynchronous::AsyncHandle;
pub use boundq_core::{ErrorKind, QueueError, QueueName};
pub use handle::{Handle, Message, Mode, QueueAttributes};
pub use namespace::{Namespace, OpenOptions};
