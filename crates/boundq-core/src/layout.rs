//! boundq on-host layout — the byte format of a queue's backing store.
//!
//! These types ARE the storage format. Every process that opens a queue maps
//! the same file and interprets it through these definitions, so changing a
//! field or an offset here is a breaking change for any queue already on
//! disk. Bump `LAYOUT_VERSION` if you do.
//!
//! A backing store is laid out as:
//!
//!   QueueHeader        48 bytes
//!   wake word           8 bytes  (u32 futex word + padding)
//!   order      capacity x u32    slot permutation, see below
//!   slots      capacity x stride MessageHeader + payload, padded to 8
//!
//! The first `len` entries of `order` are the occupied slots in dequeue
//! order (descending priority, FIFO within a priority). The remaining
//! entries are the free slots.
//!
//! Headers are host-endian; a store never leaves the machine that made it.
//! There is no unsafe code in this module.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::error::QueueError;

// ── Queue Header ──────────────────────────────────────────────────────────────

/// Fixed header at offset 0 of every backing store.
///
/// Mutated only while holding the store's exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct QueueHeader {
    /// Always [`MAGIC`]. Anything else is not a boundq store.
    pub magic: [u8; 8],

    /// Layout version. Currently [`LAYOUT_VERSION`].
    pub version: u32,

    /// Bit flags:
    ///   bit 0: queue has been deleted ([`FLAG_DELETED`])
    ///   bits 1-31: reserved, must be zero
    pub flags: u32,

    /// Maximum number of messages held at once. Fixed at creation.
    pub capacity: u32,

    /// Maximum payload length in bytes. Fixed at creation.
    pub max_message_size: u32,

    /// Number of messages currently queued.
    pub len: u32,

    /// Reserved, must be zero.
    pub reserved: u32,

    /// Messages accepted since creation.
    pub total_sent: u64,

    /// Messages delivered since creation.
    pub total_received: u64,
}

assert_eq_size!(QueueHeader, [u8; 48]);

impl QueueHeader {
    pub fn new(capacity: u32, max_message_size: u32) -> Self {
        Self {
            magic: MAGIC,
            version: LAYOUT_VERSION,
            flags: 0,
            capacity,
            max_message_size,
            len: 0,
            reserved: 0,
            total_sent: 0,
            total_received: 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    /// Check a header read back from a store.
    ///
    /// Returns a human-readable reason on failure; the caller attaches the
    /// path when turning it into [`QueueError::Corrupted`].
    pub fn check(&self) -> Result<Layout, String> {
        if self.magic != MAGIC {
            return Err("bad magic".into());
        }
        if self.version != LAYOUT_VERSION {
            return Err(format!("unknown layout version {}", self.version));
        }
        if self.flags & !FLAG_DELETED != 0 {
            return Err(format!("reserved flags are set: 0x{:08x}", self.flags));
        }
        let layout = Layout::new(self.capacity as usize, self.max_message_size as usize)
            .map_err(|e| e.to_string())?;
        if self.len > self.capacity {
            return Err(format!(
                "occupancy {} exceeds capacity {}",
                self.len, self.capacity
            ));
        }
        Ok(layout)
    }
}

// ── Message Header ────────────────────────────────────────────────────────────

/// Stored in front of every payload slot.
///
/// Size: 8 bytes. The payload follows immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MessageHeader {
    /// Higher is more urgent.
    pub priority: u32,

    /// Payload length in bytes. Never exceeds the queue's max message size.
    pub length: u32,
}

assert_eq_size!(MessageHeader, [u8; 8]);

// ── Constants ─────────────────────────────────────────────────────────────────

pub const MAGIC: [u8; 8] = *b"BOUNDQ\0\x01";

pub const LAYOUT_VERSION: u32 = 1;

pub const FLAG_DELETED: u32 = 0x1;

/// Largest capacity a queue may be created with.
pub const MAX_CAPACITY: usize = 65_536;

/// Largest max message size a queue may be created with (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Largest backing store a queue may need (1 GiB).
pub const MAX_STORE_SIZE: usize = 1 << 30;

pub const HEADER_SIZE: usize = std::mem::size_of::<QueueHeader>();

pub const WAKE_OFFSET: usize = HEADER_SIZE;

pub const WAKE_SIZE: usize = 8;

pub const ORDER_OFFSET: usize = WAKE_OFFSET + WAKE_SIZE;

const SLOT_ALIGN: usize = 8;

// ── Layout ────────────────────────────────────────────────────────────────────

/// Byte offsets of each region for a given capacity and max message size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    capacity: usize,
    max_message_size: usize,
}

impl Layout {
    /// Validate queue attributes and compute their layout.
    pub fn new(capacity: usize, max_message_size: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidConfig("capacity must be positive".into()));
        }
        if capacity > MAX_CAPACITY {
            return Err(QueueError::InvalidConfig(format!(
                "capacity {capacity} exceeds limit {MAX_CAPACITY}"
            )));
        }
        if max_message_size == 0 {
            return Err(QueueError::InvalidConfig(
                "max message size must be positive".into(),
            ));
        }
        if max_message_size > MAX_MESSAGE_SIZE {
            return Err(QueueError::InvalidConfig(format!(
                "max message size {max_message_size} exceeds limit {MAX_MESSAGE_SIZE}"
            )));
        }
        let layout = Self {
            capacity,
            max_message_size,
        };
        if layout.total_size() > MAX_STORE_SIZE {
            return Err(QueueError::InvalidConfig(format!(
                "capacity {capacity} x max message size {max_message_size} needs {} bytes, limit is {MAX_STORE_SIZE}",
                layout.total_size()
            )));
        }
        Ok(layout)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn order_len(&self) -> usize {
        self.capacity * std::mem::size_of::<u32>()
    }

    pub fn slots_offset(&self) -> usize {
        align_up(ORDER_OFFSET + self.order_len(), SLOT_ALIGN)
    }

    /// Distance between consecutive slots.
    pub fn slot_stride(&self) -> usize {
        std::mem::size_of::<MessageHeader>() + align_up(self.max_message_size, SLOT_ALIGN)
    }

    pub fn slot_offset(&self, slot: usize) -> usize {
        debug_assert!(slot < self.capacity);
        self.slots_offset() + slot * self.slot_stride()
    }

    pub fn total_size(&self) -> usize {
        self.slots_offset() + self.capacity * self.slot_stride()
    }
}

fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
