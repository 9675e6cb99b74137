//! A mapped backing store and the queue operations performed on it.
//!
//! Everything here assumes the caller holds the store's exclusive lock.
//! Slices handed out never cover the wake word, which other threads and
//! processes touch concurrently through atomics.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::ptr::NonNull;

use bytes::Bytes;
use memmap2::MmapMut;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use boundq_core::layout::{
    Layout, MessageHeader, QueueHeader, FLAG_DELETED, HEADER_SIZE, ORDER_OFFSET, WAKE_OFFSET,
};
use boundq_core::{QueueError, QueueName};

use crate::handle::{Message, QueueAttributes};
use crate::wait::WakeWord;

const MESSAGE_HEADER_SIZE: usize = std::mem::size_of::<MessageHeader>();

pub(crate) struct Region {
    // Kept alive for `base`; never dereferenced directly.
    _map: MmapMut,
    base: NonNull<u8>,
    layout: Layout,
}

// `base` points into `_map`, which is Send.
unsafe impl Send for Region {}

impl Region {
    /// Reserve `file` for `layout`, map it, and write an empty queue into it.
    ///
    /// Blocks are allocated up front so a full filesystem fails here with
    /// `ENOSPC` instead of faulting on first touch of the mapping.
    pub(crate) fn initialize(file: &File, layout: Layout) -> io::Result<Self> {
        reserve(file, layout.total_size())?;
        let map = unsafe { MmapMut::map_mut(file)? };
        let mut region = Self::from_map(map, layout);
        region.format();
        Ok(region)
    }

    /// Map an existing store after validating its header and size.
    pub(crate) fn attach(file: &File, name: &QueueName, path: &Path) -> Result<Self, QueueError> {
        let subject = name.to_string();
        let corrupted = |reason: String| QueueError::Corrupted {
            path: path.to_path_buf(),
            reason,
        };

        let file_len = file
            .metadata()
            .map_err(|e| QueueError::from_io("stat", &subject, path, e))?
            .len() as usize;
        if file_len < HEADER_SIZE {
            return Err(corrupted(format!("store is truncated to {file_len} bytes")));
        }

        let mut raw = [0u8; HEADER_SIZE];
        file.read_exact_at(&mut raw, 0)
            .map_err(|e| QueueError::from_io("read header of", &subject, path, e))?;
        let header = QueueHeader::read_from(&raw[..]).unwrap_or_else(QueueHeader::new_zeroed);
        let layout = header.check().map_err(corrupted)?;
        if file_len < layout.total_size() {
            return Err(corrupted(format!(
                "store is {file_len} bytes, layout needs {}",
                layout.total_size()
            )));
        }

        let map = unsafe { MmapMut::map_mut(file) }
            .map_err(|e| QueueError::from_io("map", &subject, path, e))?;
        Ok(Self::from_map(map, layout))
    }

    #[cfg(test)]
    pub(crate) fn anonymous(layout: Layout) -> Self {
        let map = MmapMut::map_anon(layout.total_size()).expect("anonymous mapping");
        let mut region = Self::from_map(map, layout);
        region.format();
        region
    }

    fn from_map(mut map: MmapMut, layout: Layout) -> Self {
        debug_assert!(map.len() >= layout.total_size());
        let base = NonNull::new(map.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self {
            _map: map,
            base,
            layout,
        }
    }

    fn format(&mut self) {
        let header = QueueHeader::new(
            self.layout.capacity() as u32,
            self.layout.max_message_size() as u32,
        );
        self.set_header(&header);
        for (i, slot) in self.order_mut().iter_mut().enumerate() {
            *slot = i as u32;
        }
    }

    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }

    /// The wake word of this store. Copies stay valid while `self` is alive.
    pub(crate) fn wake_word(&self) -> WakeWord {
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(WAKE_OFFSET)) };
        unsafe { WakeWord::new(ptr) }
    }

    // ── Raw access ────────────────────────────────────────────────────────────

    fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset + len <= self.layout.total_size());
        unsafe { std::slice::from_raw_parts(self.base.as_ptr().add(offset), len) }
    }

    fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset + len <= self.layout.total_size());
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().add(offset), len) }
    }

    fn order(&self) -> &[u32] {
        let ptr = unsafe { self.base.as_ptr().add(ORDER_OFFSET) } as *const u32;
        unsafe { std::slice::from_raw_parts(ptr, self.layout.capacity()) }
    }

    fn order_mut(&mut self) -> &mut [u32] {
        let ptr = unsafe { self.base.as_ptr().add(ORDER_OFFSET) } as *mut u32;
        unsafe { std::slice::from_raw_parts_mut(ptr, self.layout.capacity()) }
    }

    pub(crate) fn header(&self) -> QueueHeader {
        QueueHeader::read_from(self.bytes(0, HEADER_SIZE)).unwrap_or_else(QueueHeader::new_zeroed)
    }

    fn set_header(&mut self, header: &QueueHeader) {
        self.bytes_mut(0, HEADER_SIZE).copy_from_slice(header.as_bytes());
    }

    /// Offset of `slot`, or a corruption reason if the order table points
    /// outside the store.
    fn slot_offset(&self, slot: u32) -> Result<usize, String> {
        let slot = slot as usize;
        if slot >= self.layout.capacity() {
            return Err(format!("order table references slot {slot}"));
        }
        Ok(self.layout.slot_offset(slot))
    }

    fn slot_header(&self, slot: u32) -> Result<MessageHeader, String> {
        let offset = self.slot_offset(slot)?;
        Ok(MessageHeader::read_from(self.bytes(offset, MESSAGE_HEADER_SIZE))
            .unwrap_or_else(MessageHeader::new_zeroed))
    }

    // ── Queue operations ──────────────────────────────────────────────────────

    pub(crate) fn attributes(&self) -> QueueAttributes {
        let header = self.header();
        QueueAttributes {
            capacity: header.capacity as usize,
            max_message_size: header.max_message_size as usize,
            len: header.len as usize,
            total_sent: header.total_sent,
            total_received: header.total_received,
        }
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.header().is_deleted()
    }

    pub(crate) fn mark_deleted(&mut self) {
        let mut header = self.header();
        header.flags |= FLAG_DELETED;
        self.set_header(&header);
    }

    /// Enqueue behind every message of equal or higher priority.
    ///
    /// Returns `Ok(false)` without touching the store when it is full.
    /// The caller has already checked `payload` against the max size.
    pub(crate) fn push(&mut self, payload: &[u8], priority: u32) -> Result<bool, String> {
        debug_assert!(payload.len() <= self.layout.max_message_size());
        let mut header = self.header();
        let len = header.len as usize;
        if len >= self.layout.capacity() {
            return Ok(false);
        }

        let mut priorities = Vec::with_capacity(len);
        for &slot in &self.order()[..len] {
            priorities.push(self.slot_header(slot)?.priority);
        }
        let pos = priorities.partition_point(|&p| p >= priority);

        let slot = self.order()[len];
        let offset = self.slot_offset(slot)?;
        let message_header = MessageHeader {
            priority,
            length: payload.len() as u32,
        };
        let dst = self.bytes_mut(offset, MESSAGE_HEADER_SIZE + payload.len());
        dst[..MESSAGE_HEADER_SIZE].copy_from_slice(message_header.as_bytes());
        dst[MESSAGE_HEADER_SIZE..].copy_from_slice(payload);

        let order = self.order_mut();
        order.copy_within(pos..len, pos + 1);
        order[pos] = slot;

        header.len += 1;
        header.total_sent += 1;
        self.set_header(&header);
        Ok(true)
    }

    /// Dequeue the highest-priority, earliest-inserted message.
    pub(crate) fn pop(&mut self) -> Result<Option<Message>, String> {
        let mut header = self.header();
        let len = header.len as usize;
        if len == 0 {
            return Ok(None);
        }

        let slot = self.order()[0];
        let offset = self.slot_offset(slot)?;
        let message_header = self.slot_header(slot)?;
        let length = message_header.length as usize;
        if length > self.layout.max_message_size() {
            return Err(format!("slot {slot} holds {length} bytes"));
        }
        let payload = Bytes::copy_from_slice(self.bytes(offset + MESSAGE_HEADER_SIZE, length));

        let order = self.order_mut();
        order.copy_within(1..len, 0);
        order[len - 1] = slot;

        header.len -= 1;
        header.total_received += 1;
        self.set_header(&header);
        Ok(Some(Message {
            payload,
            priority: message_header.priority,
        }))
    }
}

#[cfg(target_os = "linux")]
fn reserve(file: &File, len: usize) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let len = libc::off_t::try_from(len).map_err(|_| io::Error::from_raw_os_error(libc::EFBIG))?;
    loop {
        // Returns the error number instead of setting errno.
        let rc = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
        match rc {
            0 => return Ok(()),
            libc::EINTR => continue,
            // Filesystem cannot preallocate; fall back to a sparse file.
            libc::EOPNOTSUPP | libc::EINVAL => return file.set_len(len as u64),
            errno => return Err(io::Error::from_raw_os_error(errno)),
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn reserve(file: &File, len: usize) -> io::Result<()> {
    file.set_len(len as u64)
}
