//! Wake word — the blocking primitive shared by every process mapping a queue.
//!
//! The word is a sequence number inside the mapped store. Every mutation
//! bumps it and wakes all sleepers. A sleeper records the value it saw while
//! holding the store lock, drops the lock, then sleeps only if the word still
//! holds that value. A change that lands between the unlock and the sleep
//! makes the sleep return immediately, so no wakeup is lost.
//!
//! On Linux this is a shared (non-private) futex on the file mapping.
//! Elsewhere sleepers fall back to re-checking on a short interval.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Clone, Copy)]
pub(crate) struct WakeWord {
    word: NonNull<AtomicU32>,
}

// The word lives in a MAP_SHARED mapping and is only touched atomically.
unsafe impl Send for WakeWord {}
unsafe impl Sync for WakeWord {}

impl WakeWord {
    /// # Safety
    /// `ptr` must be 4-byte aligned and point into a shared mapping that
    /// outlives every copy of the returned value.
    pub(crate) unsafe fn new(ptr: NonNull<u8>) -> Self {
        debug_assert_eq!(ptr.as_ptr() as usize % std::mem::align_of::<AtomicU32>(), 0);
        Self { word: ptr.cast() }
    }

    fn atomic(&self) -> &AtomicU32 {
        unsafe { self.word.as_ref() }
    }

    pub(crate) fn load(&self) -> u32 {
        self.atomic().load(Ordering::Acquire)
    }

    /// Publish a state change to every sleeper in every process.
    pub(crate) fn bump_and_wake(&self) {
        self.atomic().fetch_add(1, Ordering::Release);
        wake_all(self.atomic());
    }

    /// Sleep until the word moves past `observed`, `timeout` elapses, or a
    /// spurious wakeup. Callers must re-check their condition either way.
    pub(crate) fn wait(&self, observed: u32, timeout: Option<Duration>) {
        if self.load() != observed {
            return;
        }
        sleep_while_equal(self.atomic(), observed, timeout);
    }
}

#[cfg(target_os = "linux")]
fn sleep_while_equal(word: &AtomicU32, observed: u32, timeout: Option<Duration>) {
    let ts = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(std::ptr::null(), |t| t as *const libc::timespec);
    // EAGAIN, EINTR and ETIMEDOUT all mean "go look again".
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32,
            libc::FUTEX_WAIT,
            observed,
            ts_ptr,
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

#[cfg(target_os = "linux")]
fn wake_all(word: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32,
            libc::FUTEX_WAKE,
            i32::MAX,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

#[cfg(not(target_os = "linux"))]
const POLL_INTERVAL: Duration = Duration::from_millis(2);

#[cfg(not(target_os = "linux"))]
fn sleep_while_equal(word: &AtomicU32, observed: u32, timeout: Option<Duration>) {
    let step = timeout.map_or(POLL_INTERVAL, |t| t.min(POLL_INTERVAL));
    if word.load(Ordering::Acquire) == observed {
        std::thread::sleep(step);
    }
}

#[cfg(not(target_os = "linux"))]
fn wake_all(_word: &AtomicU32) {}
