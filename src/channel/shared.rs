//! Shared Buffer
//!
//! A fixed-size block of bytes shared by the producer and the consumer.
//! The first four bytes hold the lock word; the payload follows.
//!
//! ```text
//! ┌───────────┬─────────────────────────────────────────────┐
//! │ lock: u32 │ payload (header + records)                  │
//! └───────────┴─────────────────────────────────────────────┘
//!   0           4                                   capacity
//! ```
//!
//! Acquire is a compare-and-swap of the lock word from 0 to 1; release
//! stores 0 and wakes parked waiters. A bounded acquire spins briefly,
//! then registers as a waiter and parks on a condition variable until
//! woken or out of time.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{SimError, SimResult};

/// Bytes reserved for the lock word.
pub const LOCK_BYTES: usize = 4;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// Spins before the bounded acquire parks.
const SPINS_BEFORE_PARK: u32 = 64;

#[derive(Debug)]
struct Inner {
    lock: AtomicU32,
    waiters: AtomicU32,
    gate: Mutex<()>,
    wake: Condvar,
    bytes: Box<[AtomicU8]>,
}

impl Inner {
    fn acquire(&self) -> bool {
        self.lock
            .compare_exchange(UNLOCKED, LOCKED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn release(&self) {
        self.lock.store(UNLOCKED, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            // Taking the gate orders this wake after the waiter's last check
            let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            self.wake.notify_all();
        }
    }
}

/// Cloneable handle to a lock-guarded byte block.
#[derive(Clone, Debug)]
pub struct SharedBuffer {
    inner: Arc<Inner>,
}

impl SharedBuffer {
    /// Allocate a block of `capacity` bytes including the lock word.
    pub fn new(capacity: usize) -> Self {
        let payload = capacity.saturating_sub(LOCK_BYTES);
        let bytes = (0..payload).map(|_| AtomicU8::new(0)).collect();
        Self {
            inner: Arc::new(Inner {
                lock: AtomicU32::new(UNLOCKED),
                waiters: AtomicU32::new(0),
                gate: Mutex::new(()),
                wake: Condvar::new(),
                bytes,
            }),
        }
    }

    /// Total size including the lock word.
    pub fn capacity(&self) -> usize {
        self.inner.bytes.len() + LOCK_BYTES
    }

    /// Payload size.
    pub fn payload_capacity(&self) -> usize {
        self.inner.bytes.len()
    }

    /// True while either side holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.lock.load(Ordering::Acquire) == LOCKED
    }

    /// Take the lock if it is free.
    pub fn try_lock(&self) -> Option<LockGuard<'_>> {
        self.inner
            .acquire()
            .then(|| LockGuard { inner: &self.inner })
    }

    /// Wait for the lock for at most `timeout`.
    pub fn lock_timeout(&self, timeout: Duration) -> SimResult<LockGuard<'_>> {
        let deadline = Instant::now() + timeout;
        for _ in 0..SPINS_BEFORE_PARK {
            if let Some(guard) = self.try_lock() {
                return Ok(guard);
            }
            std::hint::spin_loop();
        }

        let inner = &*self.inner;
        inner.waiters.fetch_add(1, Ordering::SeqCst);
        let mut gate = inner.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let acquired = loop {
            if inner.acquire() {
                break true;
            }
            let now = Instant::now();
            if now >= deadline {
                break false;
            }
            gate = inner
                .wake
                .wait_timeout(gate, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };
        drop(gate);
        inner.waiters.fetch_sub(1, Ordering::SeqCst);

        if acquired {
            Ok(LockGuard { inner })
        } else {
            Err(SimError::ChannelContended)
        }
    }
}

/// Exclusive access to the payload; releases the lock on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    inner: &'a Inner,
}

impl LockGuard<'_> {
    /// Copy `data` into the payload at `offset`.
    pub fn write(&self, offset: usize, data: &[u8]) -> SimResult<()> {
        let capacity = self.inner.bytes.len();
        let end = offset.saturating_add(data.len());
        if end > capacity {
            return Err(SimError::FrameOverflow { needed: end, capacity });
        }
        for (slot, byte) in self.inner.bytes[offset..end].iter().zip(data) {
            slot.store(*byte, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy `len` payload bytes starting at `offset` (clamped to the end).
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        let capacity = self.inner.bytes.len();
        let start = offset.min(capacity);
        let end = offset.saturating_add(len).min(capacity);
        self.inner.bytes[start..end]
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.inner.release();
    }
}
