// crates/motioncap-queue/src/spsc.rs
//
// Bounded single-producer/single-consumer ring buffer. No allocation after
// `channel()`, no CAS, no blocking — enqueue/dequeue are wait-free.
//
// ┌───────────────────────────────────────────────────────────┐
// │ Shared:                                                    │
// │   tail: CachePadded<AtomicUsize>   ← Producer writes       │
// │   head: CachePadded<AtomicUsize>   ← Consumer writes       │
// │   buffer: Box<[UnsafeCell<MaybeUninit<T>>]>                │
// └───────────────────────────────────────────────────────────┘
//
// Head and tail live on separate cache lines (CachePadded) so the producer's
// writes to `tail` and the consumer's writes to `head` never false-share.
// Each side also keeps a locally cached copy of the *other* side's index, and
// only re-reads the shared atomic when its cache says the queue might be
// full (producer) or empty (consumer) — this is what keeps the common case
// off the interconnect.
//
// Memory ordering: a slot write happens-before the `Release` store that
// publishes the new tail/head; the opposite side's `Acquire` load of that
// same index happens-after the write, so reading the slot is safe without
// any per-slot synchronization. This is the only synchronization between
// producer and consumer on buffer contents.
//
// The SPSC contract is enforced at the type level: `Producer<T>` and
// `Consumer<T>` are `Send` but not `Clone`, so at most one thread can ever
// hold each endpoint.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

struct Shared<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    tail: CachePadded<AtomicUsize>,
    head: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // Only elements still in [head, tail) are live; everything else is
        // uninitialized and must not be dropped.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let mut i = head;
        while i != tail {
            unsafe {
                let slot = &mut *self.buffer[i & self.mask].get();
                slot.assume_init_drop();
            }
            i = i.wrapping_add(1);
        }
    }
}

/// Creates a bounded SPSC queue. Capacity is rounded up to the next power of
/// two so index wraparound is a bitmask, not a modulo.
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "capacity must be non-zero");
    let capacity = capacity.next_power_of_two();
    let mask = capacity - 1;

    let mut buf = Vec::with_capacity(capacity);
    for _ in 0..capacity {
        buf.push(UnsafeCell::new(MaybeUninit::uninit()));
    }

    let shared = Arc::new(Shared {
        buffer: buf.into_boxed_slice(),
        mask,
        tail: CachePadded::new(AtomicUsize::new(0)),
        head: CachePadded::new(AtomicUsize::new(0)),
    });

    (
        Producer {
            shared: Arc::clone(&shared),
            local_tail: 0,
            cached_head: 0,
        },
        Consumer {
            shared,
            local_head: 0,
            cached_tail: 0,
        },
    )
}

/// The producer endpoint. Can only push values into the queue.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
    local_tail: usize,
    cached_head: usize,
}

unsafe impl<T: Send> Send for Producer<T> {}

impl<T> Producer<T> {
    /// Enqueues `value`. Returns `false` (and drops `value`'s slot move back
    /// to the caller is not possible by design — see below) iff the queue is
    /// full. Never blocks.
    ///
    /// Returns `Err(value)` on a full queue so the caller keeps ownership —
    /// this matters for the ingest worker, which never drops a buffer on the
    /// floor except via the explicit mismatch-recycle path.
    #[must_use]
    pub fn enqueue(&mut self, value: T) -> Result<(), T> {
        let tail = self.local_tail;

        if tail.wrapping_sub(self.cached_head) > self.shared.mask {
            self.cached_head = self.shared.head.load(Ordering::Acquire);
            if tail.wrapping_sub(self.cached_head) > self.shared.mask {
                return Err(value);
            }
        }

        unsafe {
            let slot = &mut *self.shared.buffer[tail & self.shared.mask].get();
            slot.write(value);
        }

        let new_tail = tail.wrapping_add(1);
        self.shared.tail.store(new_tail, Ordering::Release);
        self.local_tail = new_tail;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }
}

/// The consumer endpoint. Can only pop values from the queue.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
    local_head: usize,
    cached_tail: usize,
}

unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Consumer<T> {
    /// Dequeues the oldest value. Returns `None` iff the queue is empty.
    /// Never blocks.
    pub fn dequeue(&mut self) -> Option<T> {
        let head = self.local_head;

        if head == self.cached_tail {
            self.cached_tail = self.shared.tail.load(Ordering::Acquire);
            if head == self.cached_tail {
                return None;
            }
        }

        let value = unsafe {
            let slot = &mut *self.shared.buffer[head & self.shared.mask].get();
            slot.assume_init_read()
        };

        let new_head = head.wrapping_add(1);
        self.shared.head.store(new_head, Ordering::Release);
        self.local_head = new_head;
        Some(value)
    }

    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }
}

/// Diagnostic-only occupancy snapshot. Not part of the SPSC hot path — both
/// loads are `Acquire` so this never undercounts, but a producer/consumer
/// racing concurrently with this call can make the snapshot stale by the
/// time it's read. Requires both endpoints of the same queue, which callers
/// split across threads (worker holds one, synchronizer the other) — useful
/// from tests that still own both halves, not from running code.
pub fn len<T>(producer: &Producer<T>, consumer: &Consumer<T>) -> usize {
    debug_assert!(Arc::ptr_eq(&producer.shared, &consumer.shared));
    let tail = producer.shared.tail.load(Ordering::Acquire);
    let head = producer.shared.head.load(Ordering::Acquire);
    tail.wrapping_sub(head)
}
