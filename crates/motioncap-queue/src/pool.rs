// crates/motioncap-queue/src/pool.rs
//
// Per-camera buffer pool: a fixed set of K pre-allocated TimestampedFrame
// slots, conserved across two SPSC queues. `empty_q` starts primed with all
// K slots; `filled_q` starts empty. A buffer is, at every instant, owned by
// exactly one of: empty_q, filled_q, the ingest worker, or the synchronizer —
// see pool conservation in SPEC_FULL.md §8.

use motioncap_core::TimestampedFrame;

use crate::spsc::{self, Consumer, Producer};

/// The four queue endpoints for one camera's pool, ready to be handed to an
/// ingest worker (`filled_producer` + `empty_consumer`) and the synchronizer
/// (`filled_consumer` + `empty_producer`).
pub struct PoolHandles {
    pub filled_producer: Producer<TimestampedFrame>,
    pub filled_consumer: Consumer<TimestampedFrame>,
    pub empty_producer: Producer<TimestampedFrame>,
    pub empty_consumer: Consumer<TimestampedFrame>,
}

/// Allocates the K-slot backing store for one camera and wires it into a
/// fresh empty/filled queue pair, with `empty_q` primed full.
///
/// `capacity` is rounded up to a power of two by the underlying ring (see
/// `spsc::channel`); callers that need the pool-conservation invariant to
/// hold over a known K should pass a power-of-two capacity directly.
pub fn build_pool(capacity: usize, width: u32, height: u32) -> PoolHandles {
    let (filled_producer, filled_consumer) = spsc::channel::<TimestampedFrame>(capacity);
    let (mut empty_producer, empty_consumer) = spsc::channel::<TimestampedFrame>(capacity);

    for _ in 0..capacity {
        // Capacity was just chosen for this exact queue; priming it full can
        // never fail.
        empty_producer
            .enqueue(TimestampedFrame::new(width, height))
            .unwrap_or_else(|_| unreachable!("priming a freshly built empty queue cannot fail"));
    }

    PoolHandles {
        filled_producer,
        filled_consumer,
        empty_producer,
        empty_consumer,
    }
}
