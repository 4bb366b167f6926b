// crates/motioncap-host/src/affinity.rs
//
// CPU pinning is an advisory scheduling hint, not a correctness requirement
// (see SPEC_FULL.md §4.B): a failure here is logged at WARN and otherwise
// ignored.

use log::warn;

/// Pins the calling thread to `index mod (available cores)`. Degrades to a
/// no-op with a WARN log if affinity information isn't available on this
/// platform, or the pin call itself fails.
pub fn pin_current_thread(index: usize) {
    match core_affinity::get_core_ids() {
        Some(ids) if !ids.is_empty() => {
            let core = ids[index % ids.len()];
            if !core_affinity::set_for_current(core) {
                warn!("failed to pin current thread to core {core:?}; continuing unpinned");
            }
        }
        _ => {
            warn!("CPU affinity unavailable on this platform; continuing unpinned");
        }
    }
}

/// Number of cores the scheduler considers available, falling back to 1
/// rather than panicking if detection fails.
pub fn available_cores() -> usize {
    num_cpus::get().max(1)
}
