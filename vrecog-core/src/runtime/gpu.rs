//! Accelerator initialization
//!
//! Two phases: one global `init()` on the main thread before any decoding,
//! then `thread_init()` once on every other thread that decodes. Both are
//! idempotent and are no-ops when the crate is built without the `gpu`
//! feature.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuStatus {
    /// No accelerator configured
    Disabled,
    /// Global init done; `thread_ready` reports the calling thread
    Ready { device: u32, thread_ready: bool },
}

static GLOBAL_INIT: Once = Once::new();
static GLOBAL_READY: AtomicBool = AtomicBool::new(false);

thread_local! {
    static THREAD_READY: Cell<bool> = const { Cell::new(false) };
}

const DEVICE: u32 = 0;

fn enabled() -> bool {
    cfg!(feature = "gpu")
}

pub(crate) fn init() -> GpuStatus {
    if !enabled() {
        tracing::debug!("GPU init requested, accelerator support not built in");
        return GpuStatus::Disabled;
    }

    GLOBAL_INIT.call_once(|| {
        tracing::info!("GPU initialized (device {})", DEVICE);
        GLOBAL_READY.store(true, Ordering::Release);
    });
    // The initializing thread is ready as well
    THREAD_READY.with(|ready| ready.set(true));
    status()
}

pub(crate) fn thread_init() -> GpuStatus {
    if !enabled() {
        return GpuStatus::Disabled;
    }
    if !GLOBAL_READY.load(Ordering::Acquire) {
        tracing::warn!("Per-thread GPU init before global init, ignored");
        return status();
    }

    THREAD_READY.with(|ready| {
        if !ready.replace(true) {
            tracing::debug!("GPU thread init on {:?}", std::thread::current().id());
        }
    });
    status()
}

pub(crate) fn status() -> GpuStatus {
    if !enabled() || !GLOBAL_READY.load(Ordering::Acquire) {
        return GpuStatus::Disabled;
    }
    GpuStatus::Ready {
        device: DEVICE,
        thread_ready: THREAD_READY.with(Cell::get),
    }
}

/// Sessions decode on CPU either way; this only flags a missed init call
pub(crate) fn warn_if_thread_uninitialized() {
    if let GpuStatus::Ready {
        thread_ready: false, ..
    } = status()
    {
        tracing::warn!(
            "Session created on {:?} without per-thread GPU init",
            std::thread::current().id()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_disabled_without_feature() {
        assert_eq!(init(), GpuStatus::Disabled);
        assert_eq!(thread_init(), GpuStatus::Disabled);
        assert_eq!(status(), GpuStatus::Disabled);
    }

    #[cfg(feature = "gpu")]
    #[test]
    fn test_two_phase_init() {
        assert!(matches!(init(), GpuStatus::Ready { thread_ready: true, .. }));
        assert!(matches!(init(), GpuStatus::Ready { .. }));

        std::thread::spawn(|| {
            assert!(matches!(status(), GpuStatus::Ready { thread_ready: false, .. }));
            assert!(matches!(thread_init(), GpuStatus::Ready { thread_ready: true, .. }));
        })
        .join()
        .unwrap();
    }
}
