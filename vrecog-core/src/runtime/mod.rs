//! Process-wide runtime state
//!
//! Log verbosity and accelerator initialization are the only global state
//! in the crate. Both live in one [`Runtime`] object behind guarded
//! one-time initialization; every setter is idempotent.

pub mod gpu;
mod logging;

pub use gpu::GpuStatus;
pub use logging::init_logging;

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::OnceLock;

pub struct Runtime {
    log_level: AtomicI32,
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

impl Runtime {
    pub fn global() -> &'static Runtime {
        RUNTIME.get_or_init(|| Runtime {
            log_level: AtomicI32::new(0),
        })
    }

    /// `< 0` warn, `0` info, `1` debug, `>= 2` trace
    pub fn set_log_level(&self, level: i32) {
        self.log_level.store(level, Ordering::Relaxed);
        logging::apply_level(level);
    }

    pub fn log_level(&self) -> i32 {
        self.log_level.load(Ordering::Relaxed)
    }

    pub fn gpu_init(&self) -> GpuStatus {
        gpu::init()
    }

    pub fn gpu_thread_init(&self) -> GpuStatus {
        gpu::thread_init()
    }

    pub fn gpu_status(&self) -> GpuStatus {
        gpu::status()
    }
}

/// Shorthand for `Runtime::global().set_log_level(level)`
pub fn set_log_level(level: i32) {
    Runtime::global().set_log_level(level);
}
