//! Runtime capability detection.
//!
//! Parsing, rendering and merging run on tokio's blocking pool. Calling them
//! from outside a tokio runtime is reported as `unsupported-environment`
//! instead of panicking inside `spawn_blocking`.

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::{Error, Result};

/// Capabilities of the current execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// A tokio runtime is reachable from this thread.
    pub runtime: bool,
    /// The runtime is multi-threaded, so blocking jobs run off the caller's worker.
    pub multi_thread: bool,
    /// The pdfium backend was compiled in.
    pub pdfium: bool,
}

impl Capabilities {
    /// Probe the current thread.
    pub fn detect() -> Self {
        let handle = Handle::try_current().ok();
        Self {
            runtime: handle.is_some(),
            multi_thread: handle
                .is_some_and(|h| matches!(h.runtime_flavor(), RuntimeFlavor::MultiThread)),
            pdfium: cfg!(feature = "pdfium"),
        }
    }
}

/// Fail with `unsupported-environment` unless a tokio runtime is available.
pub fn ensure_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| Error::unsupported("tokio runtime"))
}
