//! Cooperative cancellation for long-running operations.
//!
//! # Example
//!
//! ```
//! use morsel_uv::algo::cancel::Cancellation;
//!
//! let token = Cancellation::new();
//! let worker_view = token.clone();
//! assert!(!worker_view.is_cancelled());
//!
//! token.cancel();
//! assert!(worker_view.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MeshError, Result};

/// A cancellation signal polled by algorithms at batch boundaries.
///
/// Clones share the same flag. A token built with [`Cancellation::from_fn`]
/// asks a callback instead, which lets callers wire in their own
/// cancellation source.
#[derive(Clone)]
pub struct Cancellation {
    source: Source,
}

#[derive(Clone)]
enum Source {
    Flag(Arc<AtomicBool>),
    Callback(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Cancellation {
    /// A token that starts out not cancelled.
    pub fn new() -> Self {
        Self {
            source: Source::Flag(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A token that reports whatever `callback` returns.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            source: Source::Callback(Arc::new(callback)),
        }
    }

    /// Request cancellation. Has no effect on callback tokens.
    pub fn cancel(&self) {
        if let Source::Flag(flag) = &self.source {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        match &self.source {
            Source::Flag(flag) => flag.load(Ordering::Relaxed),
            Source::Callback(callback) => callback(),
        }
    }

    /// `Err(MeshError::Cancelled)` once cancellation has been requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MeshError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
