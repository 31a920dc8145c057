use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::KernelError;
use crate::kernel::{DisabledLoader, DistanceKernel, KernelLoader, NativeLoader};

/// Lazily loads an accelerated distance kernel, at most once.
///
/// The first call to [`AccelerationProvider::maybe_accelerate`] runs the
/// loader. Callers arriving while that attempt is in flight block on it and
/// share its outcome, so exactly one load happens per provider. Failure is
/// remembered too: a provider that failed to load never retries.
///
/// The loaded kernel is shared read-only by every caller.
pub struct AccelerationProvider {
    loader: Box<dyn KernelLoader>,
    kernel: OnceCell<Option<Arc<dyn DistanceKernel>>>,
    attempts: AtomicUsize,
}

impl AccelerationProvider {
    pub fn new(loader: Box<dyn KernelLoader>) -> Self {
        Self {
            loader,
            kernel: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Provider backed by [`NativeLoader`].
    pub fn native() -> Self {
        Self::new(Box::new(NativeLoader))
    }

    /// Provider that always falls back to the scalar path.
    pub fn disabled() -> Self {
        Self::new(Box::new(DisabledLoader))
    }

    /// Provider for the given config switch.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::native()
        } else {
            Self::disabled()
        }
    }

    /// Returns the accelerated kernel, loading it on first use.
    /// Returns `None` when no kernel could be loaded.
    pub fn maybe_accelerate(&self) -> Option<Arc<dyn DistanceKernel>> {
        self.kernel
            .get_or_init(|| {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                match self.loader.load() {
                    Ok(k) => {
                        info!(kernel = k.name(), "bitindex: accelerated kernel loaded");
                        Some(k)
                    }
                    Err(KernelError::Disabled) => {
                        debug!("bitindex: acceleration disabled, using scalar kernel");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "bitindex: acceleration unavailable, using scalar kernel");
                        None
                    }
                }
            })
            .clone()
    }

    /// Name of the kernel queries run on. Triggers the load if needed.
    pub fn kernel_name(&self) -> &'static str {
        self.maybe_accelerate().map(|k| k.name()).unwrap_or("scalar")
    }

    /// Returns true once a load attempt has completed.
    pub fn is_resolved(&self) -> bool {
        self.kernel.get().is_some()
    }

    /// Number of times the loader has run. Never exceeds 1.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for AccelerationProvider {
    fn default() -> Self {
        Self::native()
    }
}
