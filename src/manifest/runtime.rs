use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::backend::ApplyBackend;
use crate::logging::Log;
use crate::operations::{FileSystemOps, SystemFileSystemOps};

/// State shared by every manifest created against it.
///
/// Holds the noop flag, the critical section that `execute` and `noop`
/// bodies run in, the apply backend, the logger and the filesystem used for
/// templates.  Manifests running on different runtimes are fully isolated.
///
/// The critical section is reentrant for the thread holding it, so a recipe
/// may execute another manifest of the same runtime.  The nested manifest
/// sees the noop flag of the outer call.
pub struct Runtime {
    noop: AtomicBool,
    section: Mutex<()>,
    holder: Mutex<Option<ThreadId>>,
    backend: Arc<dyn ApplyBackend>,
    log: Arc<dyn Log>,
    fs_ops: Arc<dyn FileSystemOps>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("noop", &self.noop)
            .field("holder", &self.holder)
            .field("backend", &"<dyn ApplyBackend>")
            .field("log", &"<dyn Log>")
            .field("fs_ops", &self.fs_ops)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Create a runtime that applies through `backend` and reads templates
    /// from the real filesystem.
    #[must_use]
    pub fn new(backend: Arc<dyn ApplyBackend>, log: Arc<dyn Log>) -> Self {
        Self {
            noop: AtomicBool::new(false),
            section: Mutex::new(()),
            holder: Mutex::new(None),
            backend,
            log,
            fs_ops: Arc::new(SystemFileSystemOps),
        }
    }

    /// Replace the filesystem used for template reads.
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }

    /// Whether a `noop` call is in progress.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.noop.load(Ordering::SeqCst)
    }

    /// The apply backend.
    #[must_use]
    pub fn backend(&self) -> &dyn ApplyBackend {
        self.backend.as_ref()
    }

    /// The logger.
    #[must_use]
    pub fn log(&self) -> &dyn Log {
        self.log.as_ref()
    }

    /// Filesystem used for template reads.
    #[must_use]
    pub fn fs_ops(&self) -> &dyn FileSystemOps {
        self.fs_ops.as_ref()
    }

    /// Enter the critical section.
    ///
    /// A thread that already holds the section gets a nested guard that
    /// releases nothing when dropped.
    pub(super) fn enter(&self) -> Section<'_> {
        let current = thread::current().id();
        if *self.lock_holder() == Some(current) {
            return Section {
                runtime: self,
                guard: None,
            };
        }
        let guard = self.section.lock().unwrap_or_else(PoisonError::into_inner);
        *self.lock_holder() = Some(current);
        Section {
            runtime: self,
            guard: Some(guard),
        }
    }

    fn lock_holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the noop flag until the returned guard drops.
    pub(super) fn noop_guard(&self) -> NoopGuard<'_> {
        let previous = self.noop.swap(true, Ordering::SeqCst);
        NoopGuard {
            runtime: self,
            previous,
        }
    }
}

/// Holds the runtime's critical section until dropped.
#[derive(Debug)]
pub struct Section<'a> {
    runtime: &'a Runtime,
    guard: Option<MutexGuard<'a, ()>>,
}

impl Section<'_> {
    /// Whether this guard is nested inside an outer one on the same thread.
    #[must_use]
    pub const fn is_nested(&self) -> bool {
        self.guard.is_none()
    }
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        if self.guard.is_some() {
            *self.runtime.lock_holder() = None;
        }
    }
}

/// Restores the noop flag to its previous value when dropped.
#[derive(Debug)]
pub struct NoopGuard<'a> {
    runtime: &'a Runtime,
    previous: bool,
}

impl Drop for NoopGuard<'_> {
    fn drop(&mut self) {
        self.runtime.noop.store(self.previous, Ordering::SeqCst);
    }
}
