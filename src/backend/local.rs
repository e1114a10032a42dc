//! Applies `exec` and `file` resources on the local host.
use std::sync::Arc;

use anyhow::{Result, bail};

use super::{ApplyBackend, ApplyReport};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Log;
use crate::operations::{FileSystemOps, SystemFileSystemOps};
use crate::resources::error::ResourceError;
use crate::resources::exec::ExecResource;
use crate::resources::file::FileResource;
use crate::resources::{
    Resource, ResourceChange, ResourceDescriptor, ResourceKind, ResourceState,
};

/// Backend that enacts resources on the machine it runs on.
///
/// Every resource is checked before it is changed.  Kinds without a local
/// provider are reported and counted as skipped.  A failing resource does
/// not stop the run; the failures are reported together at the end.
pub struct LocalBackend {
    executor: Arc<dyn Executor>,
    fs_ops: Arc<dyn FileSystemOps>,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("executor", &self.executor)
            .field("fs_ops", &self.fs_ops)
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl LocalBackend {
    /// Create a backend using the real process executor and filesystem.
    #[must_use]
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self {
            executor: Arc::new(SystemExecutor),
            fs_ops: Arc::new(SystemFileSystemOps),
            log,
        }
    }

    /// Replace the command executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the filesystem implementation.
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }

    fn process(&self, descriptor: &ResourceDescriptor, noop: bool) -> Result<ApplyReport> {
        match descriptor.kind() {
            ResourceKind::Exec => {
                let resource = ExecResource::from_descriptor(
                    descriptor,
                    self.executor.as_ref(),
                    self.fs_ops.as_ref(),
                )?;
                self.process_single(&resource, noop)
            }
            ResourceKind::File => {
                let resource = FileResource::from_descriptor(descriptor, self.fs_ops.as_ref())?;
                self.process_single(&resource, noop)
            }
            other => {
                let reason = ResourceError::UnsupportedKind {
                    kind: other.to_string(),
                };
                self.log.warn(&format!("skipping {descriptor}: {reason}"));
                Ok(ApplyReport {
                    skipped: 1,
                    ..ApplyReport::new()
                })
            }
        }
    }

    /// Check one resource and change it if needed.
    fn process_single<R: Resource>(&self, resource: &R, noop: bool) -> Result<ApplyReport> {
        let desc = resource.description();
        let verb = resource.verb();
        let mut delta = ApplyReport::new();
        match resource.current_state()? {
            ResourceState::Correct => {
                self.log.debug(&format!("ok: {desc}"));
                delta.already_ok += 1;
            }
            ResourceState::Invalid { reason } => {
                self.log.debug(&format!("skipping {desc}: {reason}"));
                delta.skipped += 1;
            }
            ResourceState::Incorrect { .. } if noop => {
                self.log.dry_run(&format!("would {verb} {desc} (content differs)"));
                delta.changed += 1;
            }
            ResourceState::Missing if noop => {
                self.log.dry_run(&format!("would {verb} {desc}"));
                delta.changed += 1;
            }
            ResourceState::Missing | ResourceState::Incorrect { .. } => match resource.apply()? {
                ResourceChange::Applied => {
                    self.log.info(&format!("{verb}: {desc}"));
                    delta.changed += 1;
                }
                ResourceChange::AlreadyCorrect => {
                    self.log.debug(&format!("ok: {desc}"));
                    delta.already_ok += 1;
                }
            },
        }
        Ok(delta)
    }
}

impl ApplyBackend for LocalBackend {
    fn apply(&self, resources: &[ResourceDescriptor], noop: bool) -> Result<ApplyReport> {
        let mut report = ApplyReport::new();
        for descriptor in resources {
            match self.process(descriptor, noop) {
                Ok(delta) => report += delta,
                Err(e) => {
                    self.log.error(&format!("{descriptor}: {e:#}"));
                    report.failed += 1;
                }
            }
        }
        self.log.info(&report.summary(noop));
        if report.failed > 0 {
            bail!(
                "{} of {} resources failed to apply",
                report.failed,
                resources.len()
            );
        }
        Ok(report)
    }
}
