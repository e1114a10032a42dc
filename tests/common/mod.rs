// Shared helpers for integration tests.
//
// Provides a temporary directory for manifest and template files, a log that
// records every message, and a backend that records what it was asked to
// apply, so each test can run manifests end to end without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use marionette::backend::{ApplyBackend, ApplyReport};
use marionette::logging::{Log, RecipeStatus};
use marionette::manifest::Runtime;
use marionette::resources::ResourceDescriptor;

/// A temporary directory holding manifest, configuration and template files.
#[derive(Debug)]
pub struct TestDir {
    dir: tempfile::TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write test file");
        path
    }
}

/// One call to [`RecordingBackend::apply`].
#[derive(Debug, Clone)]
pub struct ApplyCall {
    pub resources: Vec<ResourceDescriptor>,
    pub noop: bool,
}

/// Backend that records its calls and succeeds unless told to fail.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<ApplyCall>>,
    fail: bool,
}

impl RecordingBackend {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ApplyCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ApplyBackend for RecordingBackend {
    fn apply(&self, resources: &[ResourceDescriptor], noop: bool) -> anyhow::Result<ApplyReport> {
        self.calls.lock().unwrap().push(ApplyCall {
            resources: resources.to_vec(),
            noop,
        });
        if self.fail {
            anyhow::bail!("backend refused {} resources", resources.len());
        }
        Ok(ApplyReport {
            changed: u32::try_from(resources.len()).unwrap(),
            ..ApplyReport::new()
        })
    }
}

/// Log that keeps every message and recipe record.
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
    recipes: Mutex<Vec<(String, RecipeStatus)>>,
}

impl RecordingLog {
    fn push(&self, level: &str, msg: &str) {
        self.lines.lock().unwrap().push(format!("{level} {msg}"));
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn recipes(&self) -> Vec<(String, RecipeStatus)> {
        self.recipes.lock().unwrap().clone()
    }
}

impl Log for RecordingLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("noop", msg);
    }
    fn record_recipe(&self, name: &str, status: RecipeStatus, _message: Option<&str>) {
        self.recipes.lock().unwrap().push((name.to_string(), status));
    }
}

/// A runtime over a fresh recording backend and log.
pub struct Harness {
    pub backend: Arc<RecordingBackend>,
    pub log: Arc<RecordingLog>,
    pub runtime: Arc<Runtime>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(RecordingBackend::default())
    }

    pub fn with_backend(backend: RecordingBackend) -> Self {
        let backend = Arc::new(backend);
        let log = Arc::new(RecordingLog::default());
        let runtime = Arc::new(Runtime::new(
            Arc::clone(&backend) as Arc<dyn ApplyBackend>,
            Arc::clone(&log) as Arc<dyn Log>,
        ));
        Self {
            backend,
            log,
            runtime,
        }
    }
}
