//! `exec` provider: shell commands with idempotence guards.
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceDescriptor, ResourceState};
use crate::exec::Executor;
use crate::operations::FileSystemOps;

/// A command run through `sh -c`, guarded by `creates`, `unless` and `onlyif`.
///
/// `command` defaults to the resource name.  `path` replaces `PATH` for the
/// command and its guards; `cwd` sets the working directory.
#[derive(Debug)]
pub struct ExecResource<'a> {
    name: String,
    command: String,
    cwd: PathBuf,
    path: Option<String>,
    creates: Option<PathBuf>,
    unless: Option<String>,
    onlyif: Option<String>,
    executor: &'a dyn Executor,
    fs_ops: &'a dyn FileSystemOps,
}

impl<'a> ExecResource<'a> {
    /// Interpret an `exec` descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidAttribute`] if a known attribute is
    /// not a string.
    pub fn from_descriptor(
        descriptor: &ResourceDescriptor,
        executor: &'a dyn Executor,
        fs_ops: &'a dyn FileSystemOps,
    ) -> Result<Self, ResourceError> {
        let text = |key: &str| string_attribute(descriptor, key);
        Ok(Self {
            name: descriptor.name().to_string(),
            command: text("command")?.unwrap_or_else(|| descriptor.name().to_string()),
            cwd: text("cwd")?.map_or_else(|| PathBuf::from("."), PathBuf::from),
            path: text("path")?,
            creates: text("creates")?.map(PathBuf::from),
            unless: text("unless")?,
            onlyif: text("onlyif")?,
            executor,
            fs_ops,
        })
    }

    fn env(&self) -> Vec<(&str, &str)> {
        self.path
            .as_deref()
            .map(|p| vec![("PATH", p)])
            .unwrap_or_default()
    }

    fn probe(&self, command: &str) -> Result<bool> {
        let result =
            self.executor
                .run_unchecked(&self.cwd, "sh", &["-c", command], &self.env())?;
        Ok(result.success)
    }

    /// Working directory the command runs in.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

/// Read an optional string attribute, rejecting other types.
pub(super) fn string_attribute(
    descriptor: &ResourceDescriptor,
    key: &str,
) -> Result<Option<String>, ResourceError> {
    match descriptor.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ResourceError::InvalidAttribute {
            resource: descriptor.to_string(),
            attribute: key.to_string(),
            reason: format!("expected a string, found {other}"),
        }),
    }
}

impl Resource for ExecResource<'_> {
    fn description(&self) -> String {
        format!("exec[{}]", self.name)
    }

    fn verb(&self) -> &'static str {
        "run"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if let Some(creates) = &self.creates
            && self.fs_ops.exists(creates)
        {
            return Ok(ResourceState::Correct);
        }
        if let Some(unless) = &self.unless
            && self.probe(unless)?
        {
            return Ok(ResourceState::Correct);
        }
        if let Some(onlyif) = &self.onlyif
            && !self.probe(onlyif)?
        {
            return Ok(ResourceState::Correct);
        }
        Ok(ResourceState::Missing)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let result =
            self.executor
                .run_unchecked(&self.cwd, "sh", &["-c", &self.command], &self.env())?;
        if !result.success {
            return Err(ResourceError::ExecutionFailed {
                resource: self.description(),
                exit_code: result.code.unwrap_or(-1),
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::MockFileSystemOps;
    use crate::resources::test_helpers::MockExecutor;
    use crate::resources::{ResourceKind, attributes};
    use serde_json::json;

    fn descriptor(name: &str, attrs: Value) -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(ResourceKind::Exec, name);
        d.merge(attributes(attrs));
        d
    }

    #[test]
    fn command_defaults_to_name() {
        let executor = MockExecutor::with_responses(vec![(true, String::new())]);
        let fs = MockFileSystemOps::new();
        let d = descriptor("echo hi", json!({}));
        let exec = ExecResource::from_descriptor(&d, &executor, &fs).unwrap();
        assert_eq!(exec.description(), "exec[echo hi]");
        assert_eq!(exec.cwd(), Path::new("."));
        exec.apply().unwrap();
        assert_eq!(executor.calls(), ["sh -c echo hi"]);
    }

    #[test]
    fn missing_without_guards() {
        let executor = MockExecutor::default();
        let fs = MockFileSystemOps::new();
        let d = descriptor("migrate", json!({"command": "true"}));
        let exec = ExecResource::from_descriptor(&d, &executor, &fs).unwrap();
        assert_eq!(exec.current_state().unwrap(), ResourceState::Missing);
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn creates_guard_satisfied_by_existing_path() {
        let executor = MockExecutor::default();
        let fs = MockFileSystemOps::new().with_file("/srv/app/.done", "");
        let d = descriptor(
            "bootstrap",
            json!({"command": "make", "creates": "/srv/app/.done"}),
        );
        let exec = ExecResource::from_descriptor(&d, &executor, &fs).unwrap();
        assert_eq!(exec.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn unless_success_means_correct() {
        let executor = MockExecutor::with_responses(vec![(true, String::new())]);
        let fs = MockFileSystemOps::new();
        let d = descriptor("useradd", json!({"unless": "id deploy"}));
        let exec = ExecResource::from_descriptor(&d, &executor, &fs).unwrap();
        assert_eq!(exec.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(executor.calls(), ["sh -c id deploy"]);
    }

    #[test]
    fn onlyif_failure_means_correct() {
        let executor = MockExecutor::with_responses(vec![(false, String::new())]);
        let fs = MockFileSystemOps::new();
        let d = descriptor("reload", json!({"onlyif": "test -f /run/nginx.pid"}));
        let exec = ExecResource::from_descriptor(&d, &executor, &fs).unwrap();
        assert_eq!(exec.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn failing_command_is_an_error() {
        let executor = MockExecutor::with_responses(vec![(false, String::new())]);
        let fs = MockFileSystemOps::new();
        let d = descriptor("broken", json!({"command": "false"}));
        let exec = ExecResource::from_descriptor(&d, &executor, &fs).unwrap();
        let err = exec.apply().unwrap_err();
        assert!(err.to_string().contains("exec[broken]"), "{err}");
    }

    #[test]
    fn non_string_attribute_is_rejected() {
        let executor = MockExecutor::default();
        let fs = MockFileSystemOps::new();
        let d = descriptor("x", json!({"command": 42}));
        let err = ExecResource::from_descriptor(&d, &executor, &fs).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidAttribute { ref attribute, .. } if attribute == "command"));
    }
}
