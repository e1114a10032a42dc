//! `file` provider: managed file content and presence.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::error::ResourceError;
use super::exec::string_attribute;
use super::{Resource, ResourceChange, ResourceDescriptor, ResourceState};
use crate::operations::FileSystemOps;

/// Whether the file should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensure {
    /// The file exists, with `content` when given.
    Present,
    /// The file does not exist.
    Absent,
}

/// A file on the local host.
///
/// `path` defaults to the resource name.  `ensure` accepts `present`,
/// `file` or `absent`; without `content` a present file is only required to
/// exist.
#[derive(Debug)]
pub struct FileResource<'a> {
    path: PathBuf,
    content: Option<String>,
    ensure: Ensure,
    fs_ops: &'a dyn FileSystemOps,
}

impl<'a> FileResource<'a> {
    /// Interpret a `file` descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidAttribute`] for a non-string
    /// attribute or an unknown `ensure` value.
    pub fn from_descriptor(
        descriptor: &ResourceDescriptor,
        fs_ops: &'a dyn FileSystemOps,
    ) -> Result<Self, ResourceError> {
        let ensure = match string_attribute(descriptor, "ensure")?.as_deref() {
            None | Some("present" | "file") => Ensure::Present,
            Some("absent") => Ensure::Absent,
            Some(other) => {
                return Err(ResourceError::InvalidAttribute {
                    resource: descriptor.to_string(),
                    attribute: "ensure".to_string(),
                    reason: format!("expected present, file or absent, found '{other}'"),
                });
            }
        };
        Ok(Self {
            path: string_attribute(descriptor, "path")?
                .map_or_else(|| PathBuf::from(descriptor.name()), PathBuf::from),
            content: string_attribute(descriptor, "content")?,
            ensure,
            fs_ops,
        })
    }

    /// Desired presence.
    #[must_use]
    pub const fn ensure(&self) -> Ensure {
        self.ensure
    }
}

impl Resource for FileResource<'_> {
    fn description(&self) -> String {
        format!("file[{}]", self.path.display())
    }

    fn verb(&self) -> &'static str {
        match self.ensure {
            Ensure::Present => "write",
            Ensure::Absent => "remove",
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        let exists = self.fs_ops.exists(&self.path);
        match (self.ensure, exists) {
            (Ensure::Absent, false) => Ok(ResourceState::Correct),
            (Ensure::Absent, true) => Ok(ResourceState::Incorrect {
                current: "present".to_string(),
            }),
            (Ensure::Present, false) => Ok(ResourceState::Missing),
            (Ensure::Present, true) => {
                let Some(desired) = &self.content else {
                    return Ok(ResourceState::Correct);
                };
                let current = self
                    .fs_ops
                    .read_to_string(&self.path)
                    .with_context(|| format!("reading {}", self.path.display()))?;
                if &current == desired {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect { current })
                }
            }
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.ensure {
            Ensure::Absent => {
                if !self.fs_ops.exists(&self.path) {
                    return Ok(ResourceChange::AlreadyCorrect);
                }
                self.fs_ops
                    .remove(&self.path)
                    .with_context(|| format!("removing {}", self.path.display()))?;
            }
            Ensure::Present => {
                let content = self.content.as_deref().unwrap_or_default();
                self.fs_ops
                    .write(&self.path, content)
                    .with_context(|| format!("writing {}", self.path.display()))?;
            }
        }
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::MockFileSystemOps;
    use crate::resources::{ResourceKind, attributes};
    use serde_json::{Value, json};
    use std::path::Path;

    fn descriptor(name: &str, attrs: Value) -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(ResourceKind::File, name);
        d.merge(attributes(attrs));
        d
    }

    #[test]
    fn path_defaults_to_name() {
        let fs = MockFileSystemOps::new();
        let d = descriptor("/etc/motd", json!({"content": "hi\n"}));
        let file = FileResource::from_descriptor(&d, &fs).unwrap();
        assert_eq!(file.description(), "file[/etc/motd]");
        assert_eq!(file.ensure(), Ensure::Present);
    }

    #[test]
    fn explicit_path_wins() {
        let fs = MockFileSystemOps::new();
        let d = descriptor("motd", json!({"path": "/etc/motd"}));
        let file = FileResource::from_descriptor(&d, &fs).unwrap();
        assert_eq!(file.description(), "file[/etc/motd]");
    }

    #[test]
    fn missing_file_is_written() {
        let fs = MockFileSystemOps::new();
        let d = descriptor("/etc/motd", json!({"content": "hi\n"}));
        let file = FileResource::from_descriptor(&d, &fs).unwrap();
        assert_eq!(file.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(file.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(fs.content(Path::new("/etc/motd")).as_deref(), Some("hi\n"));
        assert_eq!(file.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn stale_content_is_incorrect() {
        let fs = MockFileSystemOps::new().with_file("/etc/motd", "old");
        let d = descriptor("/etc/motd", json!({"content": "new"}));
        let file = FileResource::from_descriptor(&d, &fs).unwrap();
        assert_eq!(
            file.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "old".to_string()
            }
        );
    }

    #[test]
    fn existing_file_without_content_is_correct() {
        let fs = MockFileSystemOps::new().with_file("/var/log/app.log", "anything");
        let d = descriptor("/var/log/app.log", json!({}));
        let file = FileResource::from_descriptor(&d, &fs).unwrap();
        assert_eq!(file.current_state().unwrap(), ResourceState::Correct);
        assert!(fs.reads().is_empty());
    }

    #[test]
    fn absent_removes_file() {
        let fs = MockFileSystemOps::new().with_file("/tmp/stale", "x");
        let d = descriptor("/tmp/stale", json!({"ensure": "absent"}));
        let file = FileResource::from_descriptor(&d, &fs).unwrap();
        assert!(file.needs_change().unwrap());
        file.apply().unwrap();
        assert!(fs.content(Path::new("/tmp/stale")).is_none());
        assert_eq!(file.apply().unwrap(), ResourceChange::AlreadyCorrect);
    }

    #[test]
    fn unknown_ensure_is_rejected() {
        let fs = MockFileSystemOps::new();
        let d = descriptor("/tmp/x", json!({"ensure": "directory"}));
        let err = FileResource::from_descriptor(&d, &fs).unwrap_err();
        assert!(err.to_string().contains("'directory'"), "{err}");
    }
}
