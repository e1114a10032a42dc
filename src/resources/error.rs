//! Typed error variants for resource providers.
//!
//! This module provides [`ResourceError`], a structured error type for
//! turning descriptors into local providers.  Callers convert to
//! [`anyhow::Error`] via `?`.

use thiserror::Error;

/// Errors that arise while interpreting a resource descriptor.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// An attribute has the wrong type or an unsupported value.
    #[error("invalid attribute '{attribute}' on {resource}: {reason}")]
    InvalidAttribute {
        /// Resource, formatted as `kind[name]`.
        resource: String,
        /// Attribute name.
        attribute: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command for {resource} failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Resource, formatted as `kind[name]`.
        resource: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// No local provider handles this kind of resource.
    #[error("no local provider for {kind} resources")]
    UnsupportedKind {
        /// Resource kind tag.
        kind: String,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn invalid_attribute_display() {
        let e = ResourceError::InvalidAttribute {
            resource: "file[/etc/motd]".to_string(),
            attribute: "ensure".to_string(),
            reason: "expected present or absent".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "invalid attribute 'ensure' on file[/etc/motd]: expected present or absent"
        );
    }

    #[test]
    fn execution_failed_display() {
        let e = ResourceError::ExecutionFailed {
            resource: "exec[migrate]".to_string(),
            exit_code: 2,
            stderr: "no such table".to_string(),
        };
        assert!(e.to_string().contains("exec[migrate]"));
        assert!(e.to_string().contains("exit 2"));
        assert!(e.to_string().contains("no such table"));
    }

    #[test]
    fn unsupported_kind_display() {
        let e = ResourceError::UnsupportedKind {
            kind: "mount".to_string(),
        };
        assert_eq!(e.to_string(), "no local provider for mount resources");
    }

    #[test]
    fn resource_error_converts_to_anyhow() {
        let e = ResourceError::UnsupportedKind {
            kind: "cron".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
