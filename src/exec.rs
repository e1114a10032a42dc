//! Command execution behind the [`Executor`] seam.
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, when the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external commands on behalf of resource providers.
///
/// Production code uses [`SystemExecutor`]; unit tests substitute a mock so
/// no real process is spawned.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` in `dir` with extra environment variables and return the
    /// result even when the exit status is non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned.
    fn run_unchecked(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn command(dir: &Path, program: &str, args: &[&str], env: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        for (k, v) in env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl Executor for SystemExecutor {
    fn run_unchecked(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let output = Self::command(dir, program, args, env)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_echo() {
        let dir = std::env::temp_dir();
        let result = SystemExecutor
            .run_unchecked(&dir, "echo", &["hello"], &[])
            .unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_unchecked_failure() {
        let dir = std::env::temp_dir();
        let result = SystemExecutor.run_unchecked(&dir, "false", &[], &[]).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn missing_program_is_an_error() {
        let dir = std::env::temp_dir();
        let result = SystemExecutor.run_unchecked(&dir, "marionette-no-such-program", &[], &[]);
        assert!(result.is_err(), "spawn failure should produce an error");
    }

    #[test]
    fn run_passes_environment() {
        let dir = std::env::temp_dir();
        let result = SystemExecutor
            .run_unchecked(&dir, "sh", &["-c", "printf %s \"$GREETING\""], &[("GREETING", "hi")])
            .unwrap();
        assert_eq!(result.stdout, "hi");
    }

    #[test]
    fn run_uses_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemExecutor.run_unchecked(dir.path(), "pwd", &[], &[]).unwrap();
        let reported = std::path::PathBuf::from(result.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
