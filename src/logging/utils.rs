//! Utility functions for path resolution, ANSI stripping, and time formatting.
use std::fs;
use std::path::PathBuf;

/// Strip ANSI escape sequences from a string.
///
/// CSI sequences (`ESC [` ... final byte in `@`..`~`) are removed whole; for
/// any other escape only the byte after `ESC` is dropped.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            for inner in chars.by_ref() {
                if ('@'..='~').contains(&inner) {
                    break;
                }
            }
        }
    }
    out
}

/// Return the `$XDG_CACHE_HOME/marionette/` directory, creating it if needed.
///
/// Falls back to `~/.cache/marionette/` when `XDG_CACHE_HOME` is unset.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME").map_or_else(
        || {
            std::env::var_os("HOME")
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    let dir = base.join("marionette");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Return the log file path for `command`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Format the current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format the current UTC time as `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::TEST_ENV_MUTEX;

    #[test]
    fn strip_ansi_removes_colors() {
        assert_eq!(strip_ansi("\x1b[31mERROR\x1b[0m hello"), "ERROR hello");
        assert_eq!(strip_ansi("no codes here"), "no codes here");
        assert_eq!(strip_ansi("\x1b[1;34m==>\x1b[0m \x1b[1mApply\x1b[0m"), "==> Apply");
    }

    #[test]
    fn strip_ansi_handles_other_escapes() {
        assert_eq!(strip_ansi("\x1b[2Jhello"), "hello");
        assert_eq!(strip_ansi("\x1bMtext"), "text");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    #[allow(unsafe_code)]
    fn log_file_lives_under_xdg_cache_home() {
        let tmp = tempfile::tempdir().unwrap();
        let _lock = TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // SAFETY: Protected by TEST_ENV_MUTEX; restored before lock is released.
        unsafe {
            std::env::set_var("XDG_CACHE_HOME", tmp.path());
        }
        let path = log_file_path("apply");
        // SAFETY: as above.
        unsafe {
            std::env::remove_var("XDG_CACHE_HOME");
        }
        assert_eq!(path, Some(tmp.path().join("marionette").join("apply.log")));
        assert!(tmp.path().join("marionette").is_dir());
    }

    #[test]
    fn time_formats_have_expected_shape() {
        let time = format_utc_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
        let datetime = format_utc_datetime();
        assert_eq!(datetime.len(), 19);
        assert!(datetime.contains(' '));
    }
}
