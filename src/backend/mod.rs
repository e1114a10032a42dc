//! The seam between manifests and whatever enacts their resources.
pub mod local;

use anyhow::Result;

use crate::resources::ResourceDescriptor;

pub use local::LocalBackend;

/// Applies a manifest's flat resource list to a target.
///
/// `noop` asks the backend to compute changes without enacting them.
#[cfg_attr(test, mockall::automock)]
pub trait ApplyBackend: Send + Sync {
    /// Apply `resources` in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the target could not be brought to the described
    /// state.
    fn apply(&self, resources: &[ResourceDescriptor], noop: bool) -> Result<ApplyReport>;
}

/// Counts collected while applying resources.
///
/// # Examples
///
/// ```
/// use marionette::backend::ApplyReport;
///
/// let report = ApplyReport { changed: 3, already_ok: 10, skipped: 0, failed: 0 };
/// assert_eq!(report.summary(false), "3 changed, 10 already ok");
/// assert_eq!(report.summary(true), "3 would change, 10 already ok");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    /// Resources changed, or that would change in noop mode.
    pub changed: u32,
    /// Resources already in the desired state.
    pub already_ok: u32,
    /// Resources the backend does not handle or could not evaluate.
    pub skipped: u32,
    /// Resources whose change failed.
    pub failed: u32,
}

impl ApplyReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of resources counted.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.changed + self.already_ok + self.skipped + self.failed
    }

    /// Format the summary line (e.g. `"3 changed, 10 already ok, 1 skipped"`).
    ///
    /// Zero `skipped` and `failed` counts are left out.
    #[must_use]
    pub fn summary(&self, noop: bool) -> String {
        let verb = if noop { "would change" } else { "changed" };
        let mut line = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        if self.skipped > 0 {
            line.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            line.push_str(&format!(", {} failed", self.failed));
        }
        line
    }
}

impl std::ops::AddAssign for ApplyReport {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_skipped_and_failed_only_when_present() {
        let report = ApplyReport {
            changed: 1,
            already_ok: 2,
            skipped: 3,
            failed: 0,
        };
        assert_eq!(report.summary(false), "1 changed, 2 already ok, 3 skipped");

        let report = ApplyReport {
            failed: 2,
            ..ApplyReport::new()
        };
        assert_eq!(report.summary(true), "0 would change, 0 already ok, 2 failed");
    }

    #[test]
    fn add_assign_sums_every_counter() {
        let mut total = ApplyReport::new();
        total += ApplyReport {
            changed: 1,
            already_ok: 1,
            skipped: 0,
            failed: 0,
        };
        total += ApplyReport {
            changed: 0,
            already_ok: 2,
            skipped: 1,
            failed: 1,
        };
        assert_eq!(total.total(), 6);
        assert_eq!(total.already_ok, 3);
    }

    #[test]
    fn mock_backend_receives_resources_and_flag() {
        let mut backend = MockApplyBackend::new();
        backend
            .expect_apply()
            .withf(|resources, noop| resources.is_empty() && *noop)
            .times(1)
            .returning(|_, _| Ok(ApplyReport::new()));
        let report = backend.apply(&[], true).unwrap();
        assert_eq!(report, ApplyReport::new());
    }
}
