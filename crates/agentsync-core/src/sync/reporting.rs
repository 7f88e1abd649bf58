//! Sync operation reporting and statistics

use std::fmt::Write as _;

use super::actions::SyncAction;
use super::executor::ActionStatus;
use super::orchestrator::ToolReport;

/// Per-run counts derived from the execution report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    /// Files created
    pub created: usize,
    /// Files updated
    pub updated: usize,
    /// Files deleted
    pub deleted: usize,
    /// Files moved
    pub renamed: usize,
    /// Paths skipped by mode or decision
    pub skipped: usize,
    /// Conflicts left without a resolution
    pub unresolved: usize,
    /// Actions that failed or were blocked by a backup failure
    pub failed: usize,
}

impl SyncCounts {
    /// Tally a tool report
    #[must_use]
    pub fn of(report: &ToolReport) -> Self {
        let mut counts = Self {
            skipped: report.plan.skipped.len(),
            unresolved: report.execution.unresolved.len(),
            ..Self::default()
        };
        for outcome in &report.execution.outcomes {
            match outcome.status {
                ActionStatus::Applied | ActionStatus::Planned => match outcome.action {
                    SyncAction::Create { .. } => counts.created += 1,
                    SyncAction::Update { .. } => counts.updated += 1,
                    SyncAction::Delete { .. } => counts.deleted += 1,
                    SyncAction::Rename { .. } => counts.renamed += 1,
                },
                ActionStatus::Failed(_) | ActionStatus::BackupFailed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// Total operations performed (or planned)
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.created + self.updated + self.deleted + self.renamed
    }
}

/// Sync operation reporter
pub struct SyncReporter;

impl SyncReporter {
    /// Generate a summary report
    #[must_use]
    pub fn generate_summary(report: &ToolReport) -> String {
        let counts = SyncCounts::of(report);
        let mut output = String::new();

        let title = if report.options.dry_run {
            "Dry Run Summary"
        } else {
            "Sync Summary"
        };
        let _ = writeln!(output, "\n=== {title}: {} ({}) ===", report.tool, report.options.mode);
        let _ = writeln!(output, "Created:   {}", counts.created);
        let _ = writeln!(output, "Updated:   {}", counts.updated);
        let _ = writeln!(output, "Deleted:   {}", counts.deleted);
        let _ = writeln!(output, "Renamed:   {}", counts.renamed);
        let _ = writeln!(output, "Skipped:   {}", counts.skipped);
        let _ = writeln!(output, "Unresolved: {}", counts.unresolved);

        if !report.plan.skipped.is_empty() {
            let _ = writeln!(output, "\nSkipped ({}):", report.plan.skipped.len());
            for skipped in &report.plan.skipped {
                let _ = writeln!(output, "  - {}: {}", skipped.path, skipped.reason);
            }
        }

        if !report.execution.unresolved.is_empty() {
            let _ = writeln!(output, "\nUnresolved conflicts:");
            for path in &report.execution.unresolved {
                let _ = writeln!(output, "  - {path}");
            }
        }

        let failures: Vec<_> = report.execution.failed().collect();
        if !failures.is_empty() {
            let _ = writeln!(output, "\nErrors ({}):", failures.len());
            for outcome in failures {
                let reason = match &outcome.status {
                    ActionStatus::Failed(reason) => reason.as_str(),
                    ActionStatus::BackupFailed(reason) => reason.as_str(),
                    _ => "",
                };
                let _ = writeln!(output, "  - {}: {reason}", outcome.action);
            }
        }

        if !report.warnings.is_empty() {
            let _ = writeln!(output, "\nWarnings ({}):", report.warnings.len());
            for warning in &report.warnings {
                let _ = writeln!(output, "  - {warning}");
            }
        }

        if let Some(id) = report.backup_id() {
            let _ = writeln!(output, "\nBackup: {id}");
        }
        if !report.cleaned_backups.is_empty() {
            let _ = writeln!(output, "Removed {} old backup(s)", report.cleaned_backups.len());
        }

        let _ = writeln!(output, "\nTotal operations: {}", counts.total_operations());
        if report.options.dry_run {
            output.push_str("Status: dry run, nothing written\n");
        } else if report.is_success() {
            output.push_str("Status: ✓ Success\n");
        } else {
            output.push_str("Status: ✗ Completed with errors\n");
        }

        output
    }
}
