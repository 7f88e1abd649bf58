use agentsync_core::backup::BackupId;
use agentsync_core::sync::SyncEngine;
use anyhow::Context;

use super::common::confirm;

pub struct ListBackups;

impl ListBackups {
    pub fn execute(engine: &SyncEngine, tool: Option<&str>) -> anyhow::Result<bool> {
        let manifests = engine.backups().list(tool)?;
        if manifests.is_empty() {
            println!("No backups found in {}", engine.backups().root().display());
            return Ok(true);
        }
        for manifest in manifests {
            println!(
                "{}  {}  {:<8} {:<14} {} file(s)",
                manifest.backup_id,
                manifest.created_at.format("%Y-%m-%d %H:%M:%S"),
                manifest.tool,
                manifest.operation.as_str(),
                manifest.entries.len()
            );
        }
        Ok(true)
    }
}

pub struct Restore;

impl Restore {
    pub fn execute(engine: &SyncEngine, backup_id: &str, yes: bool) -> anyhow::Result<bool> {
        let id = BackupId::parse(backup_id)?;
        let mut confirm_mismatch = |problem: &agentsync_core::Error| {
            eprintln!("Warning: {problem}");
            confirm("Restore this file anyway?", yes).unwrap_or(false)
        };
        let report = engine
            .backups()
            .restore(&id, &mut confirm_mismatch)
            .with_context(|| format!("Failed to restore backup {id}"))?;

        for path in &report.restored {
            println!("restored        {}", path.display());
        }
        for path in &report.already_current {
            println!("already current {}", path.display());
        }
        for path in &report.validation_failed {
            println!("not restored    {} (stored copy does not match manifest)", path.display());
        }
        for (path, reason) in &report.failed {
            println!("failed          {}: {reason}", path.display());
        }
        Ok(report.is_success())
    }
}

pub struct CleanBackups;

impl CleanBackups {
    pub fn execute(
        engine: &SyncEngine,
        days: Option<u32>,
        count: Option<usize>,
        yes: bool,
    ) -> anyhow::Result<bool> {
        let settings = &engine.config().settings;
        let days = days.unwrap_or(settings.backup_retention_days);
        let count = count.unwrap_or(settings.backup_retention_count);

        let prompt = format!("Remove backups older than {days} day(s) or beyond the newest {count}?");
        if !confirm(&prompt, yes)? {
            println!("Nothing removed.");
            return Ok(true);
        }

        let removed = engine.backups().clean(days, count)?;
        for id in &removed {
            println!("removed {id}");
        }
        println!("Removed {} backup(s)", removed.len());
        Ok(true)
    }
}
