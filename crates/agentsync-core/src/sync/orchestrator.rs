//! Sync orchestration: one sequential pipeline per tool, tools in parallel
//! when no prompt can block.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use chrono::{DateTime, Utc};

use super::actions::SyncAction;
use super::baseline;
use super::executor::{ExecutionReport, PlanExecutor};
use crate::MachineId;
use crate::backup::{BackupContext, BackupId, BackupManager};
use crate::config::{Config, ConfigMerger, ResolvedTool, expand_home};
use crate::diff::{
    DiffOptions, ExactDigest, LineSimilarity, SimilarityComparator, SyncMode, SyncPlan, diff,
};
use crate::error::{Error, Result};
use crate::resolve::{ConflictResolver, DecisionSource, ResolutionSummary};
use crate::scanner::{ScanOptions, Scanner};
use crate::state::StateStore;

/// Options for a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Propagation directions
    pub mode: SyncMode,
    /// Compute and report without touching disk
    pub dry_run: bool,
    /// Decisions come from a policy, never from a prompt
    pub auto: bool,
}

impl SyncOptions {
    /// Whether no decision source can block, so tools may run in parallel
    #[must_use]
    pub const fn never_suspends(&self) -> bool {
        self.auto || self.dry_run
    }
}

/// Everything one tool's run produced
#[derive(Debug, Clone)]
pub struct ToolReport {
    /// Tool name
    pub tool: String,
    /// Options the run used
    pub options: SyncOptions,
    /// Resolved plan
    pub plan: SyncPlan,
    /// Conflict resolution counts
    pub resolution: ResolutionSummary,
    /// Execution outcomes
    pub execution: ExecutionReport,
    /// Scan warnings from both trees
    pub warnings: Vec<String>,
    /// Backups removed by automatic cleanup
    pub cleaned_backups: Vec<BackupId>,
}

impl ToolReport {
    /// No failed actions and no unresolved conflicts
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.execution.is_success()
    }

    /// Backup created for this run, if any
    #[must_use]
    pub const fn backup_id(&self) -> Option<&BackupId> {
        self.execution.backup_id.as_ref()
    }

    /// Actions applied on disk, for downstream change propagation
    pub fn changed_actions(&self) -> impl Iterator<Item = &SyncAction> {
        self.execution.applied()
    }
}

/// Result of one tool within a multi-tool run
#[derive(Debug)]
pub struct ToolRun {
    /// Tool name
    pub tool: String,
    /// Report, or the error that aborted the tool's pipeline
    pub outcome: Result<ToolReport>,
}

/// Classification-only view used by `status`
#[derive(Debug, Clone)]
pub struct ToolStatus {
    /// Tool name
    pub tool: String,
    /// Bidirectional plan with nothing resolved
    pub plan: SyncPlan,
    /// Scan warnings
    pub warnings: Vec<String>,
    /// Last sync of this machine, if any
    pub last_sync: Option<DateTime<Utc>>,
    /// Machines with a baseline for this tool
    pub machines: Vec<MachineId>,
}

/// Main sync engine
pub struct SyncEngine {
    config: Config,
    machine: MachineId,
    interrupt: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Engine for a configuration and the running machine
    #[must_use]
    pub fn new(config: Config, machine: MachineId) -> Self {
        Self {
            config,
            machine,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an interrupt flag checked between tools
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Loaded configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Machine identity used for baselines
    #[must_use]
    pub const fn machine(&self) -> &MachineId {
        &self.machine
    }

    /// Backup manager for the configured backup directory
    #[must_use]
    pub fn backups(&self) -> BackupManager {
        BackupManager::new(expand_home(&self.config.settings.backup_dir))
    }

    /// Baseline store for a tool
    pub fn state_store(&self, tool: &str) -> Result<StateStore> {
        Ok(StateStore::new(ConfigMerger::resolve(&self.config, tool)?.state_root))
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            follow_symlinks: self.config.settings.follow_symlinks,
            respect_gitignore: self.config.settings.respect_gitignore,
        }
    }

    /// Scan both trees and classify against the baseline
    pub fn plan_tool(&self, tool: &ResolvedTool, mode: SyncMode) -> Result<(SyncPlan, Vec<String>)> {
        let store = StateStore::new(&tool.state_root);
        let baseline = store.load(&tool.name, &self.machine)?;
        self.plan_against(tool, mode, &baseline)
    }

    fn plan_against(
        &self,
        tool: &ResolvedTool,
        mode: SyncMode,
        baseline: &crate::state::Snapshot,
    ) -> Result<(SyncPlan, Vec<String>)> {
        let scanner = Scanner::for_tool(tool, self.scan_options());
        let source = scanner.scan(&tool.source)?;
        let target = scanner.scan(&tool.target)?;

        let settings = &self.config.settings;
        let line_similarity;
        let comparator: &dyn SimilarityComparator = if settings.rename_similarity_threshold < 1.0 {
            line_similarity = LineSimilarity::new(&tool.source, &tool.target);
            &line_similarity
        } else {
            &ExactDigest
        };
        let options = DiffOptions {
            detect_renames: settings.detect_renames,
            rename_threshold: settings.rename_similarity_threshold,
            comparator,
        };

        let plan = diff(&source.files, &target.files, baseline, mode, &options);
        let mut warnings = source.warnings;
        warnings.extend(target.warnings);
        Ok((plan, warnings))
    }

    /// Run scan → diff → resolve → execute → persist for one tool
    pub fn sync_tool(
        &self,
        name: &str,
        options: SyncOptions,
        decisions: &mut dyn DecisionSource,
    ) -> Result<ToolReport> {
        let tool = ConfigMerger::resolve(&self.config, name)?;
        self.run_tool(&tool, options, decisions)
    }

    fn run_tool(
        &self,
        tool: &ResolvedTool,
        options: SyncOptions,
        decisions: &mut dyn DecisionSource,
    ) -> Result<ToolReport> {
        let settings = &self.config.settings;
        let span = tracing::info_span!("sync", tool = %tool.name, mode = %options.mode);
        let _guard = span.enter();

        let store = StateStore::new(&tool.state_root);
        let previous = store.load(&tool.name, &self.machine)?;
        let (mut plan, warnings) = self.plan_against(tool, options.mode, &previous)?;

        let resolution = ConflictResolver::new(options.mode, settings.confirm_destructive_source)
            .resolve(&mut plan, decisions)?;

        let backups = self.backups();
        let context = BackupContext {
            tool: tool.name.clone(),
            machine_id: self.machine.clone(),
            operation: options.mode,
        };
        let execution = PlanExecutor::new(tool, &backups, context, settings.verify_after_write)
            .execute(&plan, options.dry_run);

        let mut cleaned_backups = Vec::new();
        if !options.dry_run {
            let next = baseline::advance(&previous, &plan, &execution, Utc::now());
            store.save(&tool.name, &self.machine, &next)?;

            if settings.auto_cleanup_backups && execution.is_success() {
                match backups.clean(settings.backup_retention_days, settings.backup_retention_count)
                {
                    Ok(removed) => cleaned_backups = removed,
                    Err(e) => tracing::warn!(error = %e, "automatic backup cleanup failed"),
                }
            }
        }

        tracing::info!(
            actions = plan.action_count(),
            unresolved = execution.unresolved.len(),
            failed = execution.failed().count(),
            "tool finished"
        );
        Ok(ToolReport {
            tool: tool.name.clone(),
            options,
            plan,
            resolution,
            execution,
            warnings,
            cleaned_backups,
        })
    }

    fn selected_tools(&self, only: Option<&str>) -> Result<Vec<ResolvedTool>> {
        match only {
            Some(name) => Ok(vec![ConfigMerger::resolve(&self.config, name)?]),
            None => self
                .config
                .enabled_tools()
                .map(|name| ConfigMerger::resolve(&self.config, name))
                .collect(),
        }
    }

    /// Sync every enabled tool (or only `only`).
    ///
    /// Tools run on scoped threads when no decision can block, otherwise one
    /// after another. An interrupt stops tools that have not started yet.
    pub fn sync_all<F>(
        &self,
        only: Option<&str>,
        options: SyncOptions,
        decisions_for: F,
    ) -> Result<Vec<ToolRun>>
    where
        F: Fn(&ResolvedTool) -> Box<dyn DecisionSource> + Sync,
    {
        let tools = self.selected_tools(only)?;
        let run = |tool: &ResolvedTool| ToolRun {
            tool: tool.name.clone(),
            outcome: if self.interrupt.load(Ordering::SeqCst) {
                Err(Error::Interrupted)
            } else {
                let mut decisions = decisions_for(tool);
                self.run_tool(tool, options, decisions.as_mut())
            },
        };

        if options.never_suspends() && tools.len() > 1 {
            Ok(thread::scope(|scope| {
                let handles: Vec<_> = tools
                    .iter()
                    .map(|tool| scope.spawn(|| run(tool)))
                    .collect();
                handles
                    .into_iter()
                    .zip(&tools)
                    .map(|(handle, tool)| {
                        handle.join().unwrap_or_else(|_| ToolRun {
                            tool: tool.name.clone(),
                            outcome: Err(Error::Config(format!(
                                "sync worker for '{}' panicked",
                                tool.name
                            ))),
                        })
                    })
                    .collect()
            }))
        } else {
            Ok(tools.iter().map(run).collect())
        }
    }

    /// Classify every enabled tool (or only `only`) without writing anything
    pub fn status(&self, only: Option<&str>) -> Result<Vec<(String, Result<ToolStatus>)>> {
        let tools = self.selected_tools(only)?;
        Ok(tools
            .iter()
            .map(|tool| (tool.name.clone(), self.tool_status(tool)))
            .collect())
    }

    fn tool_status(&self, tool: &ResolvedTool) -> Result<ToolStatus> {
        let store = StateStore::new(&tool.state_root);
        let baseline = store.load(&tool.name, &self.machine)?;
        let (plan, warnings) = self.plan_against(tool, SyncMode::Bidirectional, &baseline)?;
        let machines = store
            .list_machines(&tool.name)?
            .into_iter()
            .map(|snapshot| snapshot.machine_id)
            .collect();
        Ok(ToolStatus {
            tool: tool.name.clone(),
            plan,
            warnings,
            last_sync: (!baseline.is_empty()).then_some(baseline.last_sync),
            machines,
        })
    }

    /// Remove this machine's baseline for a tool
    pub fn reset_state(&self, tool: &str) -> Result<bool> {
        self.state_store(tool)?.reset(tool, &self.machine)
    }
}
