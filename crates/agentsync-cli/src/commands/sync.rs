use agentsync_core::Error;
use agentsync_core::resolve::{AutoPolicy, DeferAll, DecisionSource};
use agentsync_core::sync::{SyncEngine, SyncOptions, SyncReporter};

use crate::interactive::InteractivePrompter;

pub struct SyncCommand;

impl SyncCommand {
    /// Run every selected tool; returns whether all of them succeeded
    pub fn execute(
        engine: &SyncEngine,
        tool: Option<&str>,
        options: SyncOptions,
    ) -> anyhow::Result<bool> {
        let runs = engine.sync_all(tool, options, |tool| -> Box<dyn DecisionSource> {
            if options.auto {
                Box::new(AutoPolicy)
            } else if options.dry_run {
                Box::new(DeferAll)
            } else {
                Box::new(InteractivePrompter::new(tool))
            }
        })?;

        let mut success = true;
        for run in runs {
            match run.outcome {
                Ok(report) => {
                    println!("{}", SyncReporter::generate_summary(&report));
                    success &= report.is_success();
                }
                Err(Error::Aborted) => {
                    eprintln!("\nSync of {} cancelled by user; nothing was written.", run.tool);
                    success = false;
                }
                Err(Error::Interrupted) => {
                    eprintln!("Skipped {}: interrupted", run.tool);
                    success = false;
                }
                Err(e) => {
                    eprintln!("Error: {}: {e}", run.tool);
                    if matches!(e, Error::StateCorruption { .. }) {
                        eprintln!(
                            "  Run `agentsync reset-state --tool {}` to start from a fresh baseline.",
                            run.tool
                        );
                    }
                    success = false;
                }
            }
        }
        Ok(success)
    }
}
