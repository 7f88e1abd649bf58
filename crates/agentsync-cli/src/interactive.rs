//! Interactive prompting for conflicts and source deletions

use std::io::IsTerminal;
use std::path::PathBuf;

use agentsync_core::config::ResolvedTool;
use agentsync_core::diff::Conflict;
use agentsync_core::resolve::{Decision, DecisionSource, PendingDeletion};
use agentsync_core::scanner::{self, FileRecord};
use agentsync_core::state::DeletionDecision;
use agentsync_core::{Error, Result};
use dialoguer::Input;

use crate::diff_view::DiffView;

/// User's choice for a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Copy the source version over the target
    Source,
    /// Copy the target version over the source
    Target,
    /// Newer modification time wins
    Newer,
    /// Newer wins for this and all remaining conflicts
    NewerAll,
    /// Leave both sides alone
    Skip,
    /// Ask again next run
    Later,
    /// Show diff and re-prompt
    Diff,
    /// Stop this tool's run
    Quit,
}

impl ConflictChoice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "s" | "source" => Some(Self::Source),
            "t" | "target" => Some(Self::Target),
            "n" | "newer" => Some(Self::Newer),
            "a" | "all" => Some(Self::NewerAll),
            "k" | "skip" => Some(Self::Skip),
            // Empty input leaves the conflict for later
            "" | "l" | "later" => Some(Self::Later),
            "d" | "diff" => Some(Self::Diff),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// User's answer to a source deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionChoice {
    /// Delete the source copy
    Yes,
    /// Keep the source copy and stop asking
    No,
    /// Ask again next run
    Later,
    /// Stop this tool's run
    Quit,
}

impl DeletionChoice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            "" | "l" | "later" => Some(Self::Later),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Terminal decision source for one tool
pub struct InteractivePrompter {
    tool: String,
    source_root: PathBuf,
    target_root: PathBuf,
    newer_for_all: bool,
}

impl InteractivePrompter {
    /// Prompter for a tool's trees
    #[must_use]
    pub fn new(tool: &ResolvedTool) -> Self {
        Self {
            tool: tool.name.clone(),
            source_root: tool.source.clone(),
            target_root: tool.target.clone(),
            newer_for_all: false,
        }
    }

    fn ask(prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| {
                tracing::warn!(error = %e, "prompt failed");
                Error::Aborted
            })
    }

    fn show_diff(&self, path: &str) {
        let source = scanner::absolute(&self.source_root, path);
        let target = scanner::absolute(&self.target_root, path);
        match DiffView::files(&source, &target, std::io::stdout().is_terminal()) {
            Ok(diff) => println!("\n{diff}"),
            Err(e) => {
                eprintln!("\nWarning: Failed to generate diff: {e:#}");
                eprintln!("Source: {}", source.display());
                eprintln!("Target: {}", target.display());
            }
        }
    }
}

fn describe(record: Option<&FileRecord>) -> String {
    record.map_or_else(
        || "deleted".to_string(),
        |r| {
            format!(
                "{} bytes, modified {}, {}",
                r.size,
                r.modified.format("%Y-%m-%d %H:%M:%S"),
                r.digest.short()
            )
        },
    )
}

impl DecisionSource for InteractivePrompter {
    fn decide(&mut self, conflict: &Conflict) -> Result<Decision> {
        if self.newer_for_all {
            return Ok(Decision::AutoNewerWins);
        }

        println!("\n⚠️  Conflict in {} ({}): {}", self.tool, conflict.kind, conflict.path);
        println!("  Source: {}", describe(conflict.source.as_ref()));
        println!("  Target: {}", describe(conflict.target.as_ref()));

        loop {
            let input = Self::ask(
                "Resolve? [s/t/n/a/k/l/d/q] (source/target/newer/newer-all/skip/later/diff/quit)",
            )?;
            match ConflictChoice::parse(&input) {
                Some(ConflictChoice::Source) => return Ok(Decision::KeepSource),
                Some(ConflictChoice::Target) => return Ok(Decision::UseTarget),
                Some(ConflictChoice::Newer) => return Ok(Decision::AutoNewerWins),
                Some(ConflictChoice::NewerAll) => {
                    self.newer_for_all = true;
                    return Ok(Decision::AutoNewerWins);
                }
                Some(ConflictChoice::Skip) => return Ok(Decision::Skip),
                Some(ConflictChoice::Later) => return Ok(Decision::Defer),
                Some(ConflictChoice::Diff) => self.show_diff(&conflict.path),
                Some(ConflictChoice::Quit) => return Err(Error::Aborted),
                None => eprintln!("Invalid choice. Please enter s/t/n/a/k/l/d/q or the full word."),
            }
        }
    }

    fn confirm_deletion(&mut self, deletion: &PendingDeletion<'_>) -> Result<DeletionDecision> {
        println!(
            "\n🗑  {} was deleted from the target; delete it from the {} too?",
            deletion.path, deletion.side
        );
        println!("  Copy: {}", describe(deletion.record));

        loop {
            let input = Self::ask("Delete? [y/n/l/q] (yes/no, keep it/later/quit)")?;
            match DeletionChoice::parse(&input) {
                Some(DeletionChoice::Yes) => return Ok(DeletionDecision::Confirmed),
                Some(DeletionChoice::No) => return Ok(DeletionDecision::Declined),
                Some(DeletionChoice::Later) => return Ok(DeletionDecision::Pending),
                Some(DeletionChoice::Quit) => return Err(Error::Aborted),
                None => eprintln!("Invalid choice. Please enter y/n/l/q or the full word."),
            }
        }
    }
}
