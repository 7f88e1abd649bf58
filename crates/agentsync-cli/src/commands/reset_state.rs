use agentsync_core::sync::SyncEngine;

use super::common::confirm;

pub struct ResetState;

impl ResetState {
    pub fn execute(engine: &SyncEngine, tool: &str, yes: bool) -> anyhow::Result<bool> {
        let prompt = format!(
            "Forget the sync baseline of {tool} on {}? The next sync treats every difference as new.",
            engine.machine()
        );
        if !confirm(&prompt, yes)? {
            println!("Baseline kept.");
            return Ok(true);
        }

        if engine.reset_state(tool)? {
            println!("Baseline of {tool} removed.");
        } else {
            println!("No baseline recorded for {tool}.");
        }
        Ok(true)
    }
}
