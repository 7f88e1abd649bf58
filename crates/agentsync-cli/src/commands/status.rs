use agentsync_core::diff::SyncPlan;
use agentsync_core::sync::{SyncEngine, ToolStatus};

pub struct Status;

impl Status {
    /// Print pending actions per tool; returns whether every tool was classified
    pub fn execute(engine: &SyncEngine, tool: Option<&str>) -> anyhow::Result<bool> {
        let mut success = true;
        for (name, status) in engine.status(tool)? {
            match status {
                Ok(status) => print!("{}", Self::render(&status)),
                Err(e) => {
                    println!("{name}: error: {e}");
                    success = false;
                }
            }
        }
        Ok(success)
    }

    fn render(status: &ToolStatus) -> String {
        let plan = &status.plan;
        let last_sync = status.last_sync.map_or_else(
            || "never".to_string(),
            |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        let mut out = format!(
            "{}  (last sync: {last_sync}, machines: {})\n",
            status.tool,
            status.machines.len()
        );

        if plan.is_empty() && plan.skipped.is_empty() {
            out.push_str("  ✓ in sync\n");
        }
        for (label, paths) in Self::rows(plan) {
            for path in paths {
                out.push_str(&format!("  {label:<16} {path}\n"));
            }
        }
        for rename in &plan.renames {
            out.push_str(&format!(
                "  {:<16} {} -> {}\n",
                format!("rename {}", rename.apply_on()),
                rename.from,
                rename.to
            ));
        }
        for conflict in &plan.conflicts {
            out.push_str(&format!("  {:<16} {} ({})\n", "⚠ conflict", conflict.path, conflict.kind));
        }
        for skipped in &plan.skipped {
            out.push_str(&format!("  {:<16} {} ({})\n", "· skipped", skipped.path, skipped.reason));
        }
        for warning in &status.warnings {
            out.push_str(&format!("  warning: {warning}\n"));
        }
        out
    }

    fn rows(plan: &SyncPlan) -> [(&'static str, &Vec<String>); 4] {
        [
            ("→ copy to target", &plan.copy_to_target),
            ("← copy to source", &plan.copy_to_source),
            ("✗ delete target", &plan.delete_from_target),
            ("✗ delete source", &plan.delete_from_source),
        ]
    }
}
