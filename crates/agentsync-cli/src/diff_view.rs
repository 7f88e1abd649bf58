//! Diff rendering with color-coded output

use std::fmt::Write;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use similar::{ChangeTag, TextDiff};

const DIFF_CONTEXT_LINES: usize = 3;

/// Unified diff of the target copy (`---`) against the source copy (`+++`)
pub struct DiffView;

impl DiffView {
    /// Diff two files; a missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read.
    pub fn files(source: &Path, target: &Path, colored: bool) -> anyhow::Result<String> {
        let source_content = read_or_empty(source)?;
        let target_content = read_or_empty(target)?;
        Ok(Self::render(
            &target_content,
            &source_content,
            target,
            source,
            colored,
        ))
    }

    /// Diff string contents
    #[must_use]
    pub fn render(
        old_content: &str,
        new_content: &str,
        old_path: &Path,
        new_path: &Path,
        colored: bool,
    ) -> String {
        let diff = TextDiff::from_lines(old_content, new_content);
        let paint = |code: &'static str| if colored { code } else { "" };
        let reset = paint("\x1b[0m");

        let mut output = String::new();
        let _ = writeln!(output, "{}--- {}{reset}", paint("\x1b[1m"), old_path.display());
        let _ = writeln!(output, "{}+++ {}{reset}", paint("\x1b[1m"), new_path.display());

        for (idx, group) in diff.grouped_ops(DIFF_CONTEXT_LINES).iter().enumerate() {
            if idx > 0 {
                output.push_str("...\n");
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let (sign, color) = match change.tag() {
                        ChangeTag::Delete => ("-", paint("\x1b[31m")),
                        ChangeTag::Insert => ("+", paint("\x1b[32m")),
                        ChangeTag::Equal => (" ", ""),
                    };
                    let newline = if change.value().ends_with('\n') {
                        ""
                    } else {
                        "\n"
                    };
                    let _ = write!(output, "{color}{sign}{}{newline}{reset}", change.value());
                }
            }
        }

        output
    }
}

fn read_or_empty(path: &Path) -> anyhow::Result<String> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}
