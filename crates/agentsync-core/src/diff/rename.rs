//! Rename detection: collapsing a delete and a create on the same side
//! into one move applied to the other side.

use std::fs;
use std::path::PathBuf;

use similar::TextDiff;

use super::{DiffOptions, Rename, Side, SyncPlan};
use crate::scanner::{FileRecord, absolute};

/// Files above this size are never compared line by line
const MAX_COMPARE_BYTES: u64 = 1024 * 1024;

/// A possible rename pair
#[derive(Debug, Clone, Copy)]
pub struct RenameCandidate<'a> {
    /// Side where `old_path` vanished and `new_path` appeared
    pub renamed_on: Side,
    /// Vanished path (still present, unchanged, on the other side)
    pub old_path: &'a str,
    /// New path
    pub new_path: &'a str,
    /// Baseline record of the vanished path
    pub old: &'a FileRecord,
    /// Current record of the new path
    pub new: &'a FileRecord,
}

/// Similarity measure for rename thresholds below `1.0`
pub trait SimilarityComparator: Sync {
    /// Score in `[0, 1]`; `1.0` means identical content
    fn similarity(&self, candidate: &RenameCandidate<'_>) -> f64;
}

/// Only identical digests are similar
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactDigest;

impl SimilarityComparator for ExactDigest {
    fn similarity(&self, candidate: &RenameCandidate<'_>) -> f64 {
        if candidate.old.digest == candidate.new.digest {
            1.0
        } else {
            0.0
        }
    }
}

/// Line-based similarity ratio of the two texts
#[derive(Debug, Clone)]
pub struct LineSimilarity {
    source_root: PathBuf,
    target_root: PathBuf,
}

impl LineSimilarity {
    /// Comparator reading content from the two tree roots
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
        }
    }

    fn root(&self, side: Side) -> &PathBuf {
        match side {
            Side::Source => &self.source_root,
            Side::Target => &self.target_root,
        }
    }
}

impl SimilarityComparator for LineSimilarity {
    fn similarity(&self, candidate: &RenameCandidate<'_>) -> f64 {
        if candidate.old.digest == candidate.new.digest {
            return 1.0;
        }
        if candidate.old.size > MAX_COMPARE_BYTES || candidate.new.size > MAX_COMPARE_BYTES {
            return 0.0;
        }
        // The old content survives only on the side that did not see the rename
        let old_path = absolute(self.root(candidate.renamed_on.other()), candidate.old_path);
        let new_path = absolute(self.root(candidate.renamed_on), candidate.new_path);
        let (Ok(old), Ok(new)) = (fs::read_to_string(old_path), fs::read_to_string(new_path))
        else {
            return 0.0;
        };
        f64::from(TextDiff::from_lines(old.as_str(), new.as_str()).ratio())
    }
}

pub(super) fn detect(plan: &mut SyncPlan, options: &DiffOptions<'_>) {
    for renamed_on in [Side::Source, Side::Target] {
        if plan.mode.propagates_from(renamed_on) {
            detect_on(plan, renamed_on, options);
        }
    }
}

fn detect_on(plan: &mut SyncPlan, renamed_on: Side, options: &DiffOptions<'_>) {
    let apply_on = renamed_on.other();
    let (deletes, copies) = match apply_on {
        Side::Source => (&plan.delete_from_source, &plan.copy_to_source),
        Side::Target => (&plan.delete_from_target, &plan.copy_to_target),
    };
    let mut vanished: Vec<String> = deletes.clone();
    let appeared: Vec<String> = copies
        .iter()
        .filter(|path| {
            !plan.records.baseline.contains_key(*path)
                && plan.records.get(apply_on, path).is_none()
        })
        .cloned()
        .collect();

    let mut pairs = Vec::new();
    for new_path in &appeared {
        let Some(new) = plan.records.get(renamed_on, new_path) else {
            continue;
        };
        let mut best: Option<(usize, f64)> = None;
        for (index, old_path) in vanished.iter().enumerate() {
            let Some(old) = plan.records.baseline.get(old_path) else {
                continue;
            };
            let score = score(
                &RenameCandidate {
                    renamed_on,
                    old_path,
                    new_path,
                    old,
                    new,
                },
                options,
            );
            if score >= options.rename_threshold && best.is_none_or(|(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        if let Some((index, similarity)) = best {
            let from = vanished.remove(index);
            tracing::debug!(from = %from, to = %new_path, side = %renamed_on, similarity, "rename detected");
            pairs.push(Rename {
                from,
                to: new_path.clone(),
                renamed_on,
                similarity,
            });
        }
    }

    for rename in &pairs {
        plan.deletes_from(apply_on).retain(|p| *p != rename.from);
        plan.copies_into(apply_on).retain(|p| *p != rename.to);
    }
    plan.renames.extend(pairs);
}

fn score(candidate: &RenameCandidate<'_>, options: &DiffOptions<'_>) -> f64 {
    if candidate.old.digest == candidate.new.digest {
        1.0
    } else if options.rename_threshold >= 1.0 {
        0.0
    } else {
        options.comparator.similarity(candidate)
    }
}
