//! The per-file decision loop of §4.6, plus the compatibility check that
//! runs once before any file is touched.

use crate::compatibility::{self, ModDescriptor};
use crate::errors::{FileOutcome, MergeFailure};
use crate::merger;
use crate::parser;
use crate::report::RunStats;
use crate::scanner::{self, ScannedPath};
use crate::validator;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Smart,
    Priority,
    Base,
}

/// Cooperative cancellation, checked between files. A partial output
/// directory produced under cancellation is the caller's to delete.
#[derive(Default)]
pub struct CancellationToken(AtomicBool);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fire-and-forget progress events; the core never blocks on this.
pub trait ProgressReporter {
    fn report(&self, current_file: &str, index: usize, total: usize, status: &str);
}

pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn report(&self, _current_file: &str, _index: usize, _total: usize, _status: &str) {}
}

/// One file's final disposition, ready for the writer.
pub struct FileResult {
    pub relative_path: String,
    pub outcome: FileOutcome,
    /// Populated when `outcome` is `Merged` or `CopiedVerbatim`.
    pub content: Option<String>,
}

fn base_descriptor(base_dir: &Path) -> Option<ModDescriptor> {
    compatibility::load_descriptor(base_dir).ok().flatten()
}

/// Reads every submod's `descriptor.mod` and checks its declared dependency
/// against the chosen base, contributing to the run's `errors[]`/
/// `warnings[]` before any file is processed.
pub fn check_compatibility(base_dir: &Path, submods: &[PathBuf]) -> (Vec<String>, Vec<String>) {
    let base = base_descriptor(base_dir);
    let base_is_vanilla = base.is_none();
    let base_name = base.as_ref().map(|d| d.name.as_str()).unwrap_or("vanilla").to_string();

    let descriptors: Vec<ModDescriptor> = submods
        .iter()
        .filter_map(|p| compatibility::load_descriptor(p).ok().flatten())
        .collect();

    compatibility::validate_mod_compatibility(&base_name, base_is_vanilla, &descriptors)
}

/// Runs the per-file loop over every path the scanner finds across
/// `submods`, dispatching to the merger per §4.6 and recording outcomes.
pub fn run(
    base_dir: &Path,
    submods: &[PathBuf],
    strategy: Strategy,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<(RunStats, Vec<FileResult>)> {
    let mut stats = RunStats::default();
    let (errors, warnings) = check_compatibility(base_dir, submods);
    stats.errors.extend(errors);
    stats.warnings.extend(warnings);

    let scanned = scanner::scan(base_dir, submods)?;
    let mut results = Vec::new();
    let total = scanned.len();

    for (index, path) in scanned.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        progress.report(&path.relative_path, index, total, "processing");

        let Some(result) = process_path(base_dir, path, strategy, &mut stats) else {
            continue;
        };
        results.push(result);
    }

    Ok((stats, results))
}

fn process_path(
    base_dir: &Path,
    path: &ScannedPath,
    strategy: Strategy,
    stats: &mut RunStats,
) -> Option<FileResult> {
    if !path.base_has_file {
        stats.record(&FileOutcome::Skipped);
        return None;
    }

    let changed: Vec<&crate::scanner::PathContribution> =
        path.contributions.iter().filter(|c| !c.unchanged).collect();
    if changed.is_empty() {
        stats.record(&FileOutcome::Skipped);
        return None;
    }

    if strategy == Strategy::Base {
        stats.record(&FileOutcome::Skipped);
        return None;
    }

    let relative = Path::new(&path.relative_path);
    let outcome;
    let content;

    if scanner::is_mergeable(relative) {
        let base_text = match std::fs::read_to_string(base_dir.join(relative)) {
            Ok(t) => t,
            Err(e) => {
                outcome = FileOutcome::CopiedVerbatim { reason: Some(MergeFailure::Io(e.to_string())) };
                stats.record(&outcome);
                return Some(FileResult { relative_path: path.relative_path.clone(), outcome, content: None });
            }
        };
        let mods: Vec<(String, String)> = changed
            .iter()
            .map(|c| (c.mod_index.to_string(), c.content.clone()))
            .collect();

        let merge_fn = if strategy == Strategy::Priority { merger::merge_priority_only } else { merger::merge };
        let merge_outcome = merge_fn(&base_text, &mods, &path.relative_path);
        let tree = parser::parse(&merge_outcome.text).tree;
        let validation = validator::validate(&tree, &merge_outcome.text, &path.relative_path);
        let validation_ok = validation.is_ok();
        stats.warnings.extend(validation.warnings);

        if validation_ok {
            outcome = FileOutcome::Merged;
            content = Some(merge_outcome.text);
        } else {
            let (open, close) = validator::count_braces(&merge_outcome.text);
            let reason = MergeFailure::UnbalancedBraces { open, close };
            outcome = FileOutcome::CopiedVerbatim { reason: Some(reason) };
            content = changed.last().map(|c| c.content.clone());
        }
    } else {
        outcome = FileOutcome::CopiedVerbatim { reason: None };
        content = changed.last().map(|c| c.content.clone());
    }

    stats.record(&outcome);
    Some(FileResult { relative_path: path.relative_path.clone(), outcome, content })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let token = CancellationToken::default();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn run_end_to_end_over_a_temp_directory() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let mod_a = dir.path().join("mod_a");
        std::fs::create_dir_all(base.join("events")).unwrap();
        std::fs::create_dir_all(mod_a.join("events")).unwrap();
        std::fs::write(
            base.join("events/test.txt"),
            "europe.0001 = {\n\ttype = character_event\n\ttitle = base_title\n}\n",
        )
        .unwrap();
        std::fs::write(
            mod_a.join("events/test.txt"),
            "europe.0001 = {\n\ttype = character_event\n\ttitle = modA_title\n}\n",
        )
        .unwrap();

        let cancel = CancellationToken::default();
        let (stats, results) = run(&base, &[mod_a], Strategy::Smart, &NullProgress, &cancel).unwrap();
        assert_eq!(stats.merged, 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].content.as_ref().unwrap().contains("modA_title"));
    }

    #[test]
    fn base_strategy_skips_every_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let mod_a = dir.path().join("mod_a");
        std::fs::create_dir_all(base.join("common")).unwrap();
        std::fs::create_dir_all(mod_a.join("common")).unwrap();
        std::fs::write(base.join("common/x.txt"), "a = 1\n").unwrap();
        std::fs::write(mod_a.join("common/x.txt"), "a = 2\n").unwrap();

        let cancel = CancellationToken::default();
        let (stats, results) = run(&base, &[mod_a], Strategy::Base, &NullProgress, &cancel).unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(results.is_empty());
    }
}
