//! Writes the orchestrator's per-file outcomes to an output directory: §6
//! Patch directory layout. This is the only module that performs I/O the
//! core (§5) deliberately avoids.

use crate::errors::FileOutcome;
use crate::orchestrator::FileResult;
use crate::report::RunStats;
use anyhow::{Context, Result};
use std::path::Path;

fn descriptor_body(name: &str, version: &str, supported_version: &str, tags: &[&str]) -> String {
    let tags_body = tags.iter().map(|t| format!("\t\"{t}\"\n")).collect::<String>();
    format!(
        "version=\"{version}\"\ntags={{\n{tags_body}}}\nname=\"{name}\"\nsupported_version=\"{supported_version}\"\n"
    )
}

/// Script files, `descriptor.mod`, and the sibling `.mod` file are written
/// UTF-8 with a leading BOM, matching the ground-truth generator's
/// `encoding='utf-8-sig'`; only `README.md` stays plain UTF-8.
fn with_bom(text: &str) -> String {
    if text.starts_with('\u{feff}') { text.to_string() } else { format!("\u{feff}{text}") }
}

fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn readme_body(name: &str, stats: &RunStats, load_order: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {name}\n\n"));
    out.push_str("Generated compatibility patch. Load order (lowest to highest priority):\n\n");
    for (i, mod_name) in load_order.iter().enumerate() {
        out.push_str(&format!("{}. {mod_name}\n", i + 1));
    }
    out.push_str("\n## Statistics\n\n");
    out.push_str(&format!("- total: {}\n", stats.total));
    out.push_str(&format!("- merged: {}\n", stats.merged));
    out.push_str(&format!("- copied: {}\n", stats.copied));
    out.push_str(&format!("- skipped: {}\n", stats.skipped));
    out.push_str(&format!("- failed: {}\n", stats.failed));
    if !stats.errors.is_empty() {
        out.push_str("\n## Errors\n\n");
        for e in &stats.errors {
            out.push_str(&format!("- {e}\n"));
        }
    }
    if !stats.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for w in &stats.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }
    out
}

/// Writes merged/copied files, `descriptor.mod`, the sibling `.mod` file,
/// and `README.md` under `output_dir`. `output_dir` must already exist and
/// be empty (the caller creates it fresh per §5's cancellation semantics).
pub fn write_patch(
    output_dir: &Path,
    mod_name: &str,
    version: &str,
    supported_version: &str,
    load_order: &[String],
    results: &[FileResult],
    stats: &RunStats,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    for result in results {
        let Some(content) = &result.content else { continue };
        if !matches!(result.outcome, FileOutcome::Merged | FileOutcome::CopiedVerbatim { .. }) {
            continue;
        }
        let dest = output_dir.join(&result.relative_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&dest, with_bom(content)).with_context(|| format!("writing {}", dest.display()))?;
    }

    let descriptor = descriptor_body(mod_name, version, supported_version, &[]);
    std::fs::write(output_dir.join("descriptor.mod"), with_bom(&descriptor))
        .context("writing descriptor.mod")?;

    let dir_name = output_dir.file_name().and_then(|n| n.to_str()).unwrap_or(mod_name);
    let sibling_name = format!("{}.mod", safe_name(mod_name));
    let sibling_path = output_dir
        .parent()
        .map(|p| p.join(&sibling_name))
        .unwrap_or_else(|| Path::new(&sibling_name).to_path_buf());
    let sibling_body = format!("{descriptor}path=\"mod/{dir_name}\"\n");
    std::fs::write(&sibling_path, with_bom(&sibling_body)).context("writing sibling .mod file")?;

    std::fs::write(output_dir.join("README.md"), readme_body(mod_name, stats, load_order))
        .context("writing README.md")?;

    Ok(())
}
