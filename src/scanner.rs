//! Filesystem walk over an ordered list of submod directories: §1 treats
//! this as an external collaborator specified only through its interface,
//! and §6's exclusion lists are implemented bit-for-bit here.
//!
//! Does no merging and holds no rule-book knowledge; it only tells the
//! orchestrator which relative paths exist, which submods ship each one,
//! and whether a submod's copy is byte-equal to the base modulo
//! normalization.

use crate::merger::normalize;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const IGNORED_FOLDERS: &[&str] = &[
    "fonts",
    "music",
    "sound",
    "tools",
    "dlc",
    "dlc_metadata",
    "localization",
    "map_data",
    "content_source",
    "portraits",
    "coat_of_arms",
];

const IGNORED_EXTENSIONS: &[&str] = &[
    "dds", "png", "jpg", "jpeg", "tga", "bmp", "wav", "ogg", "mp3", "ttf", "otf", "fnt", "yml",
];

pub const MERGEABLE_EXTENSIONS: &[&str] = &["txt", "gui", "gfx"];

pub const MERGEABLE_TOP_FOLDERS: &[&str] = &[
    "common",
    "events",
    "history",
    "decisions",
    "gui",
    "interface",
    "gfx",
    "scripted_triggers",
    "scripted_effects",
    "on_actions",
];

/// A relative path is excluded if any path segment names an ignored folder,
/// its extension is an ignored binary/localization extension, or it is the
/// mod's own `descriptor.mod`.
pub fn is_excluded(relative_path: &Path) -> bool {
    if relative_path.file_name().and_then(|n| n.to_str()) == Some("descriptor.mod") {
        return true;
    }
    if relative_path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|segment| IGNORED_FOLDERS.contains(&segment))
    {
        return true;
    }
    if let Some(ext) = relative_path.extension().and_then(|e| e.to_str())
        && IGNORED_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            return true;
        }
    false
}

/// Whether `relative_path`'s extension and top folder are both in the
/// mergeable set of §6.
pub fn is_mergeable(relative_path: &Path) -> bool {
    let ext_ok = relative_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| MERGEABLE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false);
    let top_ok = relative_path
        .components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .map(|top| MERGEABLE_TOP_FOLDERS.contains(&top))
        .unwrap_or(false);
    ext_ok && top_ok
}

#[derive(Debug, Clone)]
pub struct PathContribution {
    pub mod_index: usize,
    pub content: String,
    /// True when this submod's normalized content equals the base's.
    pub unchanged: bool,
}

#[derive(Debug, Clone)]
pub struct ScannedPath {
    pub relative_path: String,
    pub base_has_file: bool,
    pub contributions: Vec<PathContribution>,
}

fn walk_relative_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_exclude(false)
        .git_global(false)
        .ignore(false)
        .build();
    for entry in walker {
        let entry = entry.context("walking submod directory")?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && let Ok(relative) = entry.path().strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
    }
    Ok(out)
}

/// Walks `submods` (in priority order) against `base_dir`, returning one
/// `ScannedPath` per relative path that appears in at least one submod and
/// survives the exclusion list.
pub fn scan(base_dir: &Path, submods: &[PathBuf]) -> Result<Vec<ScannedPath>> {
    let mut by_path: Vec<ScannedPath> = Vec::new();

    for (mod_index, mod_dir) in submods.iter().enumerate() {
        for relative in walk_relative_files(mod_dir)? {
            if is_excluded(&relative) {
                continue;
            }
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            let mod_path = mod_dir.join(&relative);
            let content = std::fs::read_to_string(&mod_path)
                .with_context(|| format!("reading {}", mod_path.display()))?;

            let base_path = base_dir.join(&relative);
            let base_has_file = base_path.exists();
            let unchanged = if base_has_file {
                let base_content = std::fs::read_to_string(&base_path)
                    .with_context(|| format!("reading {}", base_path.display()))?;
                normalize(&content) == normalize(&base_content)
            } else {
                false
            };

            let entry = match by_path.iter_mut().find(|p| p.relative_path == relative_str) {
                Some(e) => e,
                None => {
                    by_path.push(ScannedPath {
                        relative_path: relative_str.clone(),
                        base_has_file,
                        contributions: Vec::new(),
                    });
                    by_path.last_mut().unwrap()
                }
            };
            entry.contributions.push(PathContribution { mod_index, content, unchanged });
        }
    }

    Ok(by_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_folder_segment_is_excluded() {
        assert!(is_excluded(Path::new("localization/english/strings.yml")));
        assert!(is_excluded(Path::new("music/theme.ogg")));
    }

    #[test]
    fn ignored_extension_is_excluded() {
        assert!(is_excluded(Path::new("gfx/portraits/face.dds")));
    }

    #[test]
    fn descriptor_mod_is_excluded() {
        assert!(is_excluded(Path::new("descriptor.mod")));
    }

    #[test]
    fn ordinary_script_file_is_not_excluded() {
        assert!(!is_excluded(Path::new("common/on_action/00_on_actions.txt")));
    }

    #[test]
    fn mergeable_checks_both_extension_and_top_folder() {
        assert!(is_mergeable(Path::new("events/my_events.txt")));
        assert!(is_mergeable(Path::new("history/province.txt")));
        assert!(!is_mergeable(Path::new("gfx/models/thing.asset")));
        assert!(!is_mergeable(Path::new("music/theme.txt")));
    }

    #[test]
    fn scan_reports_contributions_and_base_presence() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let mod_a = dir.path().join("mod_a");
        std::fs::create_dir_all(base.join("common")).unwrap();
        std::fs::create_dir_all(mod_a.join("common")).unwrap();
        std::fs::write(base.join("common/x.txt"), "a = 1\n").unwrap();
        std::fs::write(mod_a.join("common/x.txt"), "a = 2\n").unwrap();
        std::fs::write(mod_a.join("common/y.txt"), "b = 1\n").unwrap();

        let result = scan(&base, std::slice::from_ref(&mod_a)).unwrap();
        let x = result.iter().find(|p| p.relative_path == "common/x.txt").unwrap();
        assert!(x.base_has_file);
        assert!(!x.contributions[0].unchanged);

        let y = result.iter().find(|p| p.relative_path == "common/y.txt").unwrap();
        assert!(!y.base_has_file);
    }
}
