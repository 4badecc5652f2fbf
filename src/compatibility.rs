//! Submod dependency sanity check, run once at orchestrator start: §7's
//! `IncompatibleModGraph` kind, grounded on `smart_merger.py`'s
//! `read_mod_dependencies` / `read_mod_name` / `validate_mod_compatibility`.
//! Reports, never blocks: a mismatched dependency is a warning in the run's
//! statistics record, not a reason to refuse the merge.

use anyhow::Result;
use std::path::Path;

/// Parses `dependencies = { "a" "b" }` out of a `descriptor.mod` body. No
/// braces in a dependency name in practice, so a plain balanced scan of the
/// first `dependencies = { ... }` block is sufficient.
pub fn read_mod_dependencies(descriptor_text: &str) -> Vec<String> {
    let Some(start) = descriptor_text.find("dependencies") else {
        return Vec::new();
    };
    let Some(open) = descriptor_text[start..].find('{') else {
        return Vec::new();
    };
    let open = start + open;
    let Some(close) = descriptor_text[open..].find('}') else {
        return Vec::new();
    };
    let body = &descriptor_text[open + 1..open + close];
    extract_quoted(body)
}

/// Parses `name = "..."` out of a `descriptor.mod` body, falling back to
/// `fallback` (typically the mod's directory name) when absent.
pub fn read_mod_name(descriptor_text: &str, fallback: &str) -> String {
    extract_field(descriptor_text, "name").unwrap_or_else(|| fallback.to_string())
}

fn extract_field(text: &str, key: &str) -> Option<String> {
    let idx = text.find(key)?;
    let rest = &text[idx + key.len()..];
    let eq = rest.find('=')?;
    extract_quoted(&rest[eq + 1..]).into_iter().next()
}

fn extract_quoted(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let chars = text.char_indices().peekable();
    for (i, c) in chars {
        if c == '"' {
            if let Some(end) = text[i + 1..].find('"') {
                out.push(text[i + 1..i + 1 + end].to_string());
            }
            break;
        }
    }
    out
}

/// One submod's descriptor, read from disk.
pub struct ModDescriptor {
    pub name: String,
    pub dependencies: Vec<String>,
}

pub fn load_descriptor(mod_path: &Path) -> Result<Option<ModDescriptor>> {
    let descriptor_path = mod_path.join("descriptor.mod");
    if !descriptor_path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&descriptor_path)?;
    let fallback = mod_path.file_name().and_then(|n| n.to_str()).unwrap_or("mod");
    Ok(Some(ModDescriptor {
        name: read_mod_name(&text, fallback),
        dependencies: read_mod_dependencies(&text),
    }))
}

/// Checks each submod's declared dependency against the chosen base. When
/// the base is vanilla, any declared dependency is an error (the submod
/// should have been chosen as the base instead). When the base is itself a
/// mod, a dependency that names neither the base nor is absent is a
/// warning; a submod declaring no dependency at all is also a (softer)
/// warning, since it may be a standalone mod rather than a compatibility
/// submod.
pub fn validate_mod_compatibility(
    base_name: &str,
    base_is_vanilla: bool,
    mods: &[ModDescriptor],
) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let base_lower = base_name.to_lowercase();

    for m in mods {
        if base_is_vanilla {
            if let Some(dep) = m.dependencies.first() {
                errors.push(format!(
                    "mod '{}' declares a dependency on '{dep}'; choose that mod as the base instead of vanilla",
                    m.name
                ));
            }
        } else if m.dependencies.is_empty() {
            warnings.push(format!(
                "mod '{}' declares no dependencies; it may be standalone rather than a compatibility submod",
                m.name
            ));
        } else {
            let matches = m
                .dependencies
                .iter()
                .any(|d| d.to_lowercase().contains(&base_lower) || base_lower.contains(&d.to_lowercase()));
            if !matches {
                let dep = &m.dependencies[0];
                warnings.push(format!(
                    "mod '{}' depends on '{dep}', but the chosen base is '{base_name}'; verify compatibility",
                    m.name
                ));
            }
        }
    }

    (errors, warnings)
}
