//! Structural three-way merger: §4.4. Rewrites are implemented as
//! find-first-occurrence text splicing against each block's full `raw_span`,
//! walked outer-to-inner so substitutions never collide; the only content
//! actually synthesized from scratch (via the serializer) is a rewritten
//! accumulate-list child and newly inserted children, everything else is a
//! literal substring substitution of one mod's own raw text.

use crate::node::{Node, NodeKind};
use crate::parser;
use crate::rule_book::{self, ChildStrategy, TopLevelStrategy};
use crate::serializer;

#[derive(Debug, Default, Clone, Copy)]
pub struct MergeStats {
    pub added_unique_blocks: usize,
    pub replaced_atomic_blocks: usize,
    pub skipped_unsafe_children: usize,
}

pub struct MergeOutcome {
    pub text: String,
    pub stats: MergeStats,
}

/// Comment- and whitespace-stripped canonical form, used only for equality
/// testing (never for output): §4.4 Normalization.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut in_quotes = false;
        for c in line.chars() {
            if c == '#' && !in_quotes {
                break;
            }
            if c == '"' {
                in_quotes = !in_quotes;
            }
            if !c.is_whitespace() {
                out.push(c);
            }
        }
    }
    out
}

fn splice_first(haystack: &str, needle: &str, replacement: &str) -> Option<String> {
    if needle.is_empty() || !haystack.contains(needle) {
        return None;
    }
    Some(haystack.replacen(needle, replacement, 1))
}

/// Inserts `addition` as new line(s) just before the span's own closing
/// brace (its last `}`), which is always the span's *outer* closer since
/// `text` is scoped to exactly one block's raw_span.
fn insert_before_closing_brace(text: &str, addition: &str) -> String {
    match text.rfind('}') {
        Some(pos) => {
            let mut out = String::with_capacity(text.len() + addition.len() + 2);
            out.push_str(&text[..pos]);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(addition.trim_end());
            out.push('\n');
            out.push_str(&text[pos..]);
            out
        }
        None => {
            let mut out = text.to_string();
            out.push('\n');
            out.push_str(addition);
            out
        }
    }
}

fn group_top_level_blocks(children: &[Node]) -> Vec<(String, Vec<&Node>)> {
    let mut groups: Vec<(String, Vec<&Node>)> = Vec::new();
    for child in children {
        if !child.is_block() {
            continue;
        }
        match groups.iter_mut().find(|(n, _)| n == &child.name) {
            Some(entry) => entry.1.push(child),
            None => groups.push((child.name.clone(), vec![child])),
        }
    }
    groups
}

fn group_children_by_name(children: &[Node]) -> Vec<(String, Vec<&Node>)> {
    let mut groups: Vec<(String, Vec<&Node>)> = Vec::new();
    for child in children {
        if !matches!(child.kind, NodeKind::Block | NodeKind::Property) {
            continue;
        }
        match groups.iter_mut().find(|(n, _)| n == &child.name) {
            Some(entry) => entry.1.push(child),
            None => groups.push((child.name.clone(), vec![child])),
        }
    }
    groups
}

fn top_level_child_at<'a>(tree: &'a Node, name: &str, idx: usize) -> Option<&'a Node> {
    tree.children.iter().filter(|c| c.is_block() && c.name == name).nth(idx)
}

fn child_at<'a>(parent: &'a Node, name: &str, idx: usize) -> Option<&'a Node> {
    parent
        .children
        .iter()
        .filter(|c| matches!(c.kind, NodeKind::Block | NodeKind::Property) && c.name == name)
        .nth(idx)
}

fn collect_matching<'a>(
    mod_parents: &[(&'a str, &'a Node)],
    name: &str,
    idx: usize,
) -> Vec<(&'a str, &'a Node)> {
    mod_parents
        .iter()
        .filter_map(|(mod_name, parent)| child_at(parent, name, idx).map(|c| (*mod_name, c)))
        .collect()
}

/// `merge(base_text, [(mod_name, mod_text)], file_path) -> merged_text`.
/// `mods` must be given in ascending priority (last wins among equals).
pub fn merge(base_text: &str, mods: &[(String, String)], file_path: &str) -> MergeOutcome {
    merge_impl(base_text, mods, file_path, false)
}

/// The `--strategy priority` thin wrapper (§6 Open Question): every
/// top-level container is treated as AtomicAccumulate regardless of the
/// rule book, so no container ever recurses.
pub fn merge_priority_only(base_text: &str, mods: &[(String, String)], file_path: &str) -> MergeOutcome {
    merge_impl(base_text, mods, file_path, true)
}

fn merge_impl(base_text: &str, mods: &[(String, String)], file_path: &str, force_atomic: bool) -> MergeOutcome {
    let base_tree = parser::parse(base_text).tree;
    let mod_trees: Vec<(String, Node)> =
        mods.iter().map(|(name, text)| (name.clone(), parser::parse(text).tree)).collect();
    let mod_refs: Vec<(&str, &Node)> = mod_trees.iter().map(|(n, t)| (n.as_str(), t)).collect();

    let mut working = base_text.to_string();
    let mut stats = MergeStats::default();
    let base_groups = group_top_level_blocks(&base_tree.children);

    for (name, base_nodes) in &base_groups {
        for (idx, base_node) in base_nodes.iter().enumerate() {
            let changed: Vec<(&str, &Node)> = mod_refs
                .iter()
                .filter_map(|(mod_name, tree)| top_level_child_at(tree, name, idx).map(|n| (*mod_name, n)))
                .filter(|(_, m)| normalize(&m.raw_span) != normalize(&base_node.raw_span))
                .collect();
            if changed.is_empty() {
                continue;
            }

            let strategy = if force_atomic {
                TopLevelStrategy::AtomicAccumulate
            } else {
                rule_book::top_level_strategy(name, file_path)
            };
            match strategy {
                TopLevelStrategy::AtomicAccumulate => {
                    let winner = changed.last().unwrap().1;
                    if let Some(spliced) = splice_first(&working, &base_node.raw_span, &winner.raw_span) {
                        working = spliced;
                        stats.replaced_atomic_blocks += 1;
                    }
                }
                TopLevelStrategy::MergeableContainer => {
                    let new_text = deep_merge_block(base_node, &changed, &mut stats);
                    if let Some(spliced) = splice_first(&working, &base_node.raw_span, &new_text) {
                        working = spliced;
                    }
                }
            }
        }
    }

    let mut appended: std::collections::HashSet<(String, usize)> = Default::default();
    for (_, tree) in &mod_refs {
        let mod_groups = group_top_level_blocks(&tree.children);
        for (name, mod_nodes) in &mod_groups {
            let base_count = base_groups.iter().find(|(n, _)| n == name).map(|(_, v)| v.len()).unwrap_or(0);
            for (idx, mod_node) in mod_nodes.iter().enumerate() {
                if idx < base_count {
                    continue;
                }
                let key = (name.clone(), idx);
                if !appended.insert(key) {
                    continue;
                }
                if !working.ends_with('\n') {
                    working.push('\n');
                }
                working.push('\n');
                working.push_str(mod_node.raw_span.trim_end());
                working.push('\n');
                stats.added_unique_blocks += 1;
            }
        }
    }

    MergeOutcome { text: working, stats }
}

/// Recursively merges a container block's text, returning its new full
/// `raw_span`-equivalent text (to be spliced into the caller's buffer).
fn deep_merge_block(base: &Node, changed_mods: &[(&str, &Node)], stats: &mut MergeStats) -> String {
    if rule_book::is_gui_container_name(&base.name) {
        return merge_gui_container_text(base, changed_mods);
    }

    let mut text = base.raw_span.clone();
    let base_groups = group_children_by_name(&base.children);

    for (name, base_nodes) in &base_groups {
        for (idx, base_child) in base_nodes.iter().enumerate() {
            let matching = collect_matching(changed_mods, name, idx);
            if matching.is_empty() {
                continue;
            }
            match rule_book::child_strategy(name, &base.name) {
                ChildStrategy::AccumulateList => {
                    if let Some(new_text) = render_accumulate_list(base_child, &matching)
                        && let Some(spliced) = splice_first(&text, &base_child.raw_span, &new_text) {
                            text = spliced;
                        }
                }
                ChildStrategy::Recursive => {
                    let new_text = deep_merge_block(base_child, &matching, stats);
                    if let Some(spliced) = splice_first(&text, &base_child.raw_span, &new_text) {
                        text = spliced;
                    }
                }
                ChildStrategy::ReplaceWhole => {
                    let base_norm = normalize(&base_child.raw_span);
                    if let Some((_, winner)) =
                        matching.iter().rev().find(|(_, m)| normalize(&m.raw_span) != base_norm)
                        && let Some(spliced) = splice_first(&text, &base_child.raw_span, &winner.raw_span) {
                            text = spliced;
                        }
                }
            }
        }
    }

    let base_depth = base.indent.matches('\t').count();
    let mut additions: Vec<String> = Vec::new();
    for (_, mod_parent) in changed_mods {
        let mod_groups = group_children_by_name(&mod_parent.children);
        for (name, mod_children) in &mod_groups {
            let base_count = base_groups.iter().find(|(n, _)| n == name).map(|(_, v)| v.len()).unwrap_or(0);
            for (idx, mod_child) in mod_children.iter().enumerate() {
                if idx < base_count {
                    continue;
                }
                if !rule_book::is_safe_to_add_child(name, &base.name) {
                    stats.skipped_unsafe_children += 1;
                    continue;
                }
                let mut new_child = (*mod_child).clone();
                new_child.modified = true;
                additions.push(serializer::render_node(&new_child, base_depth + 1));
            }
        }
    }
    if !additions.is_empty() {
        text = insert_before_closing_brace(&text, &additions.join(""));
    }

    text
}

fn render_accumulate_list(base_child: &Node, matching: &[(&str, &Node)]) -> Option<String> {
    let mut items: Vec<String> = base_child.list_items().into_iter().map(str::to_string).collect();
    let mut changed = false;
    for (_, mod_child) in matching {
        for item in mod_child.list_items() {
            if !items.iter().any(|existing| existing == item) {
                items.push(item.to_string());
                changed = true;
            }
        }
    }
    if !changed {
        return None;
    }
    let mut new_node = base_child.clone();
    new_node.modified = true;
    new_node.children = items
        .into_iter()
        .map(|v| {
            let mut n = Node::list_item(v);
            n.modified = true;
            n
        })
        .collect();
    let depth = base_child.indent.matches('\t').count();
    Some(serializer::render_node(&new_node, depth))
}

fn merge_gui_container_text(base: &Node, changed_mods: &[(&str, &Node)]) -> String {
    let mut text = base.raw_span.clone();
    let mut seen: Vec<String> = base.children.iter().filter(|c| c.is_block()).map(|c| normalize(&c.raw_span)).collect();
    let base_depth = base.indent.matches('\t').count();
    let mut additions = Vec::new();
    for (_, mod_parent) in changed_mods {
        for child in mod_parent.children.iter().filter(|c| c.is_block()) {
            let norm = normalize(&child.raw_span);
            if seen.contains(&norm) {
                continue;
            }
            seen.push(norm);
            let mut new_child = child.clone();
            new_child.modified = true;
            additions.push(serializer::render_node(&new_child, base_depth + 1));
        }
    }
    if !additions.is_empty() {
        text = insert_before_closing_brace(&text, &additions.join(""));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(name: &str, text: &str) -> (String, String) {
        (name.to_string(), text.to_string())
    }

    #[test]
    fn s1_accumulating_on_actions() {
        let base = "on_game_start = {\n\ton_actions = {\n\t\tvanilla_init\n\t}\n}\n";
        let mod_a = "on_game_start = {\n\ton_actions = {\n\t\tvanilla_init\n\t\tmodA_init\n\t}\n}\n";
        let mod_b = "on_game_start = {\n\ton_actions = {\n\t\tvanilla_init\n\t\tmodB_init\n\t}\n}\n";
        let outcome = merge(base, &[m("A", mod_a), m("B", mod_b)], "common/on_action/test.txt");
        let merged = parser::parse(&outcome.text).tree;
        let container = &merged.children[0];
        let list = &container.children[0];
        assert_eq!(list.list_items(), vec!["vanilla_init", "modA_init", "modB_init"]);
    }

    #[test]
    fn s2_atomic_event_replacement_is_last_mod_verbatim() {
        let base = "europe.0001 = {\n\ttype = character_event\n\ttitle = base_title\n\toption = { name = a }\n}\n";
        let mod_a = "europe.0001 = {\n\ttype = character_event\n\ttitle = modA_title\n\toption = { name = a }\n}\n";
        let mod_b = "europe.0001 = {\n\ttype = character_event\n\ttitle = base_title\n\toption = { name = b }\n}\n";
        let outcome = merge(base, &[m("A", mod_a), m("B", mod_b)], "events/test.txt");
        let merged = parser::parse(&outcome.text).tree;
        assert_eq!(merged.children.len(), 1);
        let event = &merged.children[0];
        assert_eq!(event.children_named("option").next().unwrap().raw_span, "\toption = { name = b }");
        assert_eq!(outcome.stats.replaced_atomic_blocks, 1);
    }

    #[test]
    fn s3_nested_recursive_container_mixes_replace_and_accumulate() {
        let base = "on_birth = {\n\teffect = {\n\t\tadd_trait = foo\n\t}\n\tevents = {\n\t\tbase.1\n\t}\n}\n";
        let mod_a = "on_birth = {\n\teffect = {\n\t\tadd_trait = foo\n\t}\n\tevents = {\n\t\tbase.1\n\t\tmodA.1\n\t}\n}\n";
        let mod_b = "on_birth = {\n\teffect = {\n\t\tset_culture = bar\n\t}\n\tevents = {\n\t\tbase.1\n\t\tmodB.1\n\t}\n}\n";
        let outcome = merge(base, &[m("A", mod_a), m("B", mod_b)], "common/on_action/test.txt");
        let merged = parser::parse(&outcome.text).tree;
        let on_birth = &merged.children[0];
        let effect = on_birth.children_named("effect").next().unwrap();
        assert_eq!(effect.children[0].name, "set_culture");
        let events = on_birth.children_named("events").next().unwrap();
        assert_eq!(events.list_items(), vec!["base.1", "modA.1", "modB.1"]);
    }

    #[test]
    fn s6_byte_identical_mod_contributes_nothing() {
        let base = "europe.0001 = {\n\ttype = character_event\n}\n";
        let outcome = merge(base, &[m("A", base)], "events/test.txt");
        assert_eq!(outcome.text, base);
        assert_eq!(outcome.stats.replaced_atomic_blocks, 0);
    }

    #[test]
    fn unique_blocks_from_different_mods_both_accumulate() {
        let base = "europe.0001 = {\n\ttype = character_event\n}\n";
        let mod_a = "europe.0002 = {\n\ttype = character_event\n}\n";
        let mod_b = "europe.0003 = {\n\ttype = character_event\n}\n";
        let outcome = merge(base, &[m("A", mod_a), m("B", mod_b)], "events/test.txt");
        let merged = parser::parse(&outcome.text).tree;
        assert_eq!(merged.child_names(), vec!["europe.0001", "europe.0002", "europe.0003"]);
        assert_eq!(outcome.stats.added_unique_blocks, 2);
    }

    #[test]
    fn appended_block_gets_exactly_one_blank_line_of_separation() {
        let base = "europe.0001 = {\n\ttype = character_event\n}\n";
        let mod_a = "europe.0002 = {\n\ttype = character_event\n}\n";
        let outcome = merge(base, &[m("A", mod_a)], "events/test.txt");
        assert_eq!(
            outcome.text,
            "europe.0001 = {\n\ttype = character_event\n}\n\neurope.0002 = {\n\ttype = character_event\n}\n"
        );
    }

    #[test]
    fn unsafe_new_child_under_a_recursive_container_is_skipped() {
        // The `on_action` path segment forces `my_hook` into MergeableContainer
        // even though its own name is unrecognized; a brand new child under it
        // with an equally unrecognized name has no safe merge strategy.
        let base = "my_hook = {\n\tevents = {\n\t\tbase.1\n\t}\n}\n";
        let mod_a = "my_hook = {\n\tevents = {\n\t\tbase.1\n\t}\n\tcustom_thing = yes\n}\n";
        let outcome = merge(base, &[m("A", mod_a)], "common/on_action/test.txt");
        let merged = parser::parse(&outcome.text).tree;
        let hook = &merged.children[0];
        assert!(hook.children_named("custom_thing").next().is_none());
        assert_eq!(outcome.stats.skipped_unsafe_children, 1);
    }

    #[test]
    fn uncommented_mod_version_replaces_commented_base_block() {
        let base = "#test.1 = {\n#\ttype = character_event\n#}\n";
        let mod_a = "test.1 = {\n\ttype = character_event\n\ttitle = modA_title\n}\n";
        let outcome = merge(base, &[m("A", mod_a)], "events/test.txt");
        let merged = parser::parse(&outcome.text).tree;
        assert_eq!(merged.children.len(), 1);
        assert!(!merged.children[0].is_commented);
        assert!(!merged.unbalanced_braces);
    }

    #[test]
    fn normalize_strips_comments_and_whitespace() {
        assert_eq!(normalize("a = 1 # comment\n"), "a=1");
        assert_eq!(normalize("a   =   1\n"), "a=1");
    }
}
