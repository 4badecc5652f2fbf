//! Post-merge checks: §4.5. Brace balance is a hard error (downgrades the
//! file to verbatim-copy fallback); duplicate events are a hard error;
//! event well-formedness is a warning only.

use crate::node::Node;
use crate::rule_book;

#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Counts `{`/`}` outside `#`-comments outside quoted strings, per line
/// (quote state does not carry across lines in this grammar).
pub fn count_braces(text: &str) -> (usize, usize) {
    let mut open = 0usize;
    let mut close = 0usize;
    for line in text.lines() {
        let mut in_quotes = false;
        for c in line.chars() {
            match c {
                '"' => in_quotes = !in_quotes,
                '#' if !in_quotes => break,
                '{' if !in_quotes => open += 1,
                '}' if !in_quotes => close += 1,
                _ => {}
            }
        }
    }
    (open, close)
}

pub fn validate(tree: &Node, merged_text: &str, file_path: &str) -> ValidationResult {
    let mut result = ValidationResult::default();

    let (open, close) = count_braces(merged_text);
    if open != close {
        result
            .errors
            .push(format!("unbalanced braces: {open} open vs {close} close"));
    }

    let mut seen_events = std::collections::HashSet::new();
    for child in &tree.children {
        if child.is_block() && rule_book::is_event_name(&child.name) && !seen_events.insert(child.name.clone()) {
            result.errors.push(format!("duplicate event block: {}", child.name));
        }
    }

    if file_path.split(['/', '\\']).any(|s| s == "events") {
        for child in &tree.children {
            if !child.is_block() || !rule_book::is_event_name(&child.name) {
                continue;
            }
            let has_option = child.children_named("option").next().is_some();
            let has_type = child.children_named("type").next().is_some();
            if !has_option || !has_type {
                result
                    .warnings
                    .push(format!("event {} is missing an option or a type", child.name));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn balanced_text_has_equal_counts() {
        assert_eq!(count_braces("a = {\n\tb = 1\n}\n"), (1, 1));
    }

    #[test]
    fn brace_inside_comment_is_ignored() {
        assert_eq!(count_braces("a = 1 # what about { this }\n"), (0, 0));
    }

    #[test]
    fn brace_inside_quotes_is_not_counted() {
        assert_eq!(count_braces("tooltip = \"a { b }\"\n"), (0, 0));
    }

    #[test]
    fn unbalanced_merged_text_is_an_error() {
        let tree = parse("a = {\n\tb = 1\n}\n").tree;
        let result = validate(&tree, "a = {\n\tb = 1\n", "common/foo.txt");
        assert!(!result.is_ok());
    }

    #[test]
    fn duplicate_top_level_event_is_an_error() {
        let text = "europe.0001 = {\n\ttype = x\n}\neurope.0001 = {\n\ttype = y\n}\n";
        let tree = parse(text).tree;
        let result = validate(&tree, text, "events/test.txt");
        assert!(result.errors.iter().any(|e| e.contains("duplicate event")));
    }

    #[test]
    fn event_missing_option_and_type_warns_under_events_path() {
        let text = "europe.0001 = {\n\tdesc = x\n}\n";
        let tree = parse(text).tree;
        let result = validate(&tree, text, "events/test.txt");
        assert!(result.is_ok());
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn event_well_formedness_is_not_checked_outside_events_path() {
        let text = "europe.0001 = {\n\tdesc = x\n}\n";
        let tree = parse(text).tree;
        let result = validate(&tree, text, "common/foo.txt");
        assert!(result.warnings.is_empty());
    }
}
