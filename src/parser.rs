//! Line-oriented parser for Paradox script: §4.1 implemented verbatim.
//!
//! Total on any UTF-8 input: malformed or unrecognized lines degrade to
//! [`NodeKind::Comment`] nodes rather than aborting the parse. The only
//! thing that can stop a run before it reaches the end of the file is the
//! iteration bound described below, which exists purely as a defense
//! against a bug turning this into an infinite loop — it is not expected to
//! ever trigger on real input.

use crate::node::{Node, NodeKind};

/// Result of parsing one file's text.
pub struct ParseResult {
    pub tree: Node,
    /// Whether the input began with a UTF-8 BOM; callers re-add it on output.
    pub had_bom: bool,
}

struct Frame {
    node: Node,
    start_line: usize,
}

/// `parse(text) -> Tree`. Never panics, never returns an error: a ParseError
/// at the library boundary is reserved for I/O/encoding failures that happen
/// before the text even reaches this function.
pub fn parse(text: &str) -> ParseResult {
    let had_bom = text.starts_with('\u{feff}');
    let stripped_bom = text.strip_prefix('\u{feff}').unwrap_or(text);
    let normalized = stripped_bom.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();
    // `split` yields a trailing "" for any text ending in '\n'; that's an
    // artifact of the split, not a blank line in the file.
    if normalized.ends_with('\n') {
        lines.pop();
    }

    let mut stack: Vec<Frame> = vec![Frame { node: Node::root(), start_line: 0 }];
    // Safety valve per §4.1: bounds the total number of line-processing
    // steps so a bug in the per-line logic can't spin forever. A single
    // forward pass over `lines` never approaches this.
    let iteration_bound = lines.len() + 64;
    let mut iterations = 0usize;

    for (line_idx, raw_line) in lines.iter().enumerate() {
        iterations += 1;
        if iterations > iteration_bound {
            break;
        }
        process_line(&mut stack, raw_line, line_idx, &lines);
    }

    let unbalanced = stack.len() > 1;
    while stack.len() > 1 {
        let frame = stack.pop().unwrap();
        let mut node = frame.node;
        node.raw_span = lines[frame.start_line..].join("\n");
        stack.last_mut().unwrap().node.children.push(node);
    }
    let mut root = stack.pop().unwrap().node;
    root.unbalanced_braces = unbalanced;
    root.raw_span = normalized;
    ParseResult { tree: root, had_bom }
}

fn split_indent(line: &str) -> (&str, &str) {
    let idx = line.find(|c: char| !(c == ' ' || c == '\t')).unwrap_or(line.len());
    line.split_at(idx)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b':'
}

/// `[A-Za-z0-9_][A-Za-z0-9_.:]*` at the start of `s`.
fn parse_identifier(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !is_ident_start(bytes[0]) {
        return None;
    }
    let mut end = 1;
    while end < bytes.len() && is_ident_continue(bytes[end]) {
        end += 1;
    }
    Some((&s[..end], &s[end..]))
}

/// One of `=, <, >, <=, >=, ?=`, all treated as the same assignment token.
fn parse_operator(s: &str) -> Option<(&'static str, &str)> {
    for op in ["<=", ">=", "?=", "=", "<", ">"] {
        if let Some(rest) = s.strip_prefix(op) {
            return Some((op, rest));
        }
    }
    None
}

/// `name <op> <rest>` where `<rest>` has had leading whitespace stripped.
fn try_match_assignment(s: &str) -> Option<(&str, &str)> {
    let (name, after_name) = parse_identifier(s)?;
    let after_name = after_name.trim_start();
    let (_op, after_op) = parse_operator(after_name)?;
    Some((name, after_op.trim_start()))
}

fn looks_like_block_open(s: &str) -> bool {
    matches!(try_match_assignment(s), Some((_, rest)) if rest.starts_with('{'))
}

/// Left-to-right scan toggling on unescaped `"`, returning the byte offset
/// of the first unquoted `#`, if any.
fn find_comment_start(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// `s` starts with `{`; returns the byte offset of its matching `}`,
/// quote-aware, ignoring `#` entirely (used only on text already scoped to
/// a single block-open site, where a literal `#` inside is either quoted or
/// part of an already-commented line).
fn find_matching_close_brace(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn take_scalar(s: &str) -> (&str, &str) {
    if let Some(rest) = s.strip_prefix('"') {
        if let Some(end) = rest.find('"') {
            return (&s[..end + 2], &s[end + 2..]);
        }
        return (s, "");
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// Tokenizes `{ a = 1 b c = { x y } }`'s interior by whitespace with
/// brace-depth tracking, recognizing `ident = ident`, `ident = { ... }`, and
/// bare `ident`.
fn parse_inline(content: &str) -> Vec<Node> {
    let mut out = Vec::new();
    let mut rest = content;
    let bound = content.len() + 16;
    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > bound {
            break;
        }
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let Some((name, after_name)) = parse_identifier(rest) else {
            // Unrecognized token; skip one character to guarantee progress.
            let mut chars = rest.chars();
            chars.next();
            rest = chars.as_str();
            continue;
        };
        let after_name_trimmed = after_name.trim_start();
        if let Some((_op, after_op)) = parse_operator(after_name_trimmed) {
            let after_op_trimmed = after_op.trim_start();
            if after_op_trimmed.starts_with('{') {
                if let Some(close_idx) = find_matching_close_brace(after_op_trimmed) {
                    let inner = &after_op_trimmed[1..close_idx];
                    let mut node = Node::block(name);
                    node.children = parse_inline(inner);
                    node.inline = true;
                    node.value = format!("{{ {} }}", inner.trim());
                    out.push(node);
                    rest = &after_op_trimmed[close_idx + 1..];
                    continue;
                }
                break;
            }
            let (value, after_value) = take_scalar(after_op_trimmed);
            out.push(Node::property(name, value));
            rest = after_value;
        } else {
            out.push(Node::list_item(name));
            rest = after_name;
        }
    }
    out
}

fn process_line(stack: &mut Vec<Frame>, raw_line: &str, line_idx: usize, lines: &[&str]) {
    let (indent, stripped) = split_indent(raw_line);
    if stripped.trim_end().is_empty() {
        let mut node = Node::root();
        node.kind = NodeKind::EmptyLine;
        node.raw_line = raw_line.to_string();
        stack.last_mut().unwrap().node.children.push(node);
        return;
    }

    let top_is_commented = stack.last().unwrap().node.is_commented;
    let (content, commented_here): (&str, bool) = if top_is_commented {
        (stripped.strip_prefix('#').unwrap_or(stripped).trim_start(), true)
    } else if let Some(rest) = stripped.strip_prefix('#') {
        let rest_trim = rest.trim_start();
        if looks_like_block_open(rest_trim) {
            (rest_trim, true)
        } else {
            let mut node = Node::root();
            node.kind = NodeKind::Comment;
            node.raw_line = raw_line.to_string();
            stack.last_mut().unwrap().node.children.push(node);
            return;
        }
    } else {
        (stripped, false)
    };

    let mut remainder = content;
    let close_bound = remainder.len() + 8;
    let mut close_iterations = 0;
    while remainder.trim_start().starts_with('}') {
        close_iterations += 1;
        if close_iterations > close_bound || stack.len() <= 1 {
            break;
        }
        remainder = &remainder.trim_start()[1..];
        let frame = stack.pop().unwrap();
        let mut node = frame.node;
        node.raw_span = lines[frame.start_line..=line_idx].join("\n");
        stack.last_mut().unwrap().node.children.push(node);
    }
    if remainder.trim().is_empty() {
        return;
    }

    let (active, trailing_comment): (&str, String) = if commented_here {
        (remainder, String::new())
    } else {
        match find_comment_start(remainder) {
            Some(idx) => (remainder[..idx].trim_end(), remainder[idx..].to_string()),
            None => (remainder.trim_end(), String::new()),
        }
    };

    if let Some((name, after_op)) = try_match_assignment(active) {
        if after_op.starts_with('{') {
            if let Some(close_idx) = find_matching_close_brace(after_op) {
                let inner = &after_op[1..close_idx];
                let tail = &after_op[close_idx + 1..];
                let inline_trailing = if !commented_here {
                    match find_comment_start(tail) {
                        Some(idx) => tail[idx..].to_string(),
                        None => trailing_comment,
                    }
                } else {
                    String::new()
                };
                let mut node = Node::block(name);
                node.children = parse_inline(inner);
                node.inline = true;
                node.is_commented = commented_here;
                node.raw_line = raw_line.to_string();
                node.raw_span = raw_line.to_string();
                node.indent = indent.to_string();
                node.trailing_comment = inline_trailing;
                stack.last_mut().unwrap().node.children.push(node);
                return;
            }
            let mut node = Node::block(name);
            node.is_commented = commented_here;
            node.raw_line = raw_line.to_string();
            node.indent = indent.to_string();
            stack.push(Frame { node, start_line: line_idx });
            return;
        }
        let mut node = Node::property(name, after_op);
        node.is_commented = commented_here;
        node.raw_line = raw_line.to_string();
        node.raw_span = raw_line.to_string();
        node.indent = indent.to_string();
        node.trailing_comment = trailing_comment;
        stack.last_mut().unwrap().node.children.push(node);
        return;
    }

    if let Some((ident, rest)) = parse_identifier(active)
        && rest.trim().is_empty() {
            let mut node = Node::list_item(ident);
            node.is_commented = commented_here;
            node.raw_line = raw_line.to_string();
            node.raw_span = raw_line.to_string();
            node.indent = indent.to_string();
            node.trailing_comment = trailing_comment;
            stack.last_mut().unwrap().node.children.push(node);
            return;
        }

    let mut node = Node::root();
    node.kind = NodeKind::Comment;
    node.raw_line = raw_line.to_string();
    stack.last_mut().unwrap().node.children.push(node);
}
