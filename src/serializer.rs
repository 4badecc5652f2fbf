//! Renders a (possibly modified) tree back to text: §4.2.
//!
//! Untouched subtrees round-trip via `raw_line`/`raw_span` passthrough.
//! Nodes the merger marks `modified` are re-emitted in canonical form:
//! `<indent><name> = <value><space><trailing_comment?>` for scalars, and
//! opener/closer on their own line with children indented one tab deeper
//! for blocks — unless the node says it should stay inline.

use crate::node::{Node, NodeKind};

/// `serialize(tree) -> text`. For any unmodified subtree this equals the
/// concatenation of its nodes' `raw_line` values, modulo one trailing `\n`.
pub fn serialize(tree: &Node) -> String {
    let mut out = String::new();
    for child in &tree.children {
        serialize_node(child, 0, &mut out);
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Renders a single node (and its subtree) at the given tab depth. Used by
/// the merger to produce the replacement text for a spliced-in subtree
/// without re-serializing the whole file.
pub fn render_node(node: &Node, depth: usize) -> String {
    let mut out = String::new();
    serialize_node(node, depth, &mut out);
    out
}

fn indent_of(depth: usize) -> String {
    "\t".repeat(depth)
}

fn serialize_node(node: &Node, depth: usize, out: &mut String) {
    match node.kind {
        NodeKind::EmptyLine => out.push('\n'),
        NodeKind::Comment => {
            out.push_str(&node.raw_line);
            out.push('\n');
        }
        NodeKind::ListItem => {
            if node.modified {
                out.push_str(&indent_of(depth));
                out.push_str(&node.value);
                push_trailing(node, out);
                out.push('\n');
            } else {
                out.push_str(&node.raw_line);
                out.push('\n');
            }
        }
        NodeKind::Property => {
            if node.modified {
                out.push_str(&indent_of(depth));
                out.push_str(&node.name);
                out.push_str(" = ");
                out.push_str(&node.value);
                push_trailing(node, out);
                out.push('\n');
            } else {
                out.push_str(&node.raw_line);
                out.push('\n');
            }
        }
        NodeKind::Block | NodeKind::Root => serialize_block(node, depth, out),
    }
}

fn push_trailing(node: &Node, out: &mut String) {
    if !node.trailing_comment.is_empty() {
        out.push(' ');
        out.push_str(&node.trailing_comment);
    }
}

fn serialize_block(node: &Node, depth: usize, out: &mut String) {
    if !node.modified {
        out.push_str(&node.raw_span);
        if !node.raw_span.ends_with('\n') {
            out.push('\n');
        }
        return;
    }
    let indent = indent_of(depth);
    let prefix = if node.is_commented { "#" } else { "" };
    if node.inline {
        out.push_str(&indent);
        out.push_str(prefix);
        out.push_str(&node.name);
        out.push_str(" = { ");
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            serialize_inline_child(child, out);
        }
        out.push_str(" }");
        push_trailing(node, out);
        out.push('\n');
        return;
    }
    out.push_str(&indent);
    out.push_str(prefix);
    out.push_str(&node.name);
    out.push_str(" = {\n");
    for child in &node.children {
        serialize_node(child, depth + 1, out);
    }
    out.push_str(&indent);
    out.push_str(prefix);
    out.push_str("}\n");
}

fn serialize_inline_child(node: &Node, out: &mut String) {
    match node.kind {
        NodeKind::Property => {
            out.push_str(&node.name);
            out.push_str(" = ");
            out.push_str(&node.value);
        }
        NodeKind::ListItem => out.push_str(&node.value),
        NodeKind::Block => {
            out.push_str(&node.name);
            out.push_str(" = { ");
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                serialize_inline_child(child, out);
            }
            out.push_str(" }");
        }
        _ => {}
    }
}
