//! The position-preserving parse tree shared by the parser, merger, and serializer.

/// A 1-based line / 0-based character position, used by diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Tag distinguishing the role a [`Node`] plays in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The whole-file wrapper; its children are the top-level nodes in source order.
    Root,
    /// `name = { ... }`.
    Block,
    /// `name = value`.
    Property,
    /// A bare identifier inside a block, e.g. an item of `on_actions = { a b c }`.
    ListItem,
    /// An unrecognized line or a `#...` comment that is not a commented block.
    Comment,
    /// A blank line, preserved so unmodified subtrees round-trip exactly.
    EmptyLine,
}

/// A node of the parse tree. See `node.rs` module docs for field semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Identifier string. Empty for list items and comments.
    pub name: String,
    /// Scalar payload as raw text, including surrounding quotes if any.
    pub value: String,
    /// Only Block and Root carry children.
    pub children: Vec<Node>,
    /// Text of a `#...` fragment on the same line, or empty.
    pub trailing_comment: String,
    /// Whether the whole block was found prefixed with `#` in the source.
    pub is_commented: bool,
    /// The original first line of this node, used to round-trip unchanged nodes.
    pub raw_line: String,
    /// For Block/Root nodes, the full original source span (all lines) the node covers.
    /// Equal to `raw_line` for single-line nodes and inline blocks.
    pub raw_span: String,
    /// Leading-whitespace string of the opening line.
    pub indent: String,
    /// Set only on the Root node: true when the final brace-depth stack did not
    /// return to zero, i.e. the source had unbalanced braces.
    pub unbalanced_braces: bool,
    /// Marks a node produced or altered by the merger; such nodes are re-emitted
    /// canonically rather than via `raw_line`/`raw_span` passthrough.
    pub modified: bool,
    /// For Block nodes only: whether the block was written as a single-line
    /// `name = { ... }` form in the source (or was synthesized as one).
    pub inline: bool,
}

impl Node {
    pub fn root() -> Self {
        Self {
            kind: NodeKind::Root,
            name: String::new(),
            value: String::new(),
            children: Vec::new(),
            trailing_comment: String::new(),
            is_commented: false,
            raw_line: String::new(),
            raw_span: String::new(),
            indent: String::new(),
            unbalanced_braces: false,
            modified: false,
            inline: false,
        }
    }

    pub fn block(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Block,
            name: name.into(),
            ..Self::root()
        }
    }

    pub fn property(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Property,
            name: name.into(),
            value: value.into(),
            ..Self::root()
        }
    }

    pub fn list_item(value: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::ListItem,
            value: value.into(),
            ..Self::root()
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block)
    }

    /// Children with the given name, in source order. Block names may repeat
    /// (`if = {} if = {}`); callers that need positional matching should index
    /// into this slice rather than treat it as a set.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// The distinct child names, in first-seen order.
    pub fn child_names(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for child in &self.children {
            if (child.is_block() || child.kind == NodeKind::Property)
                && !seen.contains(&child.name.as_str()) {
                    seen.push(child.name.as_str());
                }
        }
        seen
    }

    /// List items carried directly by this block (for accumulate-list children).
    pub fn list_items(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter(|c| c.kind == NodeKind::ListItem)
            .map(|c| c.value.as_str())
            .collect()
    }
}
