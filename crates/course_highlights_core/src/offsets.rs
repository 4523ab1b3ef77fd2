//! crates/course_highlights_core/src/offsets.rs
//!
//! Turns a text selection made on a rendered field into character offsets
//! relative to the field's full text.
//!
//! A rendered field is an ordered list of text nodes (one per segment, or a
//! single node for unhighlighted text). Offsets only depend on how many
//! characters precede the selection, never on how the text is split into
//! nodes, so they survive re-rendering as long as the text itself is unchanged.

use crate::compositor::Segment;

/// The text nodes that make up one rendered field, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedField {
    nodes: Vec<String>,
}

impl RenderedField {
    pub fn new(nodes: Vec<String>) -> Self {
        Self { nodes }
    }

    /// A field rendered as a single text node.
    pub fn plain(text: &str) -> Self {
        Self {
            nodes: vec![text.to_string()],
        }
    }

    /// One node per compositor segment.
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = Segment<'a>>) -> Self {
        Self {
            nodes: segments.into_iter().map(|s| s.text().to_string()).collect(),
        }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// The concatenated text content of every node.
    pub fn text(&self) -> String {
        self.nodes.concat()
    }
}

/// A point inside a rendered field: `offset` characters into node `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePosition {
    pub node: usize,
    pub offset: usize,
}

/// What the user selected: where the selection starts and the selected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: NodePosition,
    pub text: String,
}

/// A resolved `[start_offset, end_offset)` range plus the trimmed selected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Resolves `selection` against `root`.
///
/// The start offset is the number of characters between the beginning of the
/// root and the selection anchor; the end is the start plus the length of the
/// trimmed selected text. Returns `None` when the trimmed text is empty or the
/// anchor does not lie inside `root`.
pub fn resolve(root: &RenderedField, selection: &Selection) -> Option<ResolvedRange> {
    let selected = selection.text.trim();
    if selected.is_empty() {
        return None;
    }

    let NodePosition { node, offset } = selection.anchor;
    let anchor_node = root.nodes.get(node)?;
    if offset > anchor_node.chars().count() {
        return None;
    }

    let preceding: usize = root.nodes[..node].iter().map(|n| n.chars().count()).sum();
    let start_offset = preceding + offset;

    Some(ResolvedRange {
        text: selected.to_string(),
        start_offset,
        end_offset: start_offset + selected.chars().count(),
    })
}
