//! crates/course_highlights_core/src/compositor.rs
//!
//! Lays a set of highlights over a field's text and yields the runs of plain
//! and highlighted text a renderer needs.
//!
//! Highlights are walked in `start_offset` order with a single cursor. Nothing
//! is merged: overlapping highlights each produce their own segment, so the
//! rendered output can repeat characters. Out-of-range offsets are clamped to
//! the text; an inverted range selects the text between its two offsets.

use crate::domain::Highlight;
use uuid::Uuid;

/// One contiguous run of rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain {
        text: &'a str,
    },
    Highlighted {
        text: &'a str,
        color: &'a str,
        id: Uuid,
    },
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Plain { text } | Segment::Highlighted { text, .. } => *text,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        matches!(self, Segment::Highlighted { .. })
    }

    /// The id of the highlight this run came from, for dereferencing (e.g. deletion).
    pub fn highlight_id(&self) -> Option<Uuid> {
        match self {
            Segment::Plain { .. } => None,
            Segment::Highlighted { id, .. } => Some(*id),
        }
    }
}

/// Lazily produces the segments for one field. Built by [`composite`].
#[derive(Debug)]
pub struct Segments<'a> {
    text: &'a str,
    // Byte position of every char, followed by `text.len()`.
    boundaries: Vec<usize>,
    sorted: std::vec::IntoIter<&'a Highlight>,
    cursor: usize,
    pending: Option<Segment<'a>>,
    whole_text: bool,
    finished: bool,
}

/// Composites `highlights` over `text`.
///
/// Empty text or an empty highlight set yields exactly one plain segment
/// holding the whole text. Highlights sharing a `start_offset` keep their
/// input order.
pub fn composite<'a, I>(text: &'a str, highlights: I) -> Segments<'a>
where
    I: IntoIterator<Item = &'a Highlight>,
{
    let mut sorted: Vec<&'a Highlight> = if text.is_empty() {
        Vec::new()
    } else {
        highlights.into_iter().collect()
    };
    // `sort_by_key` is stable, which keeps equal starts in input order.
    sorted.sort_by_key(|h| h.start_offset);

    let boundaries = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    Segments {
        text,
        boundaries,
        whole_text: sorted.is_empty(),
        sorted: sorted.into_iter(),
        cursor: 0,
        pending: None,
        finished: false,
    }
}

impl<'a> Segments<'a> {
    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Characters `[a, b)` of the text, with both ends clamped and swapped if inverted.
    fn slice(&self, a: usize, b: usize) -> &'a str {
        let (lo, hi) = if b < a { (b, a) } else { (a, b) };
        let len = self.char_len();
        let text = self.text;
        &text[self.boundaries[lo.min(len)]..self.boundaries[hi.min(len)]]
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }
        if self.finished {
            return None;
        }

        match self.sorted.next() {
            Some(h) => {
                let gap = (h.start_offset > self.cursor).then(|| Segment::Plain {
                    text: self.slice(self.cursor, h.start_offset),
                });
                let highlighted = Segment::Highlighted {
                    text: self.slice(h.start_offset, h.end_offset),
                    color: h.color.as_str(),
                    id: h.id,
                };
                self.cursor = h.end_offset;

                match gap {
                    Some(plain) => {
                        self.pending = Some(highlighted);
                        Some(plain)
                    }
                    None => Some(highlighted),
                }
            }
            None => {
                self.finished = true;
                let len = self.char_len();
                (self.whole_text || self.cursor < len).then(|| Segment::Plain {
                    text: self.slice(self.cursor, len),
                })
            }
        }
    }
}

/// Concatenates the text of every segment, in order.
pub fn render_plain<'a>(segments: impl IntoIterator<Item = Segment<'a>>) -> String {
    segments.into_iter().map(|s| s.text()).collect()
}
