//! Rich-text collaborator interface and a small in-memory implementation.
//!
//! The engine never edits text itself. It needs exactly two things from the
//! text surface: wrap a selection in an addressable marker, and tell which
//! marker (if any) sits under a click. [`PlainTextSurface`] implements the
//! interface over paragraphs of plain runs and is what tests and the CLI
//! driver use.

use crate::annotations::HighlightId;
use crate::color::Color;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 100;

/// Text surface errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextSurfaceError {
    #[error("Selection is collapsed")]
    Collapsed,
    #[error("Selection spans blocks {0} and {1}")]
    SpansBlocks(usize, usize),
    #[error("Position out of bounds: block {block}, offset {offset}")]
    OutOfBounds { block: usize, offset: usize },
    #[error("Malformed body: {0}")]
    Malformed(String),
}

/// Result type for text surface operations.
pub type TextResult<T> = Result<T, TextSurfaceError>;

/// A caret position: block (paragraph) index and character offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TextPosition {
    pub block: usize,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// A live selection between two positions, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SelectionRange {
    pub anchor: TextPosition,
    pub focus: TextPosition,
}

impl SelectionRange {
    pub fn new(anchor: TextPosition, focus: TextPosition) -> Self {
        Self { anchor, focus }
    }

    /// Selection inside a single block.
    pub fn in_block(block: usize, start: usize, end: usize) -> Self {
        Self::new(TextPosition::new(block, start), TextPosition::new(block, end))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order.
    pub fn ordered(&self) -> (TextPosition, TextPosition) {
        if self.anchor <= self.focus {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }
}

/// Inline marker wrapped around highlighted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightMarker {
    pub id: HighlightId,
    pub color: Color,
}

/// The text-editing collaborator.
pub trait TextSurface {
    /// Wrap `range` in an inline marker tagged with `marker.id`.
    fn wrap_selection(
        &mut self,
        range: &SelectionRange,
        marker: &HighlightMarker,
    ) -> TextResult<()>;

    /// Marker under `position`, if any.
    fn hit_test_marker(&self, position: TextPosition) -> Option<HighlightId>;

    /// Undo the last text edit. Returns true if anything changed.
    ///
    /// Undoing a wrap removes the marker from the text only. The highlight
    /// and its comments stay in the annotation store but can no longer be
    /// reached by clicking; redo brings the marker back.
    fn undo(&mut self) -> bool;

    /// Redo the last undone text edit. Returns true if anything changed.
    fn redo(&mut self) -> bool;

    /// Opaque serialized body.
    fn body(&self) -> String;

    /// Replace the whole body. Clears the text undo history.
    fn set_body(&mut self, body: &str) -> TextResult<()>;
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Run {
    text: String,
    marker: Option<HighlightMarker>,
}

impl Run {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), marker: None }
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

type Block = Vec<Run>;

/// Paragraphs of text runs, some of them wrapped in highlight markers.
#[derive(Debug, Clone)]
pub struct PlainTextSurface {
    blocks: Vec<Block>,
    undo_stack: Vec<Vec<Block>>,
    redo_stack: Vec<Vec<Block>>,
}

impl Default for PlainTextSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainTextSurface {
    /// Create a surface with one empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Vec::new()],
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Create a surface with the given paragraphs.
    pub fn from_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        let mut surface = Self::new();
        if !paragraphs.is_empty() {
            surface.blocks = paragraphs.iter().map(|p| vec![Run::plain(p.as_ref())]).collect();
        }
        surface.normalize();
        surface
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Plain text of one paragraph.
    pub fn block_text(&self, block: usize) -> Option<String> {
        self.blocks.get(block).map(|runs| runs.iter().map(|r| r.text.as_str()).collect())
    }

    /// Plain text of the whole body, paragraphs separated by newlines.
    pub fn text(&self) -> String {
        (0..self.blocks.len())
            .filter_map(|i| self.block_text(i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text currently wrapped by the marker `id`, concatenated in order.
    pub fn marked_text(&self, id: HighlightId) -> String {
        self.blocks
            .iter()
            .flatten()
            .filter(|run| run.marker.as_ref().is_some_and(|m| m.id == id))
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Selection covering the first occurrence of `needle`.
    pub fn find(&self, needle: &str) -> Option<SelectionRange> {
        if needle.is_empty() {
            return None;
        }
        (0..self.blocks.len()).find_map(|block| {
            let text = self.block_text(block)?;
            let byte_start = text.find(needle)?;
            let start = text[..byte_start].chars().count();
            Some(SelectionRange::in_block(block, start, start + needle.chars().count()))
        })
    }

    /// Insert `text` at `position`. Inserting at a marker's edge extends the
    /// run before the caret.
    pub fn insert_text(&mut self, position: TextPosition, text: &str) -> TextResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.check_position(position)?;
        self.push_undo();

        let runs = &mut self.blocks[position.block];
        if runs.is_empty() {
            runs.push(Run::plain(text));
            return Ok(());
        }
        let mut remaining = position.offset;
        for run in runs.iter_mut() {
            let len = run.char_len();
            if remaining <= len {
                let byte = byte_index(&run.text, remaining);
                run.text.insert_str(byte, text);
                return Ok(());
            }
            remaining -= len;
        }
        Ok(())
    }

    /// Append a new paragraph at the end. A surface holding only the
    /// initial empty paragraph has it filled instead.
    pub fn push_paragraph(&mut self, text: &str) {
        self.push_undo();
        match self.blocks.as_mut_slice() {
            [only] if only.is_empty() => *only = vec![Run::plain(text)],
            _ => self.blocks.push(vec![Run::plain(text)]),
        }
        self.normalize();
    }

    fn block_len(&self, block: usize) -> Option<usize> {
        self.blocks.get(block).map(|runs| runs.iter().map(Run::char_len).sum())
    }

    fn check_position(&self, position: TextPosition) -> TextResult<()> {
        match self.block_len(position.block) {
            Some(len) if position.offset <= len => Ok(()),
            _ => Err(TextSurfaceError::OutOfBounds {
                block: position.block,
                offset: position.offset,
            }),
        }
    }

    /// Ensure a run boundary at `offset`; returns the index of the run that
    /// starts there (or `runs.len()` at the end of the block).
    fn split_at(runs: &mut Block, offset: usize) -> usize {
        let mut start = 0;
        for i in 0..runs.len() {
            let len = runs[i].char_len();
            if offset == start {
                return i;
            }
            if offset < start + len {
                let byte = byte_index(&runs[i].text, offset - start);
                let tail = runs[i].text.split_off(byte);
                let marker = runs[i].marker.clone();
                runs.insert(i + 1, Run { text: tail, marker });
                return i + 1;
            }
            start += len;
        }
        runs.len()
    }

    /// Drop empty runs and merge neighbours carrying the same marker.
    fn normalize(&mut self) {
        for runs in &mut self.blocks {
            runs.retain(|r| !r.text.is_empty());
            let mut merged: Block = Vec::with_capacity(runs.len());
            for run in runs.drain(..) {
                match merged.last_mut() {
                    Some(last) if last.marker == run.marker => last.text.push_str(&run.text),
                    _ => merged.push(run),
                }
            }
            *runs = merged;
        }
    }

    /// Push current state to undo stack (call before making changes).
    fn push_undo(&mut self) {
        self.undo_stack.push(self.blocks.clone());
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }
}

impl TextSurface for PlainTextSurface {
    fn wrap_selection(
        &mut self,
        range: &SelectionRange,
        marker: &HighlightMarker,
    ) -> TextResult<()> {
        if range.is_collapsed() {
            return Err(TextSurfaceError::Collapsed);
        }
        let (start, end) = range.ordered();
        if start.block != end.block {
            return Err(TextSurfaceError::SpansBlocks(start.block, end.block));
        }
        self.check_position(start)?;
        self.check_position(end)?;
        self.push_undo();

        let runs = &mut self.blocks[start.block];
        let first = Self::split_at(runs, start.offset);
        let last = Self::split_at(runs, end.offset);
        for run in &mut runs[first..last] {
            run.marker = Some(marker.clone());
        }
        self.normalize();
        Ok(())
    }

    fn hit_test_marker(&self, position: TextPosition) -> Option<HighlightId> {
        let runs = self.blocks.get(position.block)?;
        let mut start = 0;
        for run in runs {
            let end = start + run.char_len();
            if position.offset >= start && position.offset < end {
                return run.marker.as_ref().map(|m| m.id);
            }
            start = end;
        }
        None
    }

    fn undo(&mut self) -> bool {
        if let Some(blocks) = self.undo_stack.pop() {
            let current = std::mem::replace(&mut self.blocks, blocks);
            self.redo_stack.push(current);
            true
        } else {
            false
        }
    }

    fn redo(&mut self) -> bool {
        if let Some(blocks) = self.redo_stack.pop() {
            let current = std::mem::replace(&mut self.blocks, blocks);
            self.undo_stack.push(current);
            true
        } else {
            false
        }
    }

    fn body(&self) -> String {
        let mut out = String::new();
        for runs in &self.blocks {
            out.push_str("<p>");
            for run in runs {
                match &run.marker {
                    Some(marker) => {
                        out.push_str(&format!(
                            "<mark data-highlight-id=\"{}\" style=\"background-color: {}\">",
                            marker.id, marker.color
                        ));
                        out.push_str(&escape(&run.text));
                        out.push_str("</mark>");
                    }
                    None => out.push_str(&escape(&run.text)),
                }
            }
            out.push_str("</p>");
        }
        out
    }

    fn set_body(&mut self, body: &str) -> TextResult<()> {
        let mut blocks = parse_body(body)?;
        if blocks.is_empty() {
            blocks.push(Vec::new());
        }
        self.blocks = blocks;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.normalize();
        Ok(())
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices().nth(char_offset).map_or(text.len(), |(i, _)| i)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Value of `name="..."` inside an opening tag.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let key = format!("{}=\"", name);
    let start = tag.find(&key)? + key.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

fn parse_marker(tag: &str) -> TextResult<HighlightMarker> {
    let malformed = || TextSurfaceError::Malformed(format!("bad marker tag: {}", tag));
    let id = attribute(tag, "data-highlight-id")
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(malformed)?;
    let color = attribute(tag, "style")
        .and_then(|style| style.split_once("background-color:"))
        .and_then(|(_, value)| value.trim().trim_end_matches(';').parse::<Color>().ok())
        .ok_or_else(malformed)?;
    Ok(HighlightMarker { id, color })
}

fn parse_body(body: &str) -> TextResult<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut rest = body.trim();
    while !rest.is_empty() {
        rest = rest
            .strip_prefix("<p>")
            .ok_or_else(|| TextSurfaceError::Malformed("expected <p>".to_string()))?;
        let mut runs = Vec::new();
        loop {
            let lt = rest
                .find('<')
                .ok_or_else(|| TextSurfaceError::Malformed("unterminated paragraph".to_string()))?;
            if lt > 0 {
                runs.push(Run::plain(unescape(&rest[..lt])));
            }
            rest = &rest[lt..];
            if let Some(after) = rest.strip_prefix("</p>") {
                rest = after.trim_start();
                break;
            }
            if !rest.starts_with("<mark ") {
                return Err(TextSurfaceError::Malformed(format!(
                    "unexpected tag at: {}",
                    rest.chars().take(20).collect::<String>()
                )));
            }
            let gt = rest
                .find('>')
                .ok_or_else(|| TextSurfaceError::Malformed("unterminated <mark>".to_string()))?;
            let marker = parse_marker(&rest[..gt])?;
            rest = &rest[gt + 1..];
            let close = rest
                .find("</mark>")
                .ok_or_else(|| TextSurfaceError::Malformed("missing </mark>".to_string()))?;
            runs.push(Run {
                text: unescape(&rest[..close]),
                marker: Some(marker),
            });
            rest = &rest[close + "</mark>".len()..];
        }
        blocks.push(runs);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(color: &str) -> HighlightMarker {
        HighlightMarker {
            id: Uuid::new_v4(),
            color: color.parse().unwrap(),
        }
    }

    #[test]
    fn test_find_and_wrap() {
        let mut surface = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let range = surface.find("ipsum").unwrap();
        assert_eq!(range, SelectionRange::in_block(0, 6, 11));

        let m = marker("#fef08a");
        surface.wrap_selection(&range, &m).unwrap();
        assert_eq!(surface.marked_text(m.id), "ipsum");
        assert_eq!(surface.block_text(0).unwrap(), "Lorem ipsum dolor");
    }

    #[test]
    fn test_wrap_rejects_collapsed_and_multi_block() {
        let mut surface = PlainTextSurface::from_paragraphs(&["one", "two"]);
        let m = marker("#fef08a");

        let collapsed = SelectionRange::in_block(0, 1, 1);
        assert_eq!(surface.wrap_selection(&collapsed, &m), Err(TextSurfaceError::Collapsed));

        let spanning = SelectionRange::new(TextPosition::new(0, 1), TextPosition::new(1, 2));
        assert_eq!(surface.wrap_selection(&spanning, &m), Err(TextSurfaceError::SpansBlocks(0, 1)));

        let outside = SelectionRange::in_block(0, 1, 10);
        assert!(matches!(
            surface.wrap_selection(&outside, &m),
            Err(TextSurfaceError::OutOfBounds { .. })
        ));

        // Failed wraps leave nothing to undo
        assert!(!surface.undo());
    }

    #[test]
    fn test_backwards_selection() {
        let mut surface = PlainTextSurface::from_paragraphs(&["abcdef"]);
        let m = marker("#bbf7d0");
        surface.wrap_selection(&SelectionRange::in_block(0, 4, 1), &m).unwrap();
        assert_eq!(surface.marked_text(m.id), "bcd");
    }

    #[test]
    fn test_hit_test() {
        let mut surface = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let m = marker("#fef08a");
        surface.wrap_selection(&surface.find("ipsum").unwrap(), &m).unwrap();

        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 6)), Some(m.id));
        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 10)), Some(m.id));
        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 11)), None);
        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 2)), None);
        assert_eq!(surface.hit_test_marker(TextPosition::new(3, 0)), None);
    }

    #[test]
    fn test_nested_wrap_overrides_inner_part() {
        let mut surface = PlainTextSurface::from_paragraphs(&["abcdefgh"]);
        let outer = marker("#fef08a");
        let inner = marker("#bfdbfe");
        surface.wrap_selection(&SelectionRange::in_block(0, 1, 7), &outer).unwrap();
        surface.wrap_selection(&SelectionRange::in_block(0, 3, 5), &inner).unwrap();
        assert_eq!(surface.marked_text(outer.id), "bcfg");
        assert_eq!(surface.marked_text(inner.id), "de");
    }

    #[test]
    fn test_body_round_trip() {
        let paragraphs = ["a < b & \"c\"", "Lorem ipsum dolor"];
        let mut surface = PlainTextSurface::from_paragraphs(&paragraphs);
        let m = marker("#fef08a");
        surface.wrap_selection(&surface.find("ipsum").unwrap(), &m).unwrap();

        let body = surface.body();
        assert!(body.contains(&format!("data-highlight-id=\"{}\"", m.id)));
        assert!(body.contains("a &lt; b &amp; &quot;c&quot;"));

        let mut loaded = PlainTextSurface::new();
        loaded.set_body(&body).unwrap();
        assert_eq!(loaded.text(), surface.text());
        assert_eq!(loaded.marked_text(m.id), "ipsum");
        assert_eq!(loaded.body(), body);
    }

    #[test]
    fn test_malformed_body() {
        let mut surface = PlainTextSurface::new();
        assert!(matches!(surface.set_body("hello"), Err(TextSurfaceError::Malformed(_))));
        assert!(matches!(surface.set_body("<p>hello"), Err(TextSurfaceError::Malformed(_))));
        assert!(matches!(
            surface.set_body("<p><b>x</b></p>"),
            Err(TextSurfaceError::Malformed(_))
        ));
        surface.set_body("").unwrap();
        assert_eq!(surface.block_count(), 1);
    }

    #[test]
    fn test_insert_and_undo() {
        let mut surface = PlainTextSurface::from_paragraphs(&["Hello"]);
        surface.insert_text(TextPosition::new(0, 5), ", world").unwrap();
        assert_eq!(surface.text(), "Hello, world");

        assert!(surface.undo());
        assert_eq!(surface.text(), "Hello");
        assert!(surface.redo());
        assert_eq!(surface.text(), "Hello, world");
        assert!(!surface.redo());

        assert!(surface.insert_text(TextPosition::new(0, 99), "x").is_err());
    }

    #[test]
    fn test_insert_into_empty_surface_and_multibyte() {
        let mut surface = PlainTextSurface::new();
        surface.insert_text(TextPosition::new(0, 0), "héllo").unwrap();
        surface.insert_text(TextPosition::new(0, 2), "-").unwrap();
        assert_eq!(surface.text(), "hé-llo");
        assert_eq!(surface.find("llo"), Some(SelectionRange::in_block(0, 3, 6)));
    }

    #[test]
    fn test_push_paragraph_fills_initial_empty_block() {
        let mut surface = PlainTextSurface::new();
        surface.push_paragraph("Lorem ipsum");
        assert_eq!(surface.block_count(), 1);
        assert_eq!(surface.body(), "<p>Lorem ipsum</p>");

        surface.push_paragraph("dolor");
        assert_eq!(surface.block_count(), 2);
        assert_eq!(surface.block_text(1).as_deref(), Some("dolor"));

        // Undo returns to the single empty paragraph
        assert!(surface.undo());
        assert!(surface.undo());
        assert_eq!(surface.block_count(), 1);
        assert_eq!(surface.text(), "");
    }

    #[test]
    fn test_undo_removes_marker_redo_restores_it() {
        let mut surface = PlainTextSurface::from_paragraphs(&["Lorem ipsum"]);
        let m = marker("#fef08a");
        let id = m.id;
        let range = surface.find("ipsum").unwrap();
        surface.wrap_selection(&range, &m).unwrap();
        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 8)), Some(id));

        assert!(surface.undo());
        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 8)), None);
        assert!(!surface.body().contains("<mark"));

        assert!(surface.redo());
        assert_eq!(surface.hit_test_marker(TextPosition::new(0, 8)), Some(id));
    }
}
