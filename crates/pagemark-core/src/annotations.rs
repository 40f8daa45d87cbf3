//! Highlights over text ranges and their comment threads.

use crate::color::Color;
use crate::text::{HighlightMarker, SelectionRange, TextSurface};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a highlight.
pub type HighlightId = Uuid;

/// Unique identifier for a comment.
pub type CommentId = Uuid;

/// A single comment in a highlight's thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub author: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "createdAt")]
    pub created_at: u64,
}

/// A colored text highlight with its ordered comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub color: Color,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Page-scoped highlight store plus the highlight whose thread is shown.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    highlights: HashMap<HighlightId, Highlight>,
    /// Creation order, for stable iteration.
    order: Vec<HighlightId>,
    active: Option<HighlightId>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted highlight map. Nothing is active.
    pub fn from_map(map: HashMap<HighlightId, Highlight>) -> Self {
        let mut order: Vec<HighlightId> = map.keys().copied().collect();
        // Persisted maps carry no creation order: sort by first comment,
        // uncommented highlights last.
        order.sort_by_key(|id| {
            let first = map[id].comments.first().map(|c| c.created_at);
            (first.is_none(), first, *id)
        });
        Self {
            highlights: map,
            order,
            active: None,
        }
    }

    /// Highlight map for persistence.
    pub fn highlight_map(&self) -> HashMap<HighlightId, Highlight> {
        self.highlights.clone()
    }

    /// Wrap `range` in a new highlight and make it active.
    ///
    /// Collapsed selections are ignored. If the text surface cannot wrap
    /// the range (e.g. it spans paragraphs) the failure is logged and the
    /// store is left untouched.
    pub fn create_highlight<T: TextSurface + ?Sized>(
        &mut self,
        surface: &mut T,
        range: &SelectionRange,
        color: Color,
    ) -> Option<&Highlight> {
        if range.is_collapsed() {
            log::debug!("Ignoring highlight request for collapsed selection");
            return None;
        }
        let id = Uuid::new_v4();
        if let Err(e) = surface.wrap_selection(range, &HighlightMarker { id, color }) {
            log::warn!("Could not wrap selection in highlight: {}", e);
            return None;
        }
        self.highlights.insert(
            id,
            Highlight {
                id,
                color,
                comments: Vec::new(),
            },
        );
        self.order.push(id);
        self.active = Some(id);
        log::debug!("Created highlight {} ({})", id, color);
        self.highlights.get(&id)
    }

    /// Show the thread for `id`, or hide the panel with `None`.
    /// Ids that do not resolve deselect.
    pub fn select_active(&mut self, id: Option<HighlightId>) {
        self.active = id.filter(|id| self.highlights.contains_key(id));
    }

    pub fn active(&self) -> Option<&Highlight> {
        self.active.and_then(|id| self.highlights.get(&id))
    }

    pub fn active_id(&self) -> Option<HighlightId> {
        self.active
    }

    /// Append a comment to a highlight's thread.
    ///
    /// Blank text or an unknown highlight is a no-op.
    pub fn add_comment(
        &mut self,
        highlight_id: HighlightId,
        text: &str,
        author: &str,
    ) -> Option<&Comment> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let highlight = self.highlights.get_mut(&highlight_id)?;
        highlight.comments.push(Comment {
            id: Uuid::new_v4(),
            text: text.to_string(),
            author: author.to_string(),
            created_at: now_millis(),
        });
        highlight.comments.last()
    }

    pub fn get(&self, id: HighlightId) -> Option<&Highlight> {
        self.highlights.get(&id)
    }

    /// Highlights in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Highlight> {
        self.order.iter().filter_map(|id| self.highlights.get(id))
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{PlainTextSurface, TextPosition};

    fn yellow() -> Color {
        "#fef08a".parse().unwrap()
    }

    fn find(text: &PlainTextSurface, needle: &str) -> SelectionRange {
        text.find(needle).unwrap()
    }

    #[test]
    fn test_highlight_and_comment_scenario() {
        let mut text = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let mut store = AnnotationStore::new();
        let range = text.find("ipsum").unwrap();

        let highlight = store.create_highlight(&mut text, &range, yellow()).unwrap().clone();
        assert_eq!(highlight.color, yellow());
        assert!(highlight.comments.is_empty());
        assert_eq!(store.active_id(), Some(highlight.id));
        assert_eq!(text.marked_text(highlight.id), "ipsum");

        let comment = store.add_comment(highlight.id, "check this", "Me").unwrap().clone();
        assert_eq!(comment.author, "Me");
        assert_eq!(comment.text, "check this");
        assert_eq!(store.get(highlight.id).unwrap().comments.len(), 1);
        assert_eq!(store.active().unwrap().comments[0], comment);
    }

    #[test]
    fn test_collapsed_selection_is_noop() {
        let mut text = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let mut store = AnnotationStore::new();
        let range = SelectionRange::in_block(0, 3, 3);
        assert!(store.create_highlight(&mut text, &range, yellow()).is_none());
        assert!(store.is_empty());
        assert!(store.active().is_none());
    }

    #[test]
    fn test_multi_block_selection_abandoned() {
        let mut text = PlainTextSurface::from_paragraphs(&["first", "second"]);
        let body_before = text.body();
        let mut store = AnnotationStore::new();

        let range = SelectionRange::new(TextPosition::new(0, 2), TextPosition::new(1, 3));
        assert!(store.create_highlight(&mut text, &range, yellow()).is_none());
        assert!(store.is_empty());
        assert!(store.active().is_none());
        assert_eq!(text.body(), body_before);
    }

    #[test]
    fn test_failed_create_keeps_previous_active() {
        let mut text = PlainTextSurface::from_paragraphs(&["alpha beta", "gamma"]);
        let mut store = AnnotationStore::new();
        let range = find(&text, "beta");
        let first = store.create_highlight(&mut text, &range, yellow()).unwrap().id;

        let spanning = SelectionRange::new(TextPosition::new(0, 0), TextPosition::new(1, 1));
        assert!(store.create_highlight(&mut text, &spanning, yellow()).is_none());
        assert_eq!(store.active_id(), Some(first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_comment_rejections() {
        let mut text = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let mut store = AnnotationStore::new();
        let range = find(&text, "dolor");
        let id = store.create_highlight(&mut text, &range, yellow()).unwrap().id;

        assert!(store.add_comment(id, "", "Me").is_none());
        assert!(store.add_comment(id, "   \n\t", "Me").is_none());
        assert!(store.add_comment(Uuid::new_v4(), "hello", "Me").is_none());
        assert!(store.get(id).unwrap().comments.is_empty());
    }

    #[test]
    fn test_comments_append_in_order() {
        let mut text = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let mut store = AnnotationStore::new();
        let range = find(&text, "Lorem");
        let id = store.create_highlight(&mut text, &range, yellow()).unwrap().id;

        for body in ["one", "  two  ", "three"] {
            store.add_comment(id, body, "Me");
        }
        let comments = &store.get(id).unwrap().comments;
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert!(comments.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_ne!(comments[0].id, comments[1].id);
    }

    #[test]
    fn test_select_active() {
        let mut text = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let mut store = AnnotationStore::new();
        let range_a = find(&text, "Lorem");
        let a = store.create_highlight(&mut text, &range_a, yellow()).unwrap().id;
        let range_b = find(&text, "dolor");
        let b = store.create_highlight(&mut text, &range_b, yellow()).unwrap().id;
        assert_eq!(store.active_id(), Some(b));

        store.select_active(Some(a));
        assert_eq!(store.active_id(), Some(a));

        store.select_active(None);
        assert!(store.active().is_none());

        store.select_active(Some(Uuid::new_v4()));
        assert!(store.active().is_none());

        let ids: Vec<_> = store.iter().map(|h| h.id).collect();
        assert_eq!(ids, [a, b]);
    }

    #[test]
    fn test_map_round_trip() {
        let mut text = PlainTextSurface::from_paragraphs(&["Lorem ipsum dolor"]);
        let mut store = AnnotationStore::new();
        let range = find(&text, "ipsum");
        let id = store.create_highlight(&mut text, &range, yellow()).unwrap().id;
        store.add_comment(id, "check this", "Me");

        let json = serde_json::to_string(&store.highlight_map()).unwrap();
        assert!(json.contains("createdAt"));
        let map: HashMap<HighlightId, Highlight> = serde_json::from_str(&json).unwrap();
        let restored = AnnotationStore::from_map(map);
        assert_eq!(restored.get(id), store.get(id));
        assert!(restored.active().is_none());
    }
}
