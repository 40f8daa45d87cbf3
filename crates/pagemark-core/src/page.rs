//! Page record exchanged with persistence.

use crate::annotations::{Highlight, HighlightId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A page as stored: metadata, text body, drawing and highlights.
///
/// The engine only interprets `drawing_data` and `highlights`; every other
/// field is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Serialized rich-text body.
    #[serde(default)]
    pub body: String,
    /// Paper style chosen by the user (e.g. "lined").
    #[serde(default)]
    pub style: String,
    /// Raster snapshot as a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<HashMap<HighlightId, Highlight>>,
}

impl Default for PageRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRecord {
    /// Create a new empty page.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: "Untitled".to_string(),
            summary: String::new(),
            body: String::new(),
            style: "lined".to_string(),
            drawing_data: None,
            highlights: None,
        }
    }

    /// Serialize the page to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a page from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_defaults() {
        let page = PageRecord::new();
        assert_eq!(page.title, "Untitled");
        assert!(page.drawing_data.is_none());
        assert!(Uuid::parse_str(&page.id).is_ok());
    }

    #[test]
    fn test_json_uses_camel_case_and_skips_empty() {
        let mut page = PageRecord::new();
        page.drawing_data = Some("data:image/png;base64,AAAA".to_string());
        let json = page.to_json().unwrap();
        assert!(json.contains("\"drawingData\""));
        assert!(!json.contains("\"highlights\""));

        let back = PageRecord::from_json(&json).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn test_minimal_record_loads() {
        let page = PageRecord::from_json(r#"{"id": "p1"}"#).unwrap();
        assert_eq!(page.id, "p1");
        assert!(page.body.is_empty());
        assert!(page.highlights.is_none());
    }
}
