//! Pagemark Core Library
//!
//! Platform-agnostic data structures and logic for the Pagemark page engine:
//! tool state, pointer mapping, raster history and text annotations.

pub mod annotations;
pub mod color;
pub mod config;
pub mod history;
pub mod input;
pub mod page;
pub mod storage;
pub mod text;
pub mod tools;

use std::future::Future;
use std::pin::Pin;

pub use annotations::{AnnotationStore, Comment, CommentId, Highlight, HighlightId};
pub use color::{Color, ColorError, HIGHLIGHT_PRESETS, INK_PRESETS};
pub use config::{ConfigError, EngineConfig};
pub use history::{HistoryStack, Restore, Snapshot};
pub use input::{
    CoordinateMapper, KeyEvent, Modifiers, PointerEvent, PointerSample, PointerSource,
    SurfaceGeometry,
};
pub use page::PageRecord;
pub use text::{
    HighlightMarker, PlainTextSurface, SelectionRange, TextPosition, TextSurface, TextSurfaceError,
};
pub use tools::{BlendMode, InputTarget, ShapeKind, StrokeParams, ToolEvent, ToolKind, ToolState};

/// Boxed future for async operations (storage, snapshot decoding).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;
