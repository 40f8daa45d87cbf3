//! Tool system for the page.
//!
//! [`ToolState`] is a plain value; every change goes through
//! [`ToolState::apply`], so hosts can keep it in whatever UI state container
//! they like and replay events deterministically.

use crate::color::Color;
use serde::{Deserialize, Serialize};

/// Maximum number of custom colors remembered.
pub const MAX_RECENT_COLORS: usize = 5;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Text,
    FineLiner,
    Pen,
    Marker,
    Highlighter,
    Eraser,
    Shape,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Text,
        ToolKind::FineLiner,
        ToolKind::Pen,
        ToolKind::Marker,
        ToolKind::Highlighter,
        ToolKind::Eraser,
        ToolKind::Shape,
    ];

    /// Brush parameters for this tool. `None` for the text tool.
    pub fn stroke_params(self) -> Option<StrokeParams> {
        let (width, opacity, blend) = match self {
            ToolKind::Text => return None,
            ToolKind::FineLiner => (1.0, 1.0, BlendMode::Normal),
            ToolKind::Pen => (3.0, 1.0, BlendMode::Normal),
            ToolKind::Marker => (8.0, 1.0, BlendMode::Normal),
            ToolKind::Highlighter => (24.0, 0.35, BlendMode::Multiply),
            ToolKind::Eraser => (40.0, 1.0, BlendMode::Erase),
            ToolKind::Shape => (2.0, 1.0, BlendMode::Normal),
        };
        Some(StrokeParams { width, opacity, blend })
    }

    /// Freehand tools follow the pointer sample by sample.
    pub fn is_freehand(self) -> bool {
        !matches!(self, ToolKind::Text | ToolKind::Shape)
    }

    /// Which input surface receives pointer events under this tool.
    pub fn input_target(self) -> InputTarget {
        match self {
            ToolKind::Text => InputTarget::Text,
            _ => InputTarget::Raster,
        }
    }

    /// Get display name for this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Text => "Text",
            ToolKind::FineLiner => "Fine liner",
            ToolKind::Pen => "Pen",
            ToolKind::Marker => "Marker",
            ToolKind::Highlighter => "Highlighter",
            ToolKind::Eraser => "Eraser",
            ToolKind::Shape => "Shape",
        }
    }
}

/// Shape drawn by the shape tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rect,
    Circle,
    Triangle,
    Line,
}

/// The two mutually exclusive pointer consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    /// Rich-text surface; the raster ignores pointer input.
    Text,
    /// Raster surface; the text surface ignores pointer input.
    Raster,
}

/// How painted pixels combine with the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Source-over.
    Normal,
    /// Separable multiply, then source-over.
    Multiply,
    /// Destination-out: removes coverage, never adds color.
    Erase,
}

/// Per-tool brush parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    /// Line width in surface pixels.
    pub width: f64,
    /// Opacity multiplier in `0.0..=1.0`.
    pub opacity: f32,
    pub blend: BlendMode,
}

/// Events accepted by [`ToolState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToolEvent {
    SelectTool { tool: ToolKind },
    /// Selects the shape tool with the given kind.
    SelectShape { kind: ShapeKind },
    SetColor { color: Color },
}

/// Current tool, shape kind, color and recent custom colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ToolState {
    pub tool: ToolKind,
    pub shape_kind: ShapeKind,
    pub color: Color,
    /// Most recent first; never holds duplicates or preset colors.
    recent_colors: Vec<Color>,
}

impl ToolState {
    /// Create the default tool state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session on a specific tool.
    pub fn with_tool(tool: ToolKind) -> Self {
        Self { tool, ..Self::default() }
    }

    /// Pure reducer: the state after `event`.
    pub fn apply(mut self, event: ToolEvent) -> Self {
        match event {
            ToolEvent::SelectTool { tool } => self.tool = tool,
            ToolEvent::SelectShape { kind } => {
                self.tool = ToolKind::Shape;
                self.shape_kind = kind;
            }
            ToolEvent::SetColor { color } => {
                self.color = color;
                if !color.is_preset() {
                    self.recent_colors.retain(|c| *c != color);
                    self.recent_colors.insert(0, color);
                    self.recent_colors.truncate(MAX_RECENT_COLORS);
                }
            }
        }
        self
    }

    /// Custom colors, most recent first.
    pub fn recent_colors(&self) -> &[Color] {
        &self.recent_colors
    }

    pub fn input_target(&self) -> InputTarget {
        self.tool.input_target()
    }

    pub fn stroke_params(&self) -> Option<StrokeParams> {
        self.tool.stroke_params()
    }
}
