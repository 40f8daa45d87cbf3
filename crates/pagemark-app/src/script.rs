//! JSON scripts of session steps, replayed by the `pagemark` binary.

use crate::session::{EditorSession, SessionError};
use kurbo::{Point, Rect};
use pagemark_core::storage::{PageStorage, StorageError};
use pagemark_core::{
    Color, EngineConfig, HIGHLIGHT_PRESETS, KeyEvent, Modifiers, PlainTextSurface, PointerEvent,
    PointerSample, ShapeKind, TextPosition, TextSurfaceError, ToolEvent, ToolKind,
};
use pagemark_render::RenderError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Script errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Text(#[from] TextSurfaceError),
    #[error("Text not found: {0:?}")]
    TextNotFound(String),
    #[error("No highlight is active")]
    NoActiveHighlight,
    #[error("No surface attached")]
    NoSurface,
}

/// One scripted action. Coordinates are client coordinates for pointer
/// steps and surface pixels for image insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Attach {
        width: f64,
        height: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Tool {
        tool: ToolKind,
    },
    Shape {
        kind: ShapeKind,
    },
    Color {
        color: Color,
    },
    Down {
        x: f64,
        y: f64,
        #[serde(default)]
        shift: bool,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        shift: bool,
    },
    Up {
        x: f64,
        y: f64,
    },
    Undo,
    Redo,
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Insert at `at`, or append a paragraph when absent.
    Type {
        text: String,
        #[serde(default)]
        at: Option<TextPosition>,
    },
    /// Highlight the first occurrence of `text`.
    Highlight {
        text: String,
        #[serde(default)]
        color: Option<Color>,
    },
    Click {
        block: usize,
        offset: usize,
    },
    /// Comment on the active highlight.
    Comment {
        text: String,
        #[serde(default)]
        author: Option<String>,
    },
    InsertImage {
        path: PathBuf,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    /// Write the surface as a PNG file.
    Export {
        path: PathBuf,
    },
    Save {
        #[serde(default)]
        id: Option<String>,
    },
    Load {
        id: String,
    },
}

/// A parsed script file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let json = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

fn modifiers(shift: bool) -> Modifiers {
    Modifiers { shift, ..Modifiers::NONE }
}

/// Replays scripts against a session backed by `storage`.
pub struct ScriptRunner<S: PageStorage> {
    session: EditorSession<PlainTextSurface>,
    storage: S,
    /// Relative paths in steps resolve against this directory.
    base_dir: PathBuf,
}

impl<S: PageStorage> ScriptRunner<S> {
    pub fn new(config: EngineConfig, storage: S, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            session: EditorSession::new(config, PlainTextSurface::new()),
            storage,
            base_dir: base_dir.into(),
        }
    }

    pub fn session(&self) -> &EditorSession<PlainTextSurface> {
        &self.session
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Run every step, stopping at the first error.
    pub async fn run(&mut self, script: &Script) -> Result<(), ScriptError> {
        for (i, step) in script.steps.iter().enumerate() {
            log::debug!("Step {}: {:?}", i, step);
            self.run_step(step).await?;
        }
        log::info!("Replayed {} steps", script.steps.len());
        Ok(())
    }

    /// Run one step and wait for any decode it started.
    pub async fn run_step(&mut self, step: &ScriptStep) -> Result<(), ScriptError> {
        let session = &mut self.session;
        match step {
            ScriptStep::Attach { width, height, x, y } => {
                session.attach_surface(Rect::new(*x, *y, x + width, y + height));
            }
            ScriptStep::Tool { tool } => session.select_tool(*tool),
            ScriptStep::Shape { kind } => {
                session.apply_tool_event(ToolEvent::SelectShape { kind: *kind })
            }
            ScriptStep::Color { color } => session.set_color(*color),
            ScriptStep::Down { x, y, shift } => {
                session.handle_pointer(&PointerEvent::Down(
                    PointerSample::mouse(*x, *y).with_modifiers(modifiers(*shift)),
                ));
            }
            ScriptStep::Move { x, y, shift } => {
                session.handle_pointer(&PointerEvent::Move(
                    PointerSample::mouse(*x, *y).with_modifiers(modifiers(*shift)),
                ));
            }
            ScriptStep::Up { x, y } => {
                session.handle_pointer(&PointerEvent::Up(PointerSample::mouse(*x, *y)));
            }
            ScriptStep::Undo => {
                session.undo();
            }
            ScriptStep::Redo => {
                session.redo();
            }
            ScriptStep::Key { key, modifiers } => {
                session.handle_key(&KeyEvent::Pressed(key.clone()), *modifiers);
            }
            ScriptStep::Type { text, at } => match at {
                Some(position) => session.text_mut().insert_text(*position, text)?,
                None => session.text_mut().push_paragraph(text),
            },
            ScriptStep::Highlight { text, color } => {
                let range = session
                    .text()
                    .find(text)
                    .ok_or_else(|| ScriptError::TextNotFound(text.clone()))?;
                let color = color.unwrap_or(HIGHLIGHT_PRESETS[0]);
                if let Some(id) = session.create_highlight(&range, color) {
                    log::info!("Highlighted {:?} as {}", text, id);
                }
            }
            ScriptStep::Click { block, offset } => {
                session.click_text(TextPosition::new(*block, *offset));
            }
            ScriptStep::Comment { text, author } => {
                let id = session.annotations().active_id().ok_or(ScriptError::NoActiveHighlight)?;
                session.add_comment(id, text, author.as_deref());
            }
            ScriptStep::InsertImage { path, x, y } => {
                let path = self.resolve(path);
                let bytes = fs::read(&path).map_err(|source| ScriptError::Io { path, source })?;
                self.session.insert_image(bytes, Point::new(*x, *y));
            }
            ScriptStep::Export { path } => {
                let path = self.resolve(path);
                let snapshot = self.session.surface().ok_or(ScriptError::NoSurface)?.encode()?;
                fs::write(&path, snapshot.as_bytes()).map_err(|source| ScriptError::Io {
                    path: path.clone(),
                    source,
                })?;
                log::info!("Exported surface to {}", path.display());
            }
            ScriptStep::Save { id } => {
                let mut record = session.save();
                if let Some(id) = id {
                    record.id = id.clone();
                }
                self.storage.save(&record.id, &record).await?;
                log::info!("Saved page {}", record.id);
            }
            ScriptStep::Load { id } => {
                let record = self.storage.load(id).await?;
                session.load(record)?;
            }
        }
        self.session.settle().await;
        Ok(())
    }
}
