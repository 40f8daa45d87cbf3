//! The editing session: routes input between the text and raster surfaces,
//! owns history and annotations, and serializes surface restores.

use crate::shortcuts::{Command, ShortcutRegistry};
use image::RgbaImage;
use kurbo::{Point, Rect};
use pagemark_core::{
    AnnotationStore, BoxFuture, Color, Comment, CoordinateMapper, EngineConfig, HighlightId,
    HistoryStack, InputTarget, KeyEvent, Modifiers, PageRecord, PointerEvent, Restore,
    SelectionRange, Snapshot, SurfaceGeometry, TextPosition, TextSurface, TextSurfaceError,
    ToolEvent, ToolKind, ToolState,
};
use pagemark_render::{
    RasterSurface, RenderResult, StrokeRenderer, decode_image, decode_snapshot,
    decode_snapshot_async, paint_image,
};
use std::task::{Context, Poll};
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Text surface error: {0}")]
    Text(#[from] TextSurfaceError),
    #[error("Invalid drawing data: {0}")]
    InvalidDrawing(String),
}

/// What to do with decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DecodeKind {
    /// Replace the surface contents (undo, redo, load).
    Restore,
    /// Composite onto the surface and push a snapshot.
    Insert { origin: Point },
}

/// The one in-flight decode. Replacing it drops the old task.
struct PendingDecode {
    generation: u64,
    kind: DecodeKind,
    task: BoxFuture<'static, RenderResult<RgbaImage>>,
}

/// One page being edited.
pub struct EditorSession<T: TextSurface> {
    config: EngineConfig,
    tools: ToolState,
    mapper: CoordinateMapper,
    surface: Option<RasterSurface>,
    renderer: StrokeRenderer,
    history: HistoryStack,
    annotations: AnnotationStore,
    text: T,
    /// Metadata carried through from the last load.
    page: PageRecord,
    pending: Option<PendingDecode>,
    decode_generation: u64,
}

impl<T: TextSurface> EditorSession<T> {
    pub fn new(config: EngineConfig, text: T) -> Self {
        Self {
            tools: ToolState::with_tool(config.default_tool),
            config,
            mapper: CoordinateMapper::new(),
            surface: None,
            renderer: StrokeRenderer::new(),
            history: HistoryStack::new(),
            annotations: AnnotationStore::new(),
            text,
            page: PageRecord::new(),
            pending: None,
            decode_generation: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn text(&self) -> &T {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut T {
        &mut self.text
    }

    pub fn page(&self) -> &PageRecord {
        &self.page
    }

    /// Create the raster surface, displayed at `display` in client
    /// coordinates. The current history state (e.g. a drawing loaded before
    /// attaching) is restored onto it. Re-attaching only updates the display bounds.
    pub fn attach_surface(&mut self, display: Rect) {
        if self.surface.is_some() {
            self.set_display(display);
            return;
        }
        let (width, height) = (self.config.surface_width, self.config.surface_height);
        self.surface = Some(RasterSurface::new(width, height));
        self.mapper.attach(SurfaceGeometry::new(width, height, display));
        log::debug!("Attached {}x{} surface at {:?}", width, height, display);

        if let Some(snapshot) = self.history.current().cloned() {
            self.restore(Restore::Snapshot(snapshot));
        }
    }

    /// The surface element moved or was resized on screen.
    pub fn set_display(&mut self, display: Rect) {
        self.mapper.set_display(display);
    }

    pub fn is_decode_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_stroke_active(&self) -> bool {
        self.renderer.is_active()
    }

    /// Apply a tool event. A stroke in progress is committed first.
    pub fn apply_tool_event(&mut self, event: ToolEvent) {
        if self.renderer.is_active() {
            self.finish_stroke();
        }
        self.tools = std::mem::take(&mut self.tools).apply(event);
        log::debug!("Tool: {} ({})", self.tools.tool.name(), self.tools.color);
    }

    pub fn select_tool(&mut self, tool: ToolKind) {
        self.apply_tool_event(ToolEvent::SelectTool { tool });
    }

    pub fn set_color(&mut self, color: Color) {
        self.apply_tool_event(ToolEvent::SetColor { color });
    }

    /// Route a pointer event to the raster surface. Returns whether the
    /// event was consumed.
    ///
    /// Ignored under the text tool, with no attached surface, and while a
    /// restore or image decode is pending.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        if self.tools.input_target() == InputTarget::Text {
            return false;
        }
        if self.pending.is_some() {
            log::debug!("Ignoring pointer input while a decode is pending");
            return false;
        }
        let point = self.mapper.map_event(event);
        let Some(surface) = self.surface.as_mut() else {
            log::debug!("Ignoring pointer input without a surface");
            return false;
        };

        match event {
            PointerEvent::Down(_) => self.renderer.begin(surface, &self.tools, point),
            PointerEvent::Move(sample) => {
                if !self.renderer.is_active() {
                    return false;
                }
                self.renderer.extend(surface, point, sample.modifiers);
                true
            }
            PointerEvent::Up(_) | PointerEvent::Leave(_) => self.finish_stroke(),
        }
    }

    /// End the active stroke and push its snapshot.
    fn finish_stroke(&mut self) -> bool {
        let Some(surface) = self.surface.as_ref() else {
            return false;
        };
        match self.renderer.end(surface) {
            Ok(Some(snapshot)) => {
                self.history.push(snapshot);
                log::debug!("Stroke committed, history step {}", self.history.step());
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::error!("Failed to encode stroke snapshot: {}", e);
                false
            }
        }
    }

    /// Drop the stroke in progress without recording it.
    pub fn cancel_stroke(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            self.renderer.cancel(surface);
        }
    }

    /// Undo on whichever surface the current tool targets.
    pub fn undo(&mut self) -> bool {
        if self.tools.input_target() == InputTarget::Text {
            return self.text.undo();
        }
        if self.renderer.is_active() {
            log::debug!("Ignoring undo during a stroke");
            return false;
        }
        match self.history.undo() {
            Some(restore) => {
                self.restore(restore);
                true
            }
            None => false,
        }
    }

    /// Redo on whichever surface the current tool targets.
    pub fn redo(&mut self) -> bool {
        if self.tools.input_target() == InputTarget::Text {
            return self.text.redo();
        }
        if self.renderer.is_active() {
            log::debug!("Ignoring redo during a stroke");
            return false;
        }
        match self.history.redo() {
            Some(restore) => {
                self.restore(restore);
                true
            }
            None => false,
        }
    }

    /// Bring the surface to `restore`. Snapshots decode through the pending
    /// slot; the empty state clears immediately.
    fn restore(&mut self, restore: Restore) {
        match restore {
            Restore::Snapshot(snapshot) => {
                self.issue_decode(DecodeKind::Restore, decode_snapshot_async(snapshot));
            }
            Restore::Clear => {
                self.cancel_decode();
                if let Some(surface) = self.surface.as_mut() {
                    surface.clear();
                }
            }
        }
    }

    fn cancel_decode(&mut self) {
        if let Some(old) = self.pending.take() {
            log::debug!("Cancelled decode {}", old.generation);
        }
    }

    fn issue_decode(
        &mut self,
        kind: DecodeKind,
        task: BoxFuture<'static, RenderResult<RgbaImage>>,
    ) {
        self.decode_generation += 1;
        if let Some(old) = self.pending.replace(PendingDecode {
            generation: self.decode_generation,
            kind,
            task,
        }) {
            log::debug!("Decode {} superseded by {}", old.generation, self.decode_generation);
        }
    }

    /// Insert an encoded image at `origin` (surface pixels). It is decoded
    /// asynchronously, painted, and recorded as one snapshot.
    ///
    /// Like a stroke, an insert is refused while another decode is pending,
    /// so it is never painted over pixels a restore is about to replace.
    pub fn insert_image(&mut self, bytes: Vec<u8>, origin: Point) -> bool {
        if self.surface.is_none() || self.renderer.is_active() || self.pending.is_some() {
            log::debug!("Ignoring image insert");
            return false;
        }
        let task = Box::pin(async move { decode_image(&bytes) });
        self.issue_decode(DecodeKind::Insert { origin }, task);
        true
    }

    /// Drive the pending decode. Ready once nothing is pending.
    pub fn poll_decode(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Ready(());
        };
        let result = match pending.task.as_mut().poll(cx) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };
        if let Some(pending) = self.pending.take() {
            self.apply_decode(pending.generation, pending.kind, result);
        }
        Poll::Ready(())
    }

    /// Wait for the pending decode, if any, and apply it.
    pub async fn settle(&mut self) {
        std::future::poll_fn(|cx| self.poll_decode(cx)).await
    }

    fn apply_decode(&mut self, generation: u64, kind: DecodeKind, result: RenderResult<RgbaImage>) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::error!("Decode {} failed: {}", generation, e);
                // Never leave pixels from another history step on screen
                if kind == DecodeKind::Restore {
                    surface.clear();
                }
                return;
            }
        };
        match kind {
            DecodeKind::Restore => surface.restore(&image),
            DecodeKind::Insert { origin } => match paint_image(surface, &image, origin) {
                Ok(snapshot) => self.history.push(snapshot),
                Err(e) => log::error!("Failed to encode inserted image: {}", e),
            },
        }
        log::debug!("Applied decode {}", generation);
    }

    /// Highlight `range` with `color`, returning the new highlight's id.
    pub fn create_highlight(
        &mut self,
        range: &SelectionRange,
        color: Color,
    ) -> Option<HighlightId> {
        self.annotations
            .create_highlight(&mut self.text, range, color)
            .map(|highlight| highlight.id)
    }

    /// A click in the text: activates the highlight under `position`, or
    /// hides the thread when there is none.
    pub fn click_text(&mut self, position: TextPosition) -> Option<HighlightId> {
        let hit = self.text.hit_test_marker(position);
        self.annotations.select_active(hit);
        self.annotations.active_id()
    }

    pub fn select_highlight(&mut self, id: Option<HighlightId>) {
        self.annotations.select_active(id);
    }

    /// Comment on a highlight. `author` defaults to the configured one.
    pub fn add_comment(
        &mut self,
        id: HighlightId,
        text: &str,
        author: Option<&str>,
    ) -> Option<&Comment> {
        let author = author.unwrap_or(&self.config.author);
        self.annotations.add_comment(id, text, author)
    }

    /// Route a key press through the shortcut registry.
    pub fn handle_key(&mut self, event: &KeyEvent, modifiers: Modifiers) -> Option<Command> {
        let KeyEvent::Pressed(key) = event else {
            return None;
        };
        let command = ShortcutRegistry::lookup(key, modifiers)?;
        match command {
            Command::Undo => {
                self.undo();
            }
            Command::Redo => {
                self.redo();
            }
            Command::SelectTool(tool) => self.select_tool(tool),
            Command::CancelStroke => self.cancel_stroke(),
        }
        Some(command)
    }

    /// Load a page: body, highlights, and the drawing as the first history
    /// entry. The drawing is decoded up front, so a record whose drawing
    /// does not decode is rejected before anything is replaced.
    pub fn load(&mut self, record: PageRecord) -> Result<(), SessionError> {
        let drawing = match record.drawing_data.as_deref() {
            Some(url) => {
                let snapshot = Snapshot::from_data_url(url)
                    .map_err(|e| SessionError::InvalidDrawing(e.to_string()))?;
                let image = decode_snapshot(&snapshot)
                    .map_err(|e| SessionError::InvalidDrawing(e.to_string()))?;
                Some((snapshot, image))
            }
            None => None,
        };
        self.text.set_body(&record.body)?;

        self.cancel_stroke();
        self.cancel_decode();
        let highlights = record.highlights.clone().unwrap_or_default();
        self.annotations = AnnotationStore::from_map(highlights);
        let (snapshot, image) = drawing.unzip();
        self.history.reset(snapshot);
        if let Some(surface) = self.surface.as_mut() {
            match image {
                Some(image) => surface.restore(&image),
                None => surface.clear(),
            }
        }
        log::info!("Loaded page {} ({} highlights)", record.id, self.annotations.len());
        self.page = record;
        Ok(())
    }

    /// The page as it should be persisted.
    pub fn save(&self) -> PageRecord {
        let highlights = self.annotations.highlight_map();
        PageRecord {
            body: self.text.body(),
            drawing_data: self.history.current().map(Snapshot::to_data_url),
            highlights: (!highlights.is_empty()).then_some(highlights),
            ..self.page.clone()
        }
    }
}
