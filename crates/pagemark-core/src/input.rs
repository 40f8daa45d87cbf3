//! Pointer/keyboard events and mapping from client to surface coordinates.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Also the straight-line modifier for freehand tools.
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false, meta: false };

    pub fn shift() -> Self {
        Self { shift: true, ..Self::NONE }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Where a pointer sample came from, in client (window) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerSource {
    Mouse { client: Point },
    /// Active touch points; only the first one is used for drawing.
    Touch { touches: Vec<Point> },
}

impl PointerSource {
    /// The client position this sample stands for, if any.
    pub fn client_position(&self) -> Option<Point> {
        match self {
            PointerSource::Mouse { client } => Some(*client),
            PointerSource::Touch { touches } => touches.first().copied(),
        }
    }
}

/// A single pointer sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub source: PointerSource,
    pub modifiers: Modifiers,
}

impl PointerSample {
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            source: PointerSource::Mouse { client: Point::new(x, y) },
            modifiers: Modifiers::NONE,
        }
    }

    pub fn touch(touches: Vec<Point>) -> Self {
        Self {
            source: PointerSource::Touch { touches },
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down(PointerSample),
    Move(PointerSample),
    Up(PointerSample),
    /// Pointer left the surface mid-stroke. Commits like `Up`.
    Leave(PointerSample),
}

impl PointerEvent {
    pub fn sample(&self) -> &PointerSample {
        match self {
            PointerEvent::Down(s)
            | PointerEvent::Move(s)
            | PointerEvent::Up(s)
            | PointerEvent::Leave(s) => s,
        }
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Backing raster size plus where the surface element sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    pub surface_width: u32,
    pub surface_height: u32,
    /// Displayed bounds of the surface element in client coordinates.
    pub display: Rect,
}

impl SurfaceGeometry {
    pub fn new(surface_width: u32, surface_height: u32, display: Rect) -> Self {
        Self { surface_width, surface_height, display }
    }
}

/// Converts client pointer positions into surface pixels.
///
/// The backing raster need not match the displayed size (e.g. after the
/// container resizes), so each axis is scaled independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateMapper {
    geometry: Option<SurfaceGeometry>,
}

impl CoordinateMapper {
    /// A mapper with no attached surface; maps everything to the origin.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(geometry: SurfaceGeometry) -> Self {
        Self { geometry: Some(geometry) }
    }

    pub fn attach(&mut self, geometry: SurfaceGeometry) {
        self.geometry = Some(geometry);
    }

    pub fn detach(&mut self) {
        self.geometry = None;
    }

    pub fn geometry(&self) -> Option<&SurfaceGeometry> {
        self.geometry.as_ref()
    }

    /// Update only the displayed bounds, keeping the raster size.
    pub fn set_display(&mut self, display: Rect) {
        if let Some(geometry) = &mut self.geometry {
            geometry.display = display;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.geometry.is_some()
    }

    /// Map a pointer sample into surface-local pixel coordinates.
    ///
    /// Degrades to `(0, 0)` when the surface is not attached, the display
    /// has no area, or a touch event carries no touch points.
    pub fn map(&self, sample: &PointerSample) -> Point {
        let (Some(geometry), Some(client)) = (self.geometry, sample.source.client_position()) else {
            return Point::ZERO;
        };
        let display = geometry.display;
        if display.width() <= 0.0 || display.height() <= 0.0 {
            return Point::ZERO;
        }
        let scale_x = geometry.surface_width as f64 / display.width();
        let scale_y = geometry.surface_height as f64 / display.height();
        Point::new((client.x - display.x0) * scale_x, (client.y - display.y0) * scale_y)
    }

    pub fn map_event(&self, event: &PointerEvent) -> Point {
        self.map(event.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(surface: (u32, u32), display: Rect) -> CoordinateMapper {
        CoordinateMapper::attached(SurfaceGeometry::new(surface.0, surface.1, display))
    }

    #[test]
    fn test_unattached_maps_to_origin() {
        let mapper = CoordinateMapper::new();
        assert_eq!(mapper.map(&PointerSample::mouse(120.0, 80.0)), Point::ZERO);
    }

    #[test]
    fn test_identity_mapping() {
        let m = mapper((800, 600), Rect::new(0.0, 0.0, 800.0, 600.0));
        assert_eq!(m.map(&PointerSample::mouse(120.0, 80.0)), Point::new(120.0, 80.0));
    }

    #[test]
    fn test_offset_and_independent_axis_scale() {
        // Raster is 2x wide and 3x tall relative to the displayed element
        let m = mapper((800, 900), Rect::new(10.0, 20.0, 410.0, 320.0));
        let p = m.map(&PointerSample::mouse(110.0, 120.0));
        assert!((p.x - 200.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_touch_uses_first_point() {
        let m = mapper((400, 400), Rect::new(0.0, 0.0, 200.0, 200.0));
        let sample = PointerSample::touch(vec![Point::new(50.0, 25.0), Point::new(150.0, 150.0)]);
        assert_eq!(m.map(&sample), Point::new(100.0, 50.0));

        let empty = PointerSample::touch(Vec::new());
        assert_eq!(m.map(&empty), Point::ZERO);
    }

    #[test]
    fn test_scale_invariance() {
        let small = mapper((400, 300), Rect::new(0.0, 0.0, 200.0, 150.0));
        let large = mapper((800, 600), Rect::new(0.0, 0.0, 400.0, 300.0));
        let sample = PointerSample::mouse(37.0, 91.0);
        assert_eq!(small.map(&sample), large.map(&sample));

        // Same relative position on both: results scale with the raster
        let rel_small = small.map(&PointerSample::mouse(100.0, 75.0));
        let rel_large = large.map(&PointerSample::mouse(200.0, 150.0));
        assert_eq!(rel_small.x / 400.0, rel_large.x / 800.0);
        assert_eq!(rel_small.y / 300.0, rel_large.y / 600.0);
    }

    #[test]
    fn test_display_resize_keeps_raster() {
        let mut m = mapper((400, 400), Rect::new(0.0, 0.0, 400.0, 400.0));
        m.set_display(Rect::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(m.geometry().unwrap().surface_width, 400);
        assert_eq!(m.map(&PointerSample::mouse(100.0, 100.0)), Point::new(200.0, 200.0));
    }

    #[test]
    fn test_degenerate_display() {
        let m = mapper((400, 400), Rect::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(m.map(&PointerSample::mouse(5.0, 5.0)), Point::ZERO);
    }
}
