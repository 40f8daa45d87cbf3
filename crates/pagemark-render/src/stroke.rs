//! Stroke rendering: freehand segments, shape outlines and live preview.

use crate::composite::composite;
use crate::error::RenderResult;
use crate::surface::RasterSurface;
use image::RgbaImage;
use kurbo::{Circle, Line, Point, Rect, Vec2};
use pagemark_core::{Modifiers, ShapeKind, Snapshot, StrokeParams, ToolKind, ToolState};

/// Distance from `point` to the segment `line`.
fn segment_distance(line: Line, point: Point) -> f64 {
    let line_vec = line.p1 - line.p0;
    let point_vec = point - line.p0;

    let line_len_sq = line_vec.hypot2();
    if line_len_sq < f64::EPSILON {
        return point_vec.hypot();
    }

    let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    let projection = line.p0 + t * line_vec;
    (point - projection).hypot()
}

/// A single stroked primitive, tested for coverage at pixel centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Segment(Line),
    Rect(Rect),
    Circle(Circle),
    Triangle([Point; 3]),
}

impl Primitive {
    /// The outline for `kind` dragged from `start` to `current`.
    pub fn shape(kind: ShapeKind, start: Point, current: Point) -> Self {
        match kind {
            ShapeKind::Rect => Primitive::Rect(Rect::from_points(start, current)),
            ShapeKind::Circle => Primitive::Circle(Circle::new(start, start.distance(current))),
            ShapeKind::Triangle => Primitive::Triangle([
                Point::new((start.x + current.x) / 2.0, start.y),
                Point::new(current.x, current.y),
                Point::new(start.x, current.y),
            ]),
            ShapeKind::Line => Primitive::Segment(Line::new(start, current)),
        }
    }

    /// Whether `point` lies within `half_width` of the outline.
    pub fn covers(&self, point: Point, half_width: f64) -> bool {
        match self {
            Primitive::Segment(line) => segment_distance(*line, point) <= half_width,
            Primitive::Rect(rect) => {
                let corners = [
                    Point::new(rect.x0, rect.y0),
                    Point::new(rect.x1, rect.y0),
                    Point::new(rect.x1, rect.y1),
                    Point::new(rect.x0, rect.y1),
                ];
                (0..4).any(|i| {
                    let edge = Line::new(corners[i], corners[(i + 1) % 4]);
                    segment_distance(edge, point) <= half_width
                })
            }
            Primitive::Circle(circle) => {
                if circle.radius <= 0.0 {
                    return false;
                }
                (point.distance(circle.center) - circle.radius).abs() <= half_width
            }
            Primitive::Triangle(points) => {
                (0..3).any(|i| {
                    let edge = Line::new(points[i], points[(i + 1) % 3]);
                    segment_distance(edge, point) <= half_width
                })
            }
        }
    }

    /// Bounding box of the stroked outline.
    pub fn bounds(&self, half_width: f64) -> Rect {
        let rect = match self {
            Primitive::Segment(line) => Rect::from_points(line.p0, line.p1),
            Primitive::Rect(rect) => rect.abs(),
            Primitive::Circle(circle) => {
                let r = Vec2::new(circle.radius, circle.radius);
                Rect::from_points(circle.center - r, circle.center + r)
            }
            Primitive::Triangle([a, b, c]) => Rect::from_points(*a, *b).union_pt(*c),
        };
        rect.inflate(half_width, half_width)
    }
}

/// State of the stroke between pointer down and pointer up.
#[derive(Debug, Clone)]
struct ActiveStroke {
    tool: ToolKind,
    shape: ShapeKind,
    color: [u8; 4],
    params: StrokeParams,
    start: Point,
    last: Point,
    /// Surface contents when the stroke began, restored before each preview.
    pre_stroke: RgbaImage,
    /// Pixels already composited in the current paint pass.
    painted: Vec<bool>,
}

impl ActiveStroke {
    fn paint(&mut self, surface: &mut RasterSurface, primitive: Primitive) {
        let half_width = self.params.width / 2.0;
        let width = surface.width();
        let height = surface.height();
        let bounds = primitive.bounds(half_width);

        let x0 = bounds.x0.floor().max(0.0) as u32;
        let y0 = bounds.y0.floor().max(0.0) as u32;
        let x1 = (bounds.x1.ceil().max(0.0) as u32).min(width);
        let y1 = (bounds.y1.ceil().max(0.0) as u32).min(height);

        let image = surface.image_mut();
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = (y as usize) * (width as usize) + x as usize;
                if self.painted[idx] {
                    continue;
                }
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if !primitive.covers(center, half_width) {
                    continue;
                }
                let pixel = image.get_pixel_mut(x, y);
                *pixel = composite(*pixel, self.color, self.params.opacity, self.params.blend);
                self.painted[idx] = true;
            }
        }
    }
}

/// Paints strokes onto a [`RasterSurface`].
///
/// Freehand tools paint one segment per pointer sample. Shapes, and
/// freehand strokes with shift held, restore the pre-stroke pixels and
/// paint a single primitive so the preview leaves no trail.
#[derive(Debug, Default)]
pub struct StrokeRenderer {
    active: Option<ActiveStroke>,
}

impl StrokeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stroke is in progress.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start a stroke at `point`. Returns false if the tool does not draw
    /// or a stroke is already in progress.
    pub fn begin(&mut self, surface: &RasterSurface, tools: &ToolState, point: Point) -> bool {
        if self.active.is_some() {
            log::debug!("Stroke already in progress, ignoring begin");
            return false;
        }
        let Some(params) = tools.stroke_params() else {
            return false;
        };
        self.active = Some(ActiveStroke {
            tool: tools.tool,
            shape: tools.shape_kind,
            color: tools.color.to_rgba(),
            params,
            start: point,
            last: point,
            pre_stroke: surface.image().clone(),
            painted: vec![false; (surface.width() as usize) * (surface.height() as usize)],
        });
        true
    }

    /// Continue the stroke to `point`.
    pub fn extend(&mut self, surface: &mut RasterSurface, point: Point, modifiers: Modifiers) {
        let Some(stroke) = self.active.as_mut() else {
            return;
        };

        let straight = modifiers.shift && stroke.tool.is_freehand();
        if stroke.tool == ToolKind::Shape || straight {
            surface.restore(&stroke.pre_stroke);
            stroke.painted.fill(false);
            let primitive = if stroke.tool == ToolKind::Shape {
                Primitive::shape(stroke.shape, stroke.start, point)
            } else {
                Primitive::Segment(Line::new(stroke.start, point))
            };
            stroke.paint(surface, primitive);
        } else {
            let segment = Primitive::Segment(Line::new(stroke.last, point));
            stroke.paint(surface, segment);
        }
        stroke.last = point;
    }

    /// Finish the stroke, returning the snapshot to push. `None` when no
    /// stroke was in progress.
    pub fn end(&mut self, surface: &RasterSurface) -> RenderResult<Option<Snapshot>> {
        if self.active.take().is_none() {
            return Ok(None);
        }
        surface.encode().map(Some)
    }

    /// Drop the stroke in progress, restoring the pre-stroke pixels.
    pub fn cancel(&mut self, surface: &mut RasterSurface) {
        if let Some(stroke) = self.active.take() {
            surface.restore(&stroke.pre_stroke);
        }
    }
}

/// Composite `image` at `origin` and encode the result.
pub fn paint_image(
    surface: &mut RasterSurface,
    image: &RgbaImage,
    origin: Point,
) -> RenderResult<Snapshot> {
    surface.draw_image(image, origin);
    surface.encode()
}
