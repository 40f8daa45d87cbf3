//! Pagemark Render Library
//!
//! CPU raster surface, snapshot codec, pixel compositing and the stroke
//! renderer with live shape preview.

mod composite;
mod error;
mod stroke;
mod surface;

pub use composite::composite;
pub use error::{RenderError, RenderResult};
pub use stroke::{Primitive, StrokeRenderer, paint_image};
pub use surface::{RasterSurface, decode_image, decode_snapshot, decode_snapshot_async};
