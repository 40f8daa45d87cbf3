//! The raster surface and its snapshot codec.

use crate::error::{RenderError, RenderResult};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use kurbo::Point;
use pagemark_core::{BoxFuture, Snapshot};
use std::io::Cursor;

/// Fixed-size RGBA bitmap owned by one editing session.
///
/// Starts fully transparent; "empty" means every pixel is `[0, 0, 0, 0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl RasterSurface {
    /// Create an empty surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Whether every pixel is fully transparent.
    pub fn is_empty(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        for p in self.pixels.pixels_mut() {
            *p = Rgba([0, 0, 0, 0]);
        }
    }

    /// Replace the contents with `image`, anchored at the origin. Parts of
    /// `image` outside the surface are dropped; uncovered pixels are empty.
    pub fn restore(&mut self, image: &RgbaImage) {
        if image.dimensions() == self.pixels.dimensions() {
            self.pixels.clone_from(image);
        } else {
            self.clear();
            imageops::replace(&mut self.pixels, image, 0, 0);
        }
    }

    /// Encode the current pixels as a lossless PNG snapshot.
    pub fn encode(&self) -> RenderResult<Snapshot> {
        let mut bytes = Vec::new();
        self.pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(Snapshot::from_bytes(bytes))
    }

    /// Alpha-composite `image` with its top-left at `origin`, scaled down
    /// (aspect preserved) if it is larger than the surface.
    pub fn draw_image(&mut self, image: &RgbaImage, origin: Point) {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        let scale = (self.width() as f64 / width as f64)
            .min(self.height() as f64 / height as f64)
            .min(1.0);
        let x = origin.x.round() as i64;
        let y = origin.y.round() as i64;
        if scale < 1.0 {
            let w = ((width as f64 * scale).floor() as u32).max(1);
            let h = ((height as f64 * scale).floor() as u32).max(1);
            let scaled = imageops::resize(image, w, h, FilterType::Triangle);
            imageops::overlay(&mut self.pixels, &scaled, x, y);
        } else {
            imageops::overlay(&mut self.pixels, image, x, y);
        }
    }
}

/// Decode arbitrary encoded image bytes (PNG, JPEG, WebP).
pub fn decode_image(bytes: &[u8]) -> RenderResult<RgbaImage> {
    if bytes.is_empty() {
        return Err(RenderError::InvalidSnapshot("empty image data".to_string()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Decode a snapshot into pixels.
pub fn decode_snapshot(snapshot: &Snapshot) -> RenderResult<RgbaImage> {
    decode_image(snapshot.as_bytes())
}

/// Decode a snapshot as a task. The pixels are only blitted by whoever
/// awaits it, so dropping the future cancels the restore.
pub fn decode_snapshot_async(snapshot: Snapshot) -> BoxFuture<'static, RenderResult<RgbaImage>> {
    Box::pin(async move { decode_snapshot(&snapshot) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 128])
            }
        })
    }

    #[test]
    fn test_new_surface_is_empty() {
        let surface = RasterSurface::new(16, 8);
        assert_eq!((surface.width(), surface.height()), (16, 8));
        assert!(surface.is_empty());
        assert_eq!(surface.pixel(15, 7), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(16, 0), None);
    }

    #[test]
    fn test_encode_decode_is_lossless() {
        let mut surface = RasterSurface::new(9, 7);
        surface.restore(&checker(9, 7));

        let snapshot = surface.encode().unwrap();
        let decoded = decode_snapshot(&snapshot).unwrap();
        assert_eq!(&decoded, surface.image());

        // Re-encoding the decoded pixels yields identical bytes
        let mut again = RasterSurface::new(9, 7);
        again.restore(&decoded);
        assert_eq!(again.encode().unwrap(), snapshot);
    }

    #[test]
    fn test_async_decode() {
        let mut surface = RasterSurface::new(4, 4);
        surface.restore(&checker(4, 4));
        let snapshot = surface.encode().unwrap();

        let decoded = pollster::block_on(decode_snapshot_async(snapshot)).unwrap();
        assert_eq!(&decoded, surface.image());
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_snapshot(&Snapshot::from_bytes(vec![1, 2, 3, 4])).is_err());
        assert!(matches!(decode_image(&[]), Err(RenderError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_restore_different_size() {
        let mut surface = RasterSurface::new(4, 4);
        surface.restore(&RgbaImage::from_pixel(8, 2, Rgba([1, 2, 3, 255])));
        assert_eq!(surface.pixel(3, 1), Some([1, 2, 3, 255]));
        assert_eq!(surface.pixel(3, 2), Some([0, 0, 0, 0]));
        assert_eq!((surface.width(), surface.height()), (4, 4));
    }

    #[test]
    fn test_clear() {
        let mut surface = RasterSurface::new(4, 4);
        surface.restore(&checker(4, 4));
        assert!(!surface.is_empty());
        surface.clear();
        assert!(surface.is_empty());
    }

    #[test]
    fn test_draw_image_at_origin_and_scaled() {
        let mut surface = RasterSurface::new(10, 10);
        let green = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        surface.draw_image(&green, Point::new(3.0, 4.0));
        assert_eq!(surface.pixel(3, 4), Some([0, 255, 0, 255]));
        assert_eq!(surface.pixel(4, 5), Some([0, 255, 0, 255]));
        assert_eq!(surface.pixel(5, 4), Some([0, 0, 0, 0]));

        // A 40x20 image is scaled to 10x5 to fit
        let mut surface = RasterSurface::new(10, 10);
        surface.draw_image(&RgbaImage::from_pixel(40, 20, Rgba([9, 9, 9, 255])), Point::ZERO);
        assert_eq!(surface.pixel(9, 4), Some([9, 9, 9, 255]));
        assert_eq!(surface.pixel(0, 5), Some([0, 0, 0, 0]));
    }
}
