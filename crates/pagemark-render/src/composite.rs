//! Per-pixel compositing for the three brush blend modes.

use image::Rgba;
use pagemark_core::BlendMode;

fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Source-over of `src` (straight alpha `src_a`) onto `base`.
fn source_over(base: Rgba<u8>, src: [f32; 3], src_a: f32) -> Rgba<u8> {
    let base_a = to_unit(base[3]);
    let out_a = src_a + base_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let cb = to_unit(base[i]);
        to_byte((src[i] * src_a + cb * base_a * (1.0 - src_a)) / out_a)
    };
    Rgba([channel(0), channel(1), channel(2), to_byte(out_a)])
}

/// Composite `color` at `opacity` onto `base`.
///
/// `Multiply` mixes the source with the backdrop where the backdrop has
/// coverage (W3C separable blending) before source-over, so a translucent
/// stroke over empty pixels keeps its own color. `Erase` is destination-out
/// and leaves color channels alone.
pub fn composite(base: Rgba<u8>, color: [u8; 4], opacity: f32, blend: BlendMode) -> Rgba<u8> {
    let src_a = to_unit(color[3]) * opacity.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return base;
    }
    let src = [to_unit(color[0]), to_unit(color[1]), to_unit(color[2])];

    match blend {
        BlendMode::Normal => source_over(base, src, src_a),
        BlendMode::Multiply => {
            let base_a = to_unit(base[3]);
            let mixed = [0usize, 1, 2].map(|i| {
                let cb = to_unit(base[i]);
                (1.0 - base_a) * src[i] + base_a * (src[i] * cb)
            });
            source_over(base, mixed, src_a)
        }
        BlendMode::Erase => {
            let out_a = to_unit(base[3]) * (1.0 - src_a);
            if out_a <= 0.0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([base[0], base[1], base[2], to_byte(out_a)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn close(a: Rgba<u8>, b: [u8; 4]) -> bool {
        a.0.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 1)
    }

    #[test]
    fn test_normal_opaque_overwrites() {
        let ink = [10, 20, 30, 255];
        assert_eq!(composite(WHITE, ink, 1.0, BlendMode::Normal), Rgba(ink));
        assert_eq!(composite(CLEAR, ink, 1.0, BlendMode::Normal), Rgba(ink));
    }

    #[test]
    fn test_normal_half_opacity() {
        let out = composite(WHITE, [0, 0, 0, 255], 0.5, BlendMode::Normal);
        assert!(close(out, [128, 128, 128, 255]), "{:?}", out);
    }

    #[test]
    fn test_multiply_over_white_tints() {
        let out = composite(WHITE, [255, 0, 0, 255], 0.35, BlendMode::Multiply);
        assert!(close(out, [255, 166, 166, 255]), "{:?}", out);
    }

    #[test]
    fn test_multiply_darkens_dark_backdrop() {
        // Yellow over blue multiplies to black, blended at 35%
        let blue = Rgba([0, 0, 255, 255]);
        let out = composite(blue, [255, 255, 0, 255], 0.35, BlendMode::Multiply);
        assert!(close(out, [0, 0, 166, 255]), "{:?}", out);
    }

    #[test]
    fn test_multiply_over_empty_keeps_color() {
        let out = composite(CLEAR, [254, 240, 138, 255], 0.35, BlendMode::Multiply);
        assert!(close(out, [254, 240, 138, 89]), "{:?}", out);
    }

    #[test]
    fn test_erase_never_adds_color() {
        let red = Rgba([200, 10, 10, 255]);
        for color in [[0, 0, 0, 255], [255, 255, 255, 255], [0, 255, 0, 255]] {
            assert_eq!(composite(red, color, 1.0, BlendMode::Erase), CLEAR);
            assert_eq!(composite(CLEAR, color, 1.0, BlendMode::Erase), CLEAR);
        }

        let partial = composite(red, [0, 255, 0, 255], 0.5, BlendMode::Erase);
        assert_eq!(&partial.0[..3], &[200, 10, 10]);
        assert!(partial[3] < 255);
    }

    #[test]
    fn test_transparent_source_is_noop() {
        let base = Rgba([1, 2, 3, 4]);
        assert_eq!(composite(base, [9, 9, 9, 0], 1.0, BlendMode::Normal), base);
        assert_eq!(composite(base, [9, 9, 9, 255], 0.0, BlendMode::Multiply), base);
    }
}
