//! Raster building blocks for the compositor
//!
//! Shapes are rasterized from signed distances measured at pixel centers,
//! which gives one pixel of anti-aliasing on every edge. Layers are plain
//! `RgbaImage`s combined with source-over compositing.

use anyhow::Result;
use image::{
    imageops::{self, FilterType},
    GrayImage, ImageBuffer, Luma, Rgb, Rgba, Rgba32FImage, RgbImage, RgbaImage,
};

use crate::style::Color;

/// Axis-aligned rectangle in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl RectF {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn around(cx: f32, cy: f32, rx: f32, ry: f32) -> Self {
        Self::new(cx - rx, cy - ry, cx + rx, cy + ry)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Grow by `d` on every side
    pub fn outset(&self, d: f32) -> Self {
        Self::new(self.x0 - d, self.y0 - d, self.x1 + d, self.y1 + d)
    }
}

/// Pixel coverage for a signed distance (negative inside)
#[inline]
fn coverage(distance: f32) -> f32 {
    (0.5 - distance).clamp(0., 1.)
}

/// Coverage of a rounded rectangle at point `(px, py)`
///
/// The radius is clamped to half of the shorter side.
pub fn rounded_rect_coverage(px: f32, py: f32, rect: RectF, radius: f32) -> f32 {
    let hw = rect.width() / 2.;
    let hh = rect.height() / 2.;
    if hw <= 0. || hh <= 0. {
        return 0.;
    }
    let r = radius.clamp(0., hw.min(hh));

    let qx = (px - (rect.x0 + hw)).abs() - hw + r;
    let qy = (py - (rect.y0 + hh)).abs() - hh + r;
    let outside = qx.max(0.).hypot(qy.max(0.));
    let inside = qx.max(qy).min(0.);

    coverage(outside + inside - r)
}

/// Coverage of a filled circle
pub fn circle_coverage(px: f32, py: f32, cx: f32, cy: f32, radius: f32) -> f32 {
    coverage((px - cx).hypot(py - cy) - radius)
}

/// Coverage of a stroke from `a` to `b` with round caps
pub fn capsule_coverage(px: f32, py: f32, a: (f32, f32), b: (f32, f32), width: f32) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0. {
        (((px - a.0) * dx + (py - a.1) * dy) / len_sq).clamp(0., 1.)
    } else {
        0.
    };
    let (nx, ny) = (a.0 + dx * t, a.1 + dy * t);
    coverage((px - nx).hypot(py - ny) - width / 2.)
}

/// Blend `src` over `dst`, with the source alpha further scaled by `opacity`
///
/// Works on premultiplied values, so per channel
/// `dst = src * src_alpha + dst * (1 - src_alpha)` and alpha accumulates
/// the same way.
pub fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let sa = src[3] as f32 / 255. * opacity.clamp(0., 1.);
    if sa <= 0. {
        return;
    }
    let da = dst[3] as f32 / 255.;
    let out_a = sa + da * (1. - sa);

    for c in 0..3 {
        let premultiplied = src[c] as f32 * sa + dst[c] as f32 * da * (1. - sa);
        dst[c] = (premultiplied / out_a).round().clamp(0., 255.) as u8;
    }
    dst[3] = (out_a * 255.).round().clamp(0., 255.) as u8;
}

/// Composite a whole layer over the canvas
pub fn composite_over(canvas: &mut RgbaImage, layer: &RgbaImage) -> Result<()> {
    if canvas.dimensions() != layer.dimensions() {
        anyhow::bail!(
            "Layer is {:?} but the canvas is {:?}",
            layer.dimensions(),
            canvas.dimensions()
        );
    }

    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        blend_pixel(dst, *src, 1.);
    }
    Ok(())
}

/// Paint `color` wherever `shape` reports coverage, inside `area`
///
/// `shape` receives pixel centers; `area` only bounds the scan and is
/// clipped to the canvas.
pub fn paint<F>(canvas: &mut RgbaImage, area: RectF, color: Color, opacity: f32, shape: F)
where
    F: Fn(f32, f32) -> f32,
{
    let (width, height) = canvas.dimensions();
    let span = |lo: f32, hi: f32, max: u32| {
        let lo = lo.floor().max(0.) as u32;
        let hi = (hi.ceil().max(0.) as u32).min(max);
        lo.min(hi)..hi
    };

    for y in span(area.y0, area.y1, height) {
        for x in span(area.x0, area.x1, width) {
            let cov = shape(x as f32 + 0.5, y as f32 + 0.5);
            if cov > 0. {
                blend_pixel(canvas.get_pixel_mut(x, y), color.0, opacity * cov);
            }
        }
    }
}

/// Single-channel mask of a rounded rectangle on a `size` x `size` canvas
pub fn rounded_rect_mask(size: u32, rect: RectF, radius: f32) -> GrayImage {
    ImageBuffer::from_fn(size, size, |x, y| {
        let cov = rounded_rect_coverage(x as f32 + 0.5, y as f32 + 0.5, rect, radius);
        Luma([(cov * 255.).round() as u8])
    })
}

/// Rows interpolated linearly from `top` (row 0) to `bottom` (last row)
///
/// A single row is the top color.
pub fn vertical_gradient(width: u32, height: u32, top: Rgb<u8>, bottom: Rgb<u8>) -> RgbImage {
    let last = height.saturating_sub(1);
    let rows: Vec<Rgb<u8>> = (0..height)
        .map(|y| {
            if last == 0 {
                return top;
            }
            let t = y as f32 / last as f32;
            let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            Rgb([
                lerp(top[0], bottom[0]),
                lerp(top[1], bottom[1]),
                lerp(top[2], bottom[2]),
            ])
        })
        .collect();

    ImageBuffer::from_fn(width, height, |_, y| rows[y as usize])
}

/// Promote to RGBA, taking alpha from the mask
pub fn clip_to_mask(rgb: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    if rgb.dimensions() != mask.dimensions() {
        anyhow::bail!(
            "Mask is {:?} but the image is {:?}",
            mask.dimensions(),
            rgb.dimensions()
        );
    }

    Ok(ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        Rgba([r, g, b, mask.get_pixel(x, y)[0]])
    }))
}

/// Soft drop shadow cast by `mask`
///
/// The mask is dimmed by `opacity`, blurred with a Gaussian of sigma `blur`
/// and moved down by `offset_y` onto a fresh transparent layer. With
/// `reduce > 1` the blur runs on a copy shrunk by that factor, which keeps
/// large supersampled blurs cheap. The mask itself is left untouched.
pub fn drop_shadow(
    mask: &GrayImage,
    color: Color,
    opacity: f32,
    blur: f32,
    offset_y: f32,
    reduce: u32,
) -> RgbaImage {
    let (width, height) = mask.dimensions();
    let dimmed: GrayImage = ImageBuffer::from_fn(width, height, |x, y| {
        Luma([(mask.get_pixel(x, y)[0] as f32 * opacity).round() as u8])
    });

    let reduce = reduce.max(1);
    let blurred = if blur <= 0. {
        dimmed
    } else if reduce == 1 {
        imageops::blur(&dimmed, blur)
    } else {
        let small = imageops::resize(
            &dimmed,
            (width / reduce).max(1),
            (height / reduce).max(1),
            FilterType::Triangle,
        );
        let small = imageops::blur(&small, blur / reduce as f32);
        imageops::resize(&small, width, height, FilterType::Triangle)
    };

    let Rgb([r, g, b]) = color.to_rgb();
    let shift = offset_y.round() as i64;
    ImageBuffer::from_fn(width, height, |x, y| {
        let src_y = y as i64 - shift;
        if src_y < 0 || src_y >= height as i64 {
            return Rgba([0, 0, 0, 0]);
        }
        match blurred.get_pixel(x, src_y as u32)[0] {
            0 => Rgba([0, 0, 0, 0]),
            alpha => Rgba([r, g, b, alpha]),
        }
    })
}

/// Glossy highlight: an ellipse fading from `opacity` at its center to
/// nothing at its rim, clipped by `mask`
pub fn highlight_layer(
    mask: &GrayImage,
    center: (f32, f32),
    radii: [f32; 2],
    color: Color,
    opacity: f32,
) -> RgbaImage {
    let (width, height) = mask.dimensions();
    let mut layer = RgbaImage::new(width, height);
    let [rx, ry] = radii;
    if rx <= 0. || ry <= 0. {
        return layer;
    }

    let area = RectF::around(center.0, center.1, rx, ry).outset(1.);
    paint(&mut layer, area, color, opacity, |px, py| {
        let k = ((px - center.0) / rx).hypot((py - center.1) / ry);
        if k >= 1. {
            return 0.;
        }
        let clip = mask.get_pixel(px as u32, py as u32)[0] as f32 / 255.;
        (1. - k * k) * clip
    });
    layer
}

/// Resize with Lanczos3 on premultiplied color
///
/// Premultiplying keeps the transparent surroundings from bleeding dark
/// fringes into anti-aliased edges.
pub fn resample(image: &RgbaImage, size: u32) -> RgbaImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }

    let premultiplied: Rgba32FImage =
        ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
            let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
            let alpha = a as f32 / 255.;
            Rgba([
                r as f32 / 255. * alpha,
                g as f32 / 255. * alpha,
                b as f32 / 255. * alpha,
                alpha,
            ])
        });
    let scaled = imageops::resize(&premultiplied, size, size, FilterType::Lanczos3);

    ImageBuffer::from_fn(size, size, |x, y| {
        let Rgba([r, g, b, a]) = *scaled.get_pixel(x, y);
        let alpha = (a.clamp(0., 1.) * 255.).round() as u8;
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let a = alpha as f32 / 255.;
        let channel = |v: f32| ((v / a).clamp(0., 1.) * 255.).round() as u8;
        Rgba([channel(r), channel(g), channel(b), alpha])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_rect_mask_corners_and_center() {
        let rect = RectF::new(8., 8., 56., 56.);
        let mask = rounded_rect_mask(64, rect, 12.);

        assert_eq!(mask.get_pixel(32, 32)[0], 255);
        assert_eq!(mask.get_pixel(32, 8)[0], 255);
        assert_eq!(mask.get_pixel(32, 7)[0], 0);
        // Inside the bounding square but outside the rounded corner
        assert_eq!(mask.get_pixel(9, 9)[0], 0);
        for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63)] {
            assert_eq!(mask.get_pixel(x, y)[0], 0);
        }
    }

    #[test]
    fn test_full_canvas_mask_with_oversized_radius() {
        let mask = rounded_rect_mask(32, RectF::new(0., 0., 32., 32.), 100.);
        // Radius clamps to 16: a disc touching all four edges
        assert!(mask.get_pixel(16, 0)[0] >= 250);
        assert_eq!(mask.get_pixel(16, 16)[0], 255);
        assert_eq!(mask.get_pixel(16, 31)[0], mask.get_pixel(16, 0)[0]);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_gradient_endpoints_and_monotonic_rows() {
        let top = Rgb([250, 10, 128]);
        let bottom = Rgb([50, 200, 128]);
        let gradient = vertical_gradient(3, 17, top, bottom);

        assert_eq!(*gradient.get_pixel(0, 0), top);
        assert_eq!(*gradient.get_pixel(2, 16), bottom);
        for y in 1..17 {
            let prev = gradient.get_pixel(1, y - 1);
            let cur = gradient.get_pixel(1, y);
            assert!(cur[0] <= prev[0], "red must not increase at row {y}");
            assert!(cur[1] >= prev[1], "green must not decrease at row {y}");
            assert_eq!(cur[2], 128);
        }
    }

    #[test]
    fn test_gradient_single_row_is_top_color() {
        let top = Rgb([1, 2, 3]);
        let gradient = vertical_gradient(4, 1, top, Rgb([200, 200, 200]));
        assert!(gradient.pixels().all(|p| *p == top));
        assert_eq!(vertical_gradient(4, 0, top, top).height(), 0);
    }

    #[test]
    fn test_blend_pixel_over_opaque_and_transparent() {
        let mut dst = Rgba([0, 0, 255, 255]);
        blend_pixel(&mut dst, Rgba([255, 0, 0, 255]), 0.5);
        assert_eq!(dst, Rgba([128, 0, 128, 255]));

        let mut empty = Rgba([0, 0, 0, 0]);
        blend_pixel(&mut empty, Rgba([255, 255, 255, 255]), 0.25);
        assert_eq!(empty, Rgba([255, 255, 255, 64]));

        let mut untouched = Rgba([9, 9, 9, 9]);
        blend_pixel(&mut untouched, Rgba([255, 255, 255, 0]), 1.);
        assert_eq!(untouched, Rgba([9, 9, 9, 9]));
    }

    #[test]
    fn test_composite_over_rejects_mismatched_layers() {
        let mut canvas = RgbaImage::new(4, 4);
        assert!(composite_over(&mut canvas, &RgbaImage::new(4, 5)).is_err());

        let layer = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        composite_over(&mut canvas, &layer).unwrap();
        assert!(canvas.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_clip_to_mask_uses_mask_as_alpha() {
        let rgb = RgbImage::from_pixel(2, 1, Rgb([7, 8, 9]));
        let mask = GrayImage::from_raw(2, 1, vec![0, 200]).unwrap();
        let clipped = clip_to_mask(&rgb, &mask).unwrap();

        assert_eq!(*clipped.get_pixel(0, 0), Rgba([7, 8, 9, 0]));
        assert_eq!(*clipped.get_pixel(1, 0), Rgba([7, 8, 9, 200]));
        assert!(clip_to_mask(&rgb, &GrayImage::new(1, 1)).is_err());
    }

    #[test]
    fn test_drop_shadow_dims_blurs_and_offsets() {
        let rect = RectF::new(16., 16., 48., 48.);
        let mask = rounded_rect_mask(64, rect, 6.);
        let before = mask.clone();
        let shadow = drop_shadow(&mask, Color::rgb(0, 0, 0), 0.5, 2., 4., 1);

        assert_eq!(mask, before);
        assert_eq!(shadow.dimensions(), (64, 64));
        // Dimmed to about half opacity in the middle
        let center = shadow.get_pixel(32, 36)[3];
        assert!((120..=135).contains(&center), "center alpha {center}");
        // Offset downward: more shadow below the body than above it
        assert!(shadow.get_pixel(32, 50)[3] > shadow.get_pixel(32, 13)[3]);
        // Blur spreads past the hard edge
        assert!(shadow.get_pixel(32, 52)[3] > 0);
        assert_eq!(shadow.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_drop_shadow_reduced_blur_keeps_size() {
        let mask = rounded_rect_mask(128, RectF::new(32., 32., 96., 96.), 10.);
        let shadow = drop_shadow(&mask, Color::rgb(0, 0, 0), 0.3, 8., 6., 4);
        assert_eq!(shadow.dimensions(), (128, 128));
        assert!(shadow.get_pixel(64, 70)[3] > 0);
        assert_eq!(shadow.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_highlight_is_clipped_and_soft() {
        let mask = rounded_rect_mask(64, RectF::new(8., 8., 56., 56.), 8.);
        let layer = highlight_layer(&mask, (32., 8.), [40., 20.], Color::rgb(255, 255, 255), 0.5);

        let near_center = layer.get_pixel(32, 9)[3];
        let near_rim = layer.get_pixel(32, 26)[3];
        assert!(near_center > near_rim);
        assert!(near_center <= 128);
        // Above the body the mask is empty
        assert_eq!(layer.get_pixel(32, 4)[3], 0);
        // Below the ellipse nothing is drawn
        assert_eq!(layer.get_pixel(32, 40)[3], 0);
    }

    #[test]
    fn test_capsule_has_round_caps() {
        let a = (10., 10.);
        let b = (30., 10.);
        assert_eq!(capsule_coverage(20.5, 10.5, a, b, 8.), 1.);
        assert_eq!(capsule_coverage(7.5, 10.5, a, b, 8.), 1.);
        assert_eq!(capsule_coverage(20.5, 20.5, a, b, 8.), 0.);
        // Degenerate segment is a dot
        assert_eq!(capsule_coverage(10.5, 10.5, a, a, 4.), 1.);
    }

    #[test]
    fn test_resample_preserves_size_and_alpha() {
        let mut image = RgbaImage::new(64, 64);
        paint(
            &mut image,
            RectF::new(16., 16., 48., 48.),
            Color::rgb(200, 40, 40),
            1.,
            |_, _| 1.,
        );

        let small = resample(&image, 16);
        assert_eq!(small.dimensions(), (16, 16));
        assert_eq!(small.get_pixel(0, 0)[3], 0);
        assert_eq!(*small.get_pixel(8, 8), Rgba([200, 40, 40, 255]));
        assert_eq!(resample(&image, 64), image);
    }
}
