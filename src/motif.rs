//! Foreground motif: circle backdrop, checkmark and progress bar

use image::RgbaImage;

use crate::{
    raster::{capsule_coverage, circle_coverage, paint, rounded_rect_coverage, RectF},
    style::Style,
};

/// Width of the progress fill for a track of `bar_width`
///
/// Truncates toward zero and never leaves `0..=bar_width`.
pub fn fill_width(bar_width: f32, fraction: f32) -> f32 {
    (bar_width * fraction).floor().clamp(0., bar_width.max(0.))
}

/// Where the progress track and fill land on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLayout {
    pub track: RectF,
    pub fill: RectF,
    /// Corner radius of the track
    pub radius: f32,
}

impl BarLayout {
    pub fn new(style: &Style) -> Self {
        let g = &style.geometry;
        let (cx, cy) = g.motif_center();
        let x0 = (cx - g.bar_width / 2.).floor();
        let y0 = cy + g.bar_offset_y;
        let track = RectF::new(x0, y0, x0 + g.bar_width, y0 + g.bar_height);
        let fill = RectF::new(
            x0,
            y0,
            x0 + fill_width(g.bar_width, g.fill_fraction),
            track.y1,
        );

        Self {
            track,
            fill,
            radius: g.bar_radius,
        }
    }
}

/// Draw the motif in order: backdrop, checkmark, track, fill
pub fn draw_motif(canvas: &mut RgbaImage, style: &Style) {
    draw_backdrop(canvas, style);
    draw_checkmark(canvas, style);
    draw_progress_bar(canvas, style);
}

fn draw_backdrop(canvas: &mut RgbaImage, style: &Style) {
    let g = &style.geometry;
    let (cx, cy) = g.motif_center();
    let r = g.circle_radius;

    paint(
        canvas,
        RectF::around(cx, cy, r, r).outset(1.),
        style.palette.accent,
        g.circle_opacity,
        |px, py| circle_coverage(px, py, cx, cy, r),
    );
}

/// Two strokes sharing the middle point. Coverage is the maximum of both
/// so the rounded joint is painted once.
fn draw_checkmark(canvas: &mut RgbaImage, style: &Style) {
    let g = &style.geometry;
    let (cx, cy) = g.motif_center();
    let [a, b, c] = g.check_points.map(|[x, y]| (cx + x, cy + y));
    let half = g.check_width / 2.;

    let xs = [a.0, b.0, c.0];
    let ys = [a.1, b.1, c.1];
    let area = RectF::new(
        xs.iter().copied().fold(f32::INFINITY, f32::min),
        ys.iter().copied().fold(f32::INFINITY, f32::min),
        xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    )
    .outset(half + 1.);

    paint(canvas, area, style.palette.accent, 1., |px, py| {
        capsule_coverage(px, py, a, b, g.check_width)
            .max(capsule_coverage(px, py, b, c, g.check_width))
    });
}

fn draw_progress_bar(canvas: &mut RgbaImage, style: &Style) {
    let g = &style.geometry;
    let bar = BarLayout::new(style);

    paint(
        canvas,
        bar.track.outset(1.),
        style.palette.gray,
        g.track_opacity,
        |px, py| rounded_rect_coverage(px, py, bar.track, bar.radius),
    );

    if bar.fill.width() > 0. {
        paint(
            canvas,
            bar.fill.outset(1.),
            style.palette.accent,
            1.,
            |px, py| rounded_rect_coverage(px, py, bar.fill, bar.radius),
        );
    }
}
