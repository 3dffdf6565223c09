//! Geometry checks run on the finished canvas before export

use image::RgbaImage;
use std::fmt;
use thiserror::Error;

use crate::style::Checks;

/// Canvas edge named in a padding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Top,
    Right,
    Bottom,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Edge::Left => "left",
            Edge::Top => "top",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
        })
    }
}

/// Bounding box of visible content; `right` and `bottom` are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})..({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Corner pixel ({x}, {y}) has alpha {alpha}, expected a fully transparent corner")]
    OpaqueCorner { x: u32, y: u32, alpha: u8 },

    #[error("No pixel has alpha above {threshold}; the canvas is empty")]
    EmptyCanvas { threshold: u8 },

    #[error("Content is {padding}px from the {edge} edge, at least {required}px required")]
    InsufficientPadding {
        edge: Edge,
        padding: u32,
        required: u32,
    },
}

/// The four corner coordinates, clockwise from the top left
pub fn corners(image: &RgbaImage) -> Vec<(u32, u32)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (r, b) = (width - 1, height - 1);
    vec![(0, 0), (r, 0), (r, b), (0, b)]
}

/// Bounding box of pixels whose alpha is above `threshold`
pub fn content_bounds(image: &RgbaImage, threshold: u8) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] <= threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => Bounds {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(b) => Bounds {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x + 1),
                bottom: b.bottom.max(y + 1),
            },
        });
    }

    bounds
}

/// Check corner transparency, then content padding
///
/// Returns the content bounds so callers can report them.
pub fn validate(image: &RgbaImage, checks: &Checks) -> Result<Bounds, ValidationError> {
    for (x, y) in corners(image) {
        let alpha = image.get_pixel(x, y)[3];
        if alpha != 0 {
            return Err(ValidationError::OpaqueCorner { x, y, alpha });
        }
    }

    let threshold = checks.alpha_threshold;
    let bounds =
        content_bounds(image, threshold).ok_or(ValidationError::EmptyCanvas { threshold })?;

    let (width, height) = image.dimensions();
    let margins = [
        (Edge::Left, bounds.left),
        (Edge::Top, bounds.top),
        (Edge::Right, width - bounds.right),
        (Edge::Bottom, height - bounds.bottom),
    ];
    for (edge, padding) in margins {
        if padding < checks.min_padding {
            return Err(ValidationError::InsufficientPadding {
                edge,
                padding,
                required: checks.min_padding,
            });
        }
    }

    Ok(bounds)
}
