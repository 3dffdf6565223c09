//! Icon style: palette, geometry and validation thresholds
//!
//! Every constant that shapes the rendered icon lives here. The built-in
//! house style is tuned for a 1024x1024 canvas; a JSON file can override any
//! subset of it. Colors are written in CSS syntax.

use anyhow::{Context, Result};
use image::{Rgb, Rgba};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, fs, path::Path, str::FromStr};

use crate::raster::RectF;

/// An 8-bit RGBA color, (de)serialized as a CSS color string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub Rgba<u8>);

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(Rgba([red, green, blue, 255]))
    }

    /// The color without its alpha channel
    pub fn to_rgb(self) -> Rgb<u8> {
        let [r, g, b, _] = self.0 .0;
        Rgb([r, g, b])
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let color = css_color::Srgb::from_str(s.trim())
            .map_err(|_| anyhow::anyhow!("Invalid CSS color: {:?}", s))?;
        let channel = |v: f32| (v * 255.).round().clamp(0., 255.) as u8;
        Ok(Self(Rgba([
            channel(color.red),
            channel(color.green),
            channel(color.blue),
            channel(color.alpha),
        ])))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0 .0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Colors used by the compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Palette {
    /// Body gradient, first row
    pub background_top: Color,
    /// Body gradient, last row
    pub background_bottom: Color,
    /// Checkmark stroke, progress fill and circle tint
    pub accent: Color,
    /// Progress track tint
    pub gray: Color,
    pub highlight: Color,
    pub shadow: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background_top: Color::rgb(253, 252, 249),
            background_bottom: Color::rgb(235, 232, 225),
            accent: Color::rgb(47, 111, 94),
            gray: Color::rgb(120, 120, 120),
            highlight: Color::rgb(255, 255, 255),
            shadow: Color::rgb(0, 0, 0),
        }
    }
}

/// Shape placement, in pixels of a `size` x `size` canvas
///
/// Motif coordinates are relative to the motif center, which sits at the
/// canvas center moved down by `motif_offset_y` (negative moves it up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Geometry {
    pub size: u32,
    /// Distance from every canvas edge to the rounded body
    pub inset: f32,
    pub corner_radius: f32,

    pub shadow_opacity: f32,
    /// Gaussian sigma of the shadow blur
    pub shadow_blur: f32,
    /// Downward shift of the shadow
    pub shadow_offset: f32,

    /// Vertical distance from the body top to the highlight center
    pub highlight_offset_y: f32,
    /// Horizontal and vertical highlight radii
    pub highlight_radii: [f32; 2],
    /// Highlight opacity at its center; fades to zero at the rim
    pub highlight_opacity: f32,

    pub motif_offset_y: f32,
    pub circle_radius: f32,
    pub circle_opacity: f32,

    /// Start, joint and end of the checkmark stroke
    pub check_points: [[f32; 2]; 3],
    pub check_width: f32,

    pub bar_width: f32,
    pub bar_height: f32,
    pub bar_radius: f32,
    /// Distance from the motif center to the top of the progress bar
    pub bar_offset_y: f32,
    pub track_opacity: f32,
    /// Share of the track covered by the fill
    pub fill_fraction: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            size: 1024,
            inset: 100.,
            corner_radius: 185.,

            shadow_opacity: 0.30,
            shadow_blur: 12.,
            shadow_offset: 10.,

            highlight_offset_y: 50.,
            highlight_radii: [560., 360.],
            highlight_opacity: 0.30,

            motif_offset_y: -40.,
            circle_radius: 200.,
            circle_opacity: 0.14,

            check_points: [[-110., 10.], [-20., 105.], [145., -75.]],
            check_width: 56.,

            bar_width: 480.,
            bar_height: 52.,
            bar_radius: 26.,
            bar_offset_y: 300.,
            track_opacity: 0.22,
            fill_fraction: 0.72,
        }
    }
}

impl Geometry {
    /// The rounded body, inset from every canvas edge
    pub fn body_rect(&self) -> RectF {
        let size = self.size as f32;
        RectF::new(self.inset, self.inset, size - self.inset, size - self.inset)
    }

    /// Center of the circle backdrop; checkmark and bar are placed from here
    pub fn motif_center(&self) -> (f32, f32) {
        let half = self.size as f32 / 2.;
        (half, half + self.motif_offset_y)
    }
}

/// Thresholds checked on the final canvas before anything is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Checks {
    /// Alpha values at or below this count as empty when measuring content
    pub alpha_threshold: u8,
    /// Minimum distance between visible content and each canvas edge
    pub min_padding: u32,
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            alpha_threshold: 16,
            min_padding: 72,
        }
    }
}

impl Checks {
    /// Default thresholds with the padding scaled to a `size` canvas
    pub fn for_size(size: u32) -> Self {
        let checks = Self::default();
        let base = Geometry::default().size as f32;
        Self {
            min_padding: (checks.min_padding as f32 * size as f32 / base).round() as u32,
            ..checks
        }
    }
}

/// Everything the compositor needs to draw and check one icon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub palette: Palette,
    pub geometry: Geometry,
    pub checks: Checks,
}

impl Style {
    /// Load a style from a JSON file; fields it omits keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read style file {}", path.display()))?;
        let style: Style = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse style file {}", path.display()))?;
        style.check()?;
        Ok(style)
    }

    /// Reject geometry the compositor cannot draw
    pub fn check(&self) -> Result<()> {
        let g = &self.geometry;
        if g.size == 0 {
            anyhow::bail!("Canvas size must be positive");
        }
        if g.inset < 0. || g.inset * 2. >= g.size as f32 {
            anyhow::bail!(
                "Body inset {} leaves no room on a {}px canvas",
                g.inset,
                g.size
            );
        }

        let lengths = [
            ("corner_radius", g.corner_radius),
            ("shadow_blur", g.shadow_blur),
            ("circle_radius", g.circle_radius),
            ("check_width", g.check_width),
            ("bar_width", g.bar_width),
            ("bar_height", g.bar_height),
            ("bar_radius", g.bar_radius),
            ("highlight_radii[0]", g.highlight_radii[0]),
            ("highlight_radii[1]", g.highlight_radii[1]),
        ];
        for (name, value) in lengths {
            if !(value >= 0.) {
                anyhow::bail!("{name} must be a non-negative length, got {value}");
            }
        }

        let fractions = [
            ("shadow_opacity", g.shadow_opacity),
            ("highlight_opacity", g.highlight_opacity),
            ("circle_opacity", g.circle_opacity),
            ("track_opacity", g.track_opacity),
            ("fill_fraction", g.fill_fraction),
        ];
        for (name, value) in fractions {
            if !(0. ..=1.).contains(&value) {
                anyhow::bail!("{name} must be within 0..=1, got {value}");
            }
        }

        Ok(())
    }

    /// The same style with every length multiplied by `factor`
    ///
    /// Opacities, the fill fraction and the alpha threshold are unitless and
    /// stay as they are. Used for the supersampled pass.
    pub fn scaled(&self, factor: f32) -> Self {
        let g = &self.geometry;
        let s = |v: f32| v * factor;
        let point = |[x, y]: [f32; 2]| [s(x), s(y)];

        Self {
            palette: self.palette.clone(),
            geometry: Geometry {
                size: (g.size as f32 * factor).round() as u32,
                inset: s(g.inset),
                corner_radius: s(g.corner_radius),
                shadow_opacity: g.shadow_opacity,
                shadow_blur: s(g.shadow_blur),
                shadow_offset: s(g.shadow_offset),
                highlight_offset_y: s(g.highlight_offset_y),
                highlight_radii: point(g.highlight_radii),
                highlight_opacity: g.highlight_opacity,
                motif_offset_y: s(g.motif_offset_y),
                circle_radius: s(g.circle_radius),
                circle_opacity: g.circle_opacity,
                check_points: g.check_points.map(point),
                check_width: s(g.check_width),
                bar_width: s(g.bar_width),
                bar_height: s(g.bar_height),
                bar_radius: s(g.bar_radius),
                bar_offset_y: s(g.bar_offset_y),
                track_opacity: g.track_opacity,
                fill_fraction: g.fill_fraction,
            },
            checks: Checks {
                alpha_threshold: self.checks.alpha_threshold,
                min_padding: (self.checks.min_padding as f32 * factor).round() as u32,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        let accent: Color = "#2f6f5e".parse().unwrap();
        assert_eq!(accent, Color::rgb(47, 111, 94));
        assert_eq!(accent.to_string(), "#2f6f5e");
        assert_eq!(accent.to_rgb(), Rgb([47, 111, 94]));

        assert!("definitely-not-a-color".parse::<Color>().is_err());
    }

    #[test]
    fn test_default_style_roundtrips_through_json() {
        let style = Style::default();
        let json = serde_json::to_string_pretty(&style).unwrap();
        assert!(json.contains("\"accent\": \"#2f6f5e\""));

        let parsed: Style = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, style);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = r##"{
            "palette": { "accent": "#1d4ed8" },
            "geometry": { "fill_fraction": 0.5 }
        }"##;
        let style: Style = serde_json::from_str(json).unwrap();

        assert_eq!(style.palette.accent, Color::rgb(29, 78, 216));
        assert_eq!(style.palette.gray, Palette::default().gray);
        assert_eq!(style.geometry.fill_fraction, 0.5);
        assert_eq!(style.geometry.size, 1024);
        assert_eq!(style.checks, Checks::default());
    }

    #[test]
    fn test_unknown_fields_and_bad_colors_are_rejected() {
        assert!(serde_json::from_str::<Style>(r#"{ "geometry": { "insett": 3 } }"#).is_err());
        assert!(
            serde_json::from_str::<Style>(r#"{ "palette": { "accent": "greenish" } }"#).is_err()
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.json");
        std::fs::write(&path, r#"{ "checks": { "min_padding": 40 } }"#).unwrap();

        let style = Style::load(&path).unwrap();
        assert_eq!(style.checks.min_padding, 40);
        assert_eq!(style.geometry, Geometry::default());

        let missing = Style::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read style file"));
    }

    #[test]
    fn test_check_rejects_impossible_geometry() {
        assert!(Style::default().check().is_ok());

        let mut style = Style::default();
        style.geometry.inset = 600.;
        assert!(style.check().is_err());

        let mut style = Style::default();
        style.geometry.fill_fraction = 1.5;
        assert!(style.check().is_err());

        let mut style = Style::default();
        style.geometry.check_width = -1.;
        assert!(style.check().is_err());
    }

    #[test]
    fn test_scaled_multiplies_lengths_only() {
        let style = Style::default().scaled(4.);
        let g = &style.geometry;

        assert_eq!(g.size, 4096);
        assert_eq!(g.inset, 400.);
        assert_eq!(g.shadow_blur, 48.);
        assert_eq!(g.check_points[1], [-80., 420.]);
        assert_eq!(g.fill_fraction, 0.72);
        assert_eq!(g.shadow_opacity, 0.30);
        assert_eq!(style.checks.min_padding, 288);
        assert_eq!(style.checks.alpha_threshold, 16);
    }

    #[test]
    fn test_checks_for_size() {
        assert_eq!(Checks::for_size(1024), Checks::default());
        assert_eq!(Checks::for_size(256).min_padding, 18);
    }
}
