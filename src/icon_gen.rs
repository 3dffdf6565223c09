use anyhow::{Context, Result};
use icns::{IconFamily, IconType};
use image::{
    codecs::{
        ico::{IcoEncoder, IcoFrame},
        png::{CompressionType, FilterType as PngFilterType, PngEncoder},
    },
    imageops, ColorType, ImageEncoder, RgbaImage,
};
use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    motif::draw_motif,
    raster::{
        clip_to_mask, composite_over, drop_shadow, highlight_layer, resample, rounded_rect_mask,
        vertical_gradient,
    },
    style::Style,
    validate::validate,
};

pub const PNG_FILE: &str = "icon.png";
pub const ICO_FILE: &str = "icon.ico";
pub const ICNS_FILE: &str = "icon.icns";

/// Frames bundled into `icon.ico`, largest first
pub const ICO_SIZES: [u32; 6] = [256, 128, 64, 48, 32, 16];

/// macOS icon family entries: name, pixel size, OSType
const ICNS_ENTRIES: [(&str, u32, &str); 10] = [
    ("16x16", 16, "is32"),
    ("16x16@2x", 32, "ic11"),
    ("32x32", 32, "il32"),
    ("32x32@2x", 64, "ic12"),
    ("128x128", 128, "ic07"),
    ("128x128@2x", 256, "ic13"),
    ("256x256", 256, "ic08"),
    ("256x256@2x", 512, "ic14"),
    ("512x512", 512, "ic09"),
    ("512x512@2x", 1024, "ic10"),
];

#[derive(Debug, Clone)]
pub struct Options {
    pub output: PathBuf,
    pub style: Style,
    /// Render at this multiple of the target size, then downsample
    pub supersample: u32,
    /// Also write a macOS `icon.icns`
    pub icns: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output: PathBuf::from("build"),
            style: Style::default(),
            supersample: 4,
            icns: false,
        }
    }
}

/// Render, validate and export the icon
///
/// Nothing is written when validation fails.
pub fn generate_icons(options: &Options) -> Result<()> {
    let size = options.style.geometry.size;
    println!(
        "Rendering {size}x{size} icon ({}x supersampling)...",
        options.supersample
    );
    let icon = render(&options.style, options.supersample)?;

    let bounds = validate(&icon, &options.style.checks).context("Icon failed validation")?;
    println!("  ✓ Corners transparent, content bounds {bounds}");

    // Ensure the output directory exists
    create_dir_all(&options.output).context("Can't create output directory")?;

    generate_png(&icon, &options.output)?;
    generate_ico(&icon, &options.output)?;
    if options.icns {
        generate_icns(&icon, &options.output)?;
    }

    Ok(())
}

/// Draw the icon at `supersample` times its size and bring it back down
pub fn render(style: &Style, supersample: u32) -> Result<RgbaImage> {
    style.check()?;
    if supersample == 0 {
        anyhow::bail!("Supersampling factor must be at least 1");
    }

    let hi_res = style.scaled(supersample as f32);
    let canvas = compose(&hi_res, supersample)?;
    Ok(resample(&canvas, style.geometry.size))
}

/// Run every compositing step at the style's own size
///
/// `shadow_reduce` shrinks the shadow before blurring; pass the
/// supersampling factor so the blur works at the final resolution.
pub fn compose(style: &Style, shadow_reduce: u32) -> Result<RgbaImage> {
    let g = &style.geometry;
    let p = &style.palette;
    let size = g.size;

    let mut canvas = RgbaImage::new(size, size);
    let body = g.body_rect();
    let mask = rounded_rect_mask(size, body, g.corner_radius);

    // Shadow sits beneath the body
    let shadow = drop_shadow(
        &mask,
        p.shadow,
        g.shadow_opacity,
        g.shadow_blur,
        g.shadow_offset,
        shadow_reduce,
    );
    composite_over(&mut canvas, &shadow)?;

    // Gradient spans the body, not the whole canvas
    let body_top = body.y0.floor() as u32;
    let body_height = (body.y1.ceil() as u32).min(size).saturating_sub(body_top);
    let gradient = vertical_gradient(
        size,
        body_height,
        p.background_top.to_rgb(),
        p.background_bottom.to_rgb(),
    );
    let mut fill = image::RgbImage::from_pixel(size, size, p.background_top.to_rgb());
    imageops::replace(&mut fill, &gradient, 0, body_top.into());
    let background = clip_to_mask(&fill, &mask)?;
    composite_over(&mut canvas, &background)?;

    let highlight = highlight_layer(
        &mask,
        (size as f32 / 2., body.y0 + g.highlight_offset_y),
        g.highlight_radii,
        p.highlight,
        g.highlight_opacity,
    );
    composite_over(&mut canvas, &highlight)?;

    draw_motif(&mut canvas, style);

    Ok(canvas)
}

fn generate_png(icon: &RgbaImage, out_dir: &Path) -> Result<()> {
    println!("Generating {PNG_FILE}...");
    save_png(icon, &out_dir.join(PNG_FILE))?;
    println!("✓ Generated {PNG_FILE}");
    Ok(())
}

fn generate_ico(icon: &RgbaImage, out_dir: &Path) -> Result<()> {
    println!("Generating {ICO_FILE}...");
    let mut frames = Vec::new();

    for size in ICO_SIZES {
        let resized = resample(icon, size);

        // Only the 256px layer can be compressed according to the ico specs
        if size == 256 {
            let mut buf = Vec::new();
            write_png(resized.as_raw(), &mut buf, size)?;
            frames.push(IcoFrame::with_encoded(buf, size, size, ColorType::Rgba8)?);
        } else {
            frames.push(IcoFrame::as_png(
                resized.as_raw(),
                size,
                size,
                ColorType::Rgba8,
            )?);
        }
        println!("  ✓ Added {size}x{size} frame");
    }

    let mut out_file = BufWriter::new(
        File::create(out_dir.join(ICO_FILE)).context("Failed to create ICO file")?,
    );
    let encoder = IcoEncoder::new(&mut out_file);
    encoder.encode_images(&frames)?;
    out_file.flush()?;

    println!("✓ Generated {ICO_FILE}");
    Ok(())
}

fn generate_icns(icon: &RgbaImage, out_dir: &Path) -> Result<()> {
    println!("Generating {ICNS_FILE}...");
    let mut family = IconFamily::new();

    for (name, size, ostype) in ICNS_ENTRIES {
        let resized = resample(icon, size);

        let mut buf = Vec::new();
        write_png(resized.as_raw(), &mut buf, size)?;
        let image = icns::Image::read_png(&buf[..])?;

        let ostype = ostype
            .parse()
            .map_err(|err| anyhow::anyhow!("Invalid OSType {ostype}: {err:?}"))?;
        let icon_type = IconType::from_ostype(ostype)
            .with_context(|| format!("Unsupported icon type for {name}"))?;
        family
            .add_icon_with_type(&image, icon_type)
            .with_context(|| format!("Can't add {name} to Icns Family"))?;
    }

    let mut out_file = BufWriter::new(
        File::create(out_dir.join(ICNS_FILE)).context("Failed to create ICNS file")?,
    );
    family.write(&mut out_file)?;
    out_file.flush()?;

    println!("✓ Generated {ICNS_FILE}");
    Ok(())
}

fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create PNG file")?;
    let mut out = BufWriter::new(file);
    write_png(image.as_raw(), &mut out, image.width()).context("Failed to write PNG")?;
    out.flush()?;
    Ok(())
}

// Encode square RGBA data as PNG with compression
fn write_png<W: Write>(image_data: &[u8], w: W, size: u32) -> Result<()> {
    let encoder = PngEncoder::new_with_quality(w, CompressionType::Best, PngFilterType::Adaptive);
    encoder.write_image(image_data, size, size, ColorType::Rgba8)?;
    Ok(())
}
