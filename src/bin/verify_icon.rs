use anyhow::{Context, Result};
use checkmark_icon::{
    style::Checks,
    validate::{content_bounds, corners, validate},
};
use image::io::Reader as ImageReader;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "build/icon.png".to_string());

    let img = ImageReader::open(&path)
        .with_context(|| format!("Failed to open {path}"))?
        .decode()
        .with_context(|| format!("Failed to decode {path}"))?;

    let rgba_img = img.to_rgba8();
    let (width, height) = rgba_img.dimensions();
    let checks = Checks::for_size(width.min(height));

    println!("Checking icon: {path}");
    println!("Image dimensions: {width}x{height}");

    println!("\nCorner alpha:");
    for (x, y) in corners(&rgba_img) {
        println!("  ({x}, {y}): {}", rgba_img.get_pixel(x, y)[3]);
    }

    match content_bounds(&rgba_img, checks.alpha_threshold) {
        Some(bounds) => {
            println!("\nContent bounds (alpha > {}): {bounds}", checks.alpha_threshold);
            println!(
                "  Margins: left {}, top {}, right {}, bottom {} (minimum {})",
                bounds.left,
                bounds.top,
                width - bounds.right,
                height - bounds.bottom,
                checks.min_padding
            );
        }
        None => println!("\nNo visible content"),
    }

    validate(&rgba_img, &checks).with_context(|| format!("{path} failed validation"))?;
    println!("\n✓ Icon geometry is valid");
    Ok(())
}
