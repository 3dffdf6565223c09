//! Procedural generator for the checkmark and progress bar application icon.
//!
//! The compositor draws a rounded macOS-style body with a drop shadow,
//! gradient and glossy highlight, adds the checkmark motif, checks the
//! result and exports `icon.png` plus a multi-resolution `icon.ico`.

pub mod icon_gen;
pub mod motif;
pub mod raster;
pub mod style;
pub mod validate;
