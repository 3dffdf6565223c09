use anyhow::Result;
use checkmark_icon::{
    icon_gen::{self, Options},
    style::Style,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(
    name = "checkmark-icon",
    about = "Render the checkmark app icon and export icon.png and icon.ico",
    long_about = "Render the checkmark app icon and export icon.png and icon.ico.\n\n\
                  Run without arguments to write build/icon.png and build/icon.ico \
                  with the built-in style. Every option only overrides a default."
)]
struct Args {
    /// Override the output directory.
    #[clap(short, long, value_name = "DIR", default_value = "build")]
    output: PathBuf,

    /// Override the built-in palette, geometry and checks with a JSON style file.
    #[clap(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the supersampling factor (render at N times the size, then downsample).
    #[clap(
        short,
        long,
        value_name = "N",
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..=8)
    )]
    supersample: u32,

    /// Also generate icon.icns (macOS icons); off by default
    #[clap(long)]
    icns: bool,

    /// Print the effective style as JSON and exit
    #[clap(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let style = match &args.config {
        Some(path) => Style::load(path)?,
        None => Style::default(),
    };

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&style)?);
        return Ok(());
    }

    icon_gen::generate_icons(&Options {
        output: args.output,
        style,
        supersample: args.supersample,
        icns: args.icns,
    })
}
