//! Command line arguments.

use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// Pick colors from the screen.
///
/// Each click prints one color. With a conversion expression, every pick
/// after the first one (or every pick, when seed colors are given) is
/// transformed before it is printed.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "chameleon",
    version,
    about = "A simple color picker for X11",
    after_help = "Conversion expressions bind the channels of every color space they name.\n\
                  The current color is bound with and without suffix (r and r0), seed\n\
                  colors and earlier picks follow as r1, r2, ...\n\n\
                  \x20 rgb: r, g, b in 0..255\n\
                  \x20 hls: h in degrees, l and s in 0..1\n\
                  \x20 hsv: h in degrees, s and v in 0..1\n\
                  \x20 yiq: y in 0..1, i and q\n\n\
                  Example, keeping the lightness of the first pick:\n\
                  \x20 chameleon -c 3 -C 'hls(h, l1, s)'"
)]
pub struct CliArgs {
    /// Number of colors to select [default: 1]
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub count: Option<u32>,

    /// Output template [default: #{0:02x}{1:02x}{2:02x}]
    #[arg(short, long, value_name = "FMT")]
    pub format: Option<String>,

    /// Conversion expression, e.g. 'hls(h, l1, s)'
    #[arg(short = 'C', long, value_name = "EXPR")]
    pub conversion: Option<String>,

    /// Distance of the preview to the cursor in pixels [default: 50]
    #[arg(short, long, value_name = "PX")]
    pub margin: Option<u16>,

    /// Distance between preview swatches in pixels [default: 20]
    #[arg(short = 'S', long, value_name = "PX")]
    pub separator: Option<u16>,

    /// Size of a preview swatch in pixels [default: 30]
    #[arg(short, long, value_name = "PX")]
    pub size: Option<u16>,

    /// Border of a preview swatch in pixels [default: 4]
    #[arg(short, long, value_name = "PX")]
    pub border: Option<u16>,

    /// Configuration file [default: <config dir>/chameleon/config.json]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Seed colors as '#rrggbb', whitespace-separated lists are accepted
    #[arg(value_name = "COLORS")]
    pub colors: Vec<String>,
}

impl CliArgs {
    /// Log level selected by the number of `-v` flags.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
