//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// MapGrab: resolve map feature selectors against scene files
#[derive(Parser, Debug)]
#[command(name = "mapgrab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Output format
    #[arg(long, default_value = "text", global = true)]
    pub format: FormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a selector and print its structure
    Parse(ParseArgs),

    /// Resolve a selector against the maps of a scene file
    Query(QueryArgs),

    /// List every feature rendered at a canvas point
    Inspect(InspectArgs),
}

/// Arguments for the parse command
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Selector text, e.g. `map[id=main] layer[type=line]`
    pub selector: String,
}

/// Arguments for the query command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Selector text
    pub selector: String,

    /// Scene file (JSON, `{"maps": {"<id>": <scene>}}`)
    #[arg(short, long)]
    pub scene: PathBuf,

    /// Keep features drawn with zero opacity
    #[arg(long)]
    pub include_hidden: bool,

    /// Merge the results, optionally only those sharing a property value
    #[arg(
        long,
        value_name = "PROPERTY",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub merge: Option<String>,

    /// Keep only the element at this index; negative counts from the end
    #[arg(long, allow_hyphen_values = true)]
    pub nth: Option<i64>,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Scene file
    #[arg(short, long)]
    pub scene: PathBuf,

    /// Map id within the scene file
    #[arg(short, long)]
    pub map: String,

    /// Canvas x coordinate
    #[arg(allow_hyphen_values = true)]
    pub x: f64,

    /// Canvas y coordinate
    #[arg(allow_hyphen_values = true)]
    pub y: f64,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for crate::config::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}
