//! MapGrab CLI Library
//!
//! Command-line front end for offline selector debugging: parse selectors,
//! resolve them against scene files and inspect canvas points.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;
pub mod scene_file;

pub use commands::{Cli, ColorArg, Commands, FormatArg, InspectArgs, ParseArgs, QueryArgs};
pub use config::{CliConfig, ColorChoice, OutputFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Printer;
pub use scene_file::SceneFile;
