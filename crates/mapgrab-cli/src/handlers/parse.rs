//! Parse command handler

use crate::config::{CliConfig, OutputFormat};
use crate::error::CliResult;
use crate::output::Printer;
use crate::ParseArgs;
use mapgrab::Selector;

/// Execute the parse command
pub fn execute_parse(config: &CliConfig, args: &ParseArgs) -> CliResult<()> {
    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());
    let rendered = render_parse(&printer, config.format, &args.selector)?;
    match config.format {
        OutputFormat::Json => printer.print_json(&rendered),
        OutputFormat::Text => printer.print(&rendered),
    }
    Ok(())
}

/// Parse selector text and render it
pub fn render_parse(printer: &Printer, format: OutputFormat, text: &str) -> CliResult<String> {
    let selector = Selector::parse(text)?;
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&selector)?,
        OutputFormat::Text => printer.render_selector(&selector),
    })
}
