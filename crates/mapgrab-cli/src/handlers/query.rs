//! Query command handler

use crate::config::{CliConfig, OutputFormat};
use crate::error::CliResult;
use crate::output::Printer;
use crate::scene_file::SceneFile;
use crate::QueryArgs;
use mapgrab::{LocatedFeature, MapGrab, MapLocator};
use tracing::info;

/// Execute the query command
pub fn execute_query(config: &CliConfig, args: &QueryArgs) -> CliResult<()> {
    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());
    let grab = SceneFile::load(&args.scene)?.into_grab();
    let items = query_scene(&grab, args)?;
    info!(selector = %args.selector, elements = items.len(), "query resolved");

    match config.format {
        OutputFormat::Json => printer.print_json(&serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => printer.print(&printer.render_located(&items)),
    }
    Ok(())
}

/// Locator described by the query arguments
#[must_use]
pub fn build_locator<'a>(grab: &'a MapGrab, args: &QueryArgs) -> MapLocator<'a> {
    let mut locator = grab.locator(args.selector.clone());
    if args.include_hidden {
        locator = locator.include_hidden();
    }
    locator = match args.merge.as_deref() {
        None => locator,
        Some("") => locator.merge_all(),
        Some(property) => locator.merge_by_property(property),
    };
    match args.nth {
        Some(index) => locator.nth(index),
        None => locator,
    }
}

/// Resolve the query arguments against registered maps
pub fn query_scene(grab: &MapGrab, args: &QueryArgs) -> CliResult<Vec<LocatedFeature>> {
    Ok(build_locator(grab, args).resolve()?)
}
