//! Inspect command handler

use crate::config::{CliConfig, OutputFormat};
use crate::error::CliResult;
use crate::output::Printer;
use crate::scene_file::SceneFile;
use crate::InspectArgs;
use mapgrab::{MapGrab, MapGrabError, Point, ResultFeature};

/// Execute the inspect command
pub fn execute_inspect(config: &CliConfig, args: &InspectArgs) -> CliResult<()> {
    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());
    let grab = SceneFile::load(&args.scene)?.into_grab();
    let features = inspect_scene(&grab, &args.map, Point::new(args.x, args.y))?;

    match config.format {
        OutputFormat::Json => printer.print_json(&serde_json::to_string_pretty(&features)?),
        OutputFormat::Text => printer.print(&printer.render_features(&features)),
    }
    Ok(())
}

/// Features rendered at a point of one map; the map must exist
pub fn inspect_scene(grab: &MapGrab, map_id: &str, point: Point) -> CliResult<Vec<ResultFeature>> {
    if grab.registry().get(map_id).is_none() {
        return Err(MapGrabError::MapNotFound {
            map_id: map_id.to_string(),
        }
        .into());
    }
    Ok(grab.inspect_at_point(map_id, point)?)
}
