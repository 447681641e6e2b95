//! Scene files: several named in-memory maps in one JSON document.
//!
//! ```json
//! { "maps": { "main": { "camera": { ... }, "layers": [ ... ], "sources": { ... } } } }
//! ```

use crate::error::{CliError, CliResult};
use mapgrab::scene::SceneMap;
use mapgrab::MapGrab;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Parsed scene file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneFile {
    /// Maps by id, registered in id order
    pub maps: BTreeMap<String, SceneMap>,
}

impl SceneFile {
    /// Read and parse a scene file
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::scene(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: Self = serde_json::from_str(&text)
            .map_err(|e| CliError::scene(format!("{}: {e}", path.display())))?;
        if file.maps.is_empty() {
            return Err(CliError::scene(format!("{} defines no maps", path.display())));
        }
        debug!(path = %path.display(), maps = file.maps.len(), "scene file loaded");
        Ok(file)
    }

    /// Register every map with a fresh [`MapGrab`]
    #[must_use]
    pub fn into_grab(self) -> MapGrab {
        let mut grab = MapGrab::new();
        for (id, map) in self.maps {
            grab.register(id, Box::new(map));
        }
        grab
    }
}
