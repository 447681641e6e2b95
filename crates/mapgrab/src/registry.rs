//! Registered map instances.
//!
//! The registry is owned by a [`crate::MapGrab`] instance and lives for one
//! test session. Maps keep their registration order, which is also the order
//! queries visit them in.

use crate::engine::{EngineKind, MapAdapter};
use crate::selector::PropertyMatch;

/// A map known to the registry
#[derive(Debug)]
pub struct RegisteredMap {
    /// Map identifier
    pub id: String,
    /// Engine rendering the map
    pub engine: EngineKind,
    adapter: Box<dyn MapAdapter>,
}

impl RegisteredMap {
    /// Wrap an adapter; the engine kind is read from it
    #[must_use]
    pub fn new(id: impl Into<String>, adapter: Box<dyn MapAdapter>) -> Self {
        Self {
            id: id.into(),
            engine: adapter.engine(),
            adapter,
        }
    }

    /// Adapter of the map
    #[must_use]
    pub fn adapter(&self) -> &dyn MapAdapter {
        self.adapter.as_ref()
    }

    /// Mutable adapter of the map
    pub fn adapter_mut(&mut self) -> &mut dyn MapAdapter {
        self.adapter.as_mut()
    }
}

/// Map id to adapter registry
#[derive(Debug, Default)]
pub struct MapRegistry {
    maps: Vec<RegisteredMap>,
}

impl MapRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a map, replacing (in place) any map with the same id.
    /// Returns the replaced map.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        adapter: Box<dyn MapAdapter>,
    ) -> Option<RegisteredMap> {
        let map = RegisteredMap::new(id, adapter);
        match self.maps.iter_mut().find(|m| m.id == map.id) {
            Some(slot) => Some(std::mem::replace(slot, map)),
            None => {
                self.maps.push(map);
                None
            }
        }
    }

    /// Remove a map
    pub fn unregister(&mut self, id: &str) -> Option<RegisteredMap> {
        let index = self.maps.iter().position(|m| m.id == id)?;
        Some(self.maps.remove(index))
    }

    /// Get a map by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RegisteredMap> {
        self.maps.iter().find(|m| m.id == id)
    }

    /// Get a mutable map by id
    pub fn get_mut(&mut self, id: &str) -> Option<&mut RegisteredMap> {
        self.maps.iter_mut().find(|m| m.id == id)
    }

    /// Registered ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.maps.iter().map(|m| m.id.as_str()).collect()
    }

    /// Iterate over maps in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredMap> {
        self.maps.iter()
    }

    /// Number of maps
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Check if no map is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Remove every map
    pub fn clear(&mut self) {
        self.maps.clear();
    }

    /// Maps targeted by a map predicate.
    ///
    /// Without a predicate every map is targeted. Otherwise each value is
    /// compared against every id and the matches are unioned, keeping the
    /// first-seen order.
    #[must_use]
    pub fn resolve(&self, map_match: Option<&PropertyMatch>) -> Vec<&RegisteredMap> {
        let Some(map_match) = map_match else {
            return self.maps.iter().collect();
        };

        let mut targets: Vec<&RegisteredMap> = Vec::new();
        for value in &map_match.values {
            for map in &self.maps {
                if map_match.comparator.matches(&map.id, value)
                    && !targets.iter().any(|t| t.id == map.id)
                {
                    targets.push(map);
                }
            }
        }
        targets
    }
}
