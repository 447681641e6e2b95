//! Public entry point.
//!
//! A [`MapGrab`] owns the registry of live maps for one test session and
//! answers selector queries against it.
//!
//! ```
//! use mapgrab::prelude::*;
//! use serde_json::json;
//!
//! let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
//!     .with_layer(SceneLayer::new("stops", LayerType::Circle, "transit"))
//!     .with_feature("transit", SceneFeature::point(1, [0.0, 0.0]).with_property("name", json!("Central")));
//!
//! let mut grab = MapGrab::new();
//! grab.register("main", Box::new(scene));
//!
//! let features = grab.query("map[id=main] layer[id=stops]").unwrap();
//! assert_eq!(features.len(), 1);
//! assert_eq!(features[0].interaction_points, vec![Point::new(200.0, 150.0)]);
//! ```

use crate::engine::{MapAdapter, QueryGeometry, QueryOptions};
use crate::expose::{self, ExposureState, HiddenLayers};
use crate::feature::ResultFeature;
use crate::geometry::Point;
use crate::locator::MapLocator;
use crate::query::{MapQuery, QueryRequest, QueryResolver};
use crate::registry::{MapRegistry, RegisteredMap};
use crate::result::{MapGrabError, MapGrabResult};
use crate::selector::{FilterExpression, Selector};
use crate::wait::{wait_until, CancellationToken, WaitOptions, WaitResult};
use tracing::debug;

/// Selector-driven access to every registered map
#[derive(Debug, Default)]
pub struct MapGrab {
    registry: MapRegistry,
}

impl MapGrab {
    /// Create an instance without maps
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a map under an id, replacing any map with the same id
    pub fn register(
        &mut self,
        id: impl Into<String>,
        adapter: Box<dyn MapAdapter>,
    ) -> Option<RegisteredMap> {
        let id = id.into();
        debug!(map = %id, engine = %adapter.engine(), "map registered");
        self.registry.register(id, adapter)
    }

    /// Remove a map
    pub fn unregister(&mut self, id: &str) -> Option<RegisteredMap> {
        self.registry.unregister(id)
    }

    /// Registry of maps
    #[must_use]
    pub const fn registry(&self) -> &MapRegistry {
        &self.registry
    }

    /// Registered map ids in registration order
    #[must_use]
    pub fn map_ids(&self) -> Vec<&str> {
        self.registry.ids()
    }

    /// Parse and resolve selector text
    ///
    /// # Errors
    ///
    /// Returns parse errors and `NoMatchingLayer`.
    pub fn query(&self, selector: &str) -> MapGrabResult<Vec<ResultFeature>> {
        self.query_selector(&Selector::parse(selector)?)
    }

    /// Resolve a parsed selector
    ///
    /// # Errors
    ///
    /// Returns `NoMatchingLayer` when the layer predicate matches nothing.
    pub fn query_selector(&self, selector: &Selector) -> MapGrabResult<Vec<ResultFeature>> {
        QueryResolver::new(&self.registry).resolve(selector)
    }

    /// Every feature rendered at a canvas point of one map.
    ///
    /// Hits carrying an id are resolved again across the whole canvas, so a
    /// feature split over several tiles comes back complete. An unknown map
    /// yields nothing.
    ///
    /// # Errors
    ///
    /// Returns the map's engine errors.
    pub fn inspect_at_point(&self, map_id: &str, point: Point) -> MapGrabResult<Vec<ResultFeature>> {
        let Some(map) = self.registry.get(map_id) else {
            return Ok(Vec::new());
        };

        let request = QueryRequest::default().with_geometry(QueryGeometry::Point(point));
        let hits = MapQuery::query_map(map_id, map.adapter(), &request)?;

        let mut features = Vec::with_capacity(hits.len());
        for hit in hits {
            match &hit.feature_id {
                Some(id) => {
                    let options = QueryOptions::default()
                        .with_layers(vec![hit.layer_id.clone()])
                        .with_filter(Some(FilterExpression::id_equals(id.to_json())));
                    features.extend(MapQuery::query_map(
                        map_id,
                        map.adapter(),
                        &QueryRequest::new(options),
                    )?);
                }
                None => features.push(hit),
            }
        }
        Ok(features)
    }

    /// Wait until every map targeted by a selector is stable
    ///
    /// # Errors
    ///
    /// Returns parse errors, `Timeout` and `Cancelled`.
    pub fn wait_for_stable(
        &self,
        selector: &str,
        options: &WaitOptions,
        token: &CancellationToken,
    ) -> MapGrabResult<WaitResult> {
        let selector = Selector::parse(selector)?;
        let maps = self.registry.resolve(selector.map_match.as_ref());
        wait_until(options, token, "maps to become stable", || {
            maps.iter().all(|m| m.adapter().is_stable())
        })
    }

    /// Show the given layers of a map and hide others
    ///
    /// # Errors
    ///
    /// Returns `MapNotFound` and adapter errors.
    pub fn expose_layers(
        &mut self,
        map_id: &str,
        to_expose: &[String],
        hidden: &HiddenLayers,
    ) -> MapGrabResult<ExposureState> {
        let map = self.map_mut(map_id)?;
        expose::expose_layers(map.adapter_mut(), to_expose, hidden)
    }

    /// Undo an exposure
    ///
    /// # Errors
    ///
    /// Returns `MapNotFound` and adapter errors.
    pub fn revert_exposure(&mut self, map_id: &str, state: &ExposureState) -> MapGrabResult<()> {
        let map = self.map_mut(map_id)?;
        expose::revert_exposure(map.adapter_mut(), state)
    }

    /// Caller-level locator for selector text
    #[must_use]
    pub fn locator(&self, selector: impl Into<String>) -> MapLocator<'_> {
        MapLocator::new(self, selector)
    }

    fn map_mut(&mut self, map_id: &str) -> MapGrabResult<&mut RegisteredMap> {
        self.registry
            .get_mut(map_id)
            .ok_or_else(|| MapGrabError::MapNotFound {
                map_id: map_id.to_string(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{FeatureId, LayerType, Visibility};
    use crate::scene::{Camera, SceneFeature, SceneLayer, SceneMap};
    use serde_json::json;

    fn camera() -> Camera {
        Camera::new(0.0, 0.0, 2.0, 400.0, 400.0)
    }

    fn roads() -> SceneMap {
        SceneMap::new(camera())
            .with_layer(
                SceneLayer::new("roads", LayerType::Line, "streets")
                    .with_paint("line-width", json!(4)),
            )
            .with_feature(
                "streets",
                SceneFeature::line(9, vec![[-20.0, 0.0], [0.0, 0.0]]).with_property("name", json!("Main")),
            )
            .with_feature(
                "streets",
                SceneFeature::line(9, vec![[0.0, 0.0], [20.0, 0.0]]).with_property("name", json!("Main")),
            )
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_parse_error_surfaces() {
            let grab = MapGrab::new();
            assert!(matches!(grab.query("layer[id"), Err(MapGrabError::Parse { .. })));
            assert!(matches!(grab.query("   "), Err(MapGrabError::InvalidSelector)));
        }

        #[test]
        fn test_register_replaces() {
            let mut grab = MapGrab::new();
            assert!(grab.register("a", Box::new(roads())).is_none());
            assert!(grab.register("a", Box::new(roads())).is_some());
            assert_eq!(grab.map_ids(), vec!["a"]);
            assert!(grab.unregister("a").is_some());
            assert!(grab.map_ids().is_empty());
        }
    }

    mod inspect_tests {
        use super::*;

        #[test]
        fn test_inspect_returns_whole_feature() {
            let mut grab = MapGrab::new();
            grab.register("m", Box::new(roads()));
            // left half of the road only
            let features = grab.inspect_at_point("m", Point::new(150.0, 200.0)).unwrap();
            assert_eq!(features.len(), 1);
            assert_eq!(features[0].feature_id, Some(FeatureId::Int(9)));
            assert!((features[0].rect.x() - 84.0).abs() <= 1.0);
            assert!((features[0].rect.right() - 316.0).abs() <= 1.0);
        }

        #[test]
        fn test_inspect_unknown_map_is_empty() {
            let grab = MapGrab::new();
            assert!(grab.inspect_at_point("nope", Point::new(1.0, 1.0)).unwrap().is_empty());
        }

        #[test]
        fn test_inspect_empty_spot() {
            let mut grab = MapGrab::new();
            grab.register("m", Box::new(roads()));
            assert!(grab.inspect_at_point("m", Point::new(10.0, 10.0)).unwrap().is_empty());
        }
    }

    mod stability_tests {
        use super::*;

        #[test]
        fn test_waits_for_pending_frames() {
            let mut grab = MapGrab::new();
            grab.register("m", Box::new(roads().with_pending_frames(3)));
            let options = WaitOptions::new().with_timeout(1_000).with_poll_interval(1);
            let result = grab
                .wait_for_stable("map[id=m]", &options, &CancellationToken::new())
                .unwrap();
            assert_eq!(result.attempts, 4);
        }

        #[test]
        fn test_only_targeted_maps_awaited() {
            let mut grab = MapGrab::new();
            grab.register("busy", Box::new(roads().with_pending_frames(u32::MAX)));
            grab.register("idle", Box::new(roads()));
            let options = WaitOptions::new().with_timeout(50).with_poll_interval(1);
            let token = CancellationToken::new();
            assert!(grab.wait_for_stable("map[id=idle]", &options, &token).is_ok());
            assert!(matches!(
                grab.wait_for_stable("map[id*=b]", &options, &token),
                Err(MapGrabError::Timeout { ms: 50 })
            ));
        }
    }

    mod exposure_tests {
        use super::*;

        #[test]
        fn test_expose_and_revert_through_registry() {
            let mut grab = MapGrab::new();
            grab.register(
                "m",
                Box::new(roads().with_layer(SceneLayer::new("water", LayerType::Fill, "base"))),
            );
            let state = grab
                .expose_layers("m", &["roads".to_string()], &HiddenLayers::AllOther)
                .unwrap();
            assert_eq!(state.get("water").unwrap().to, Visibility::None);
            grab.revert_exposure("m", &state).unwrap();
            let layers = grab.registry().get("m").unwrap().adapter().style_layers();
            assert!(layers.iter().all(|l| l.visibility == Visibility::Visible));
        }

        #[test]
        fn test_expose_unknown_map() {
            let mut grab = MapGrab::new();
            let err = grab
                .expose_layers("x", &[], &HiddenLayers::AllOther)
                .unwrap_err();
            assert!(matches!(err, MapGrabError::MapNotFound { .. }));
        }
    }
}
