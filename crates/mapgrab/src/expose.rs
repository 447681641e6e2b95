//! Layer exposure.
//!
//! Screenshots of a single feature family are taken by hiding the layers
//! around it. [`expose_layers`] records every visibility it changes so that
//! [`revert_exposure`] can restore the exact previous value of each layer.

use crate::engine::{MapAdapter, Visibility};
use crate::result::MapGrabResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Layers to hide while exposing others
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HiddenLayers {
    /// Every layer not exposed
    AllOther,
    /// Only the listed layers; the rest become visible
    Only(Vec<String>),
}

/// One recorded visibility change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMutation {
    /// Layer id
    pub layer_id: String,
    /// Visibility before the change
    pub from: Visibility,
    /// Visibility after the change
    pub to: Visibility,
}

/// Visibility changes applied by one exposure, in style order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureState {
    /// Changed layers
    pub mutations: Vec<LayerMutation>,
}

impl ExposureState {
    /// Check if nothing was changed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Recorded change of a layer
    #[must_use]
    pub fn get(&self, layer_id: &str) -> Option<&LayerMutation> {
        self.mutations.iter().find(|m| m.layer_id == layer_id)
    }
}

fn target_visibility(layer_id: &str, to_expose: &[String], hidden: &HiddenLayers) -> Visibility {
    if to_expose.iter().any(|id| id == layer_id) {
        return Visibility::Visible;
    }
    match hidden {
        HiddenLayers::AllOther => Visibility::None,
        HiddenLayers::Only(ids) if ids.iter().any(|id| id == layer_id) => Visibility::None,
        HiddenLayers::Only(_) => Visibility::Visible,
    }
}

/// Set every style layer's visibility for an exposure
///
/// # Errors
///
/// Returns the adapter's error (typically `Unsupported`) on the first layer
/// it refuses to change, after putting back the layers already changed.
pub fn expose_layers(
    adapter: &mut dyn MapAdapter,
    to_expose: &[String],
    hidden: &HiddenLayers,
) -> MapGrabResult<ExposureState> {
    let mut state = ExposureState::default();
    for layer in adapter.style_layers() {
        let to = target_visibility(&layer.id, to_expose, hidden);
        if layer.visibility == to {
            continue;
        }
        if let Err(e) = adapter.set_layer_visibility(&layer.id, to) {
            if let Err(undo) = revert_exposure(adapter, &state) {
                warn!(layer = %layer.id, error = %undo, "exposure only partly reverted");
            }
            return Err(e);
        }
        state.mutations.push(LayerMutation {
            layer_id: layer.id,
            from: layer.visibility,
            to,
        });
    }
    debug!(changed = state.mutations.len(), "layers exposed");
    Ok(state)
}

/// Restore the visibility recorded by [`expose_layers`]
///
/// # Errors
///
/// Returns the adapter's error on the first layer it refuses to change.
pub fn revert_exposure(adapter: &mut dyn MapAdapter, state: &ExposureState) -> MapGrabResult<()> {
    for mutation in &state.mutations {
        adapter.set_layer_visibility(&mutation.layer_id, mutation.from)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{
        EngineKind, LayerType, MapTransform, PaintEvaluator, QueryGeometry, QueryOptions,
        RawFeature, StyleLayer,
    };
    use crate::geometry::{LngLat, LngLatBounds, Point};
    use crate::placement::PlacementIndex;
    use crate::rect::Rect;
    use crate::result::MapGrabError;
    use crate::scene::{Camera, SceneLayer, SceneMap};
    use crate::selector::FilterExpression;

    fn scene() -> SceneMap {
        SceneMap::new(Camera::new(0.0, 0.0, 2.0, 200.0, 200.0))
            .with_layer(SceneLayer::new("water", LayerType::Fill, "base"))
            .with_layer(
                SceneLayer::new("roads", LayerType::Line, "base").with_visibility(Visibility::None),
            )
            .with_layer(SceneLayer::new("pois", LayerType::Circle, "base"))
    }

    fn visibility(scene: &SceneMap) -> Vec<(String, Visibility)> {
        scene
            .style_layers()
            .into_iter()
            .map(|l| (l.id, l.visibility))
            .collect()
    }

    #[test]
    fn test_expose_hides_all_other() {
        let mut scene = scene();
        let state = expose_layers(&mut scene, &["roads".to_string()], &HiddenLayers::AllOther).unwrap();
        assert_eq!(
            visibility(&scene),
            vec![
                ("water".to_string(), Visibility::None),
                ("roads".to_string(), Visibility::Visible),
                ("pois".to_string(), Visibility::None),
            ]
        );
        assert_eq!(state.mutations.len(), 3);
        assert_eq!(state.get("roads").unwrap().from, Visibility::None);
    }

    #[test]
    fn test_only_listed_layers_hidden_rest_shown() {
        let mut scene = scene();
        let hidden = HiddenLayers::Only(vec!["water".to_string()]);
        let state = expose_layers(&mut scene, &[], &hidden).unwrap();
        assert_eq!(
            visibility(&scene),
            vec![
                ("water".to_string(), Visibility::None),
                ("roads".to_string(), Visibility::Visible),
                ("pois".to_string(), Visibility::Visible),
            ]
        );
        assert!(state.get("pois").is_none());
    }

    #[test]
    fn test_revert_restores_exact_previous_values() {
        let mut scene = scene();
        let before = visibility(&scene);
        let state = expose_layers(&mut scene, &["pois".to_string()], &HiddenLayers::AllOther).unwrap();
        revert_exposure(&mut scene, &state).unwrap();
        assert_eq!(visibility(&scene), before);
    }

    /// Scene that refuses to change one layer
    #[derive(Debug)]
    struct Refusing {
        scene: SceneMap,
        refused: &'static str,
    }

    impl MapAdapter for Refusing {
        fn engine(&self) -> EngineKind {
            self.scene.engine()
        }
        fn style_layers(&self) -> Vec<StyleLayer> {
            self.scene.style_layers()
        }
        fn query_rendered_features(
            &self,
            geometry: Option<&QueryGeometry>,
            options: &QueryOptions,
        ) -> MapGrabResult<Vec<RawFeature>> {
            self.scene.query_rendered_features(geometry, options)
        }
        fn paint(&self, layer_id: &str) -> Option<&dyn PaintEvaluator> {
            self.scene.paint(layer_id)
        }
        fn placement(&self) -> Option<&PlacementIndex> {
            self.scene.placement()
        }
        fn feature_matches(&self, feature: &RawFeature, filter: &FilterExpression) -> bool {
            self.scene.feature_matches(feature, filter)
        }
        fn transform(&self) -> MapTransform {
            self.scene.transform()
        }
        fn project(&self, position: LngLat) -> Point {
            self.scene.project(position)
        }
        fn unproject(&self, point: Point) -> LngLat {
            self.scene.unproject(point)
        }
        fn visible_bounds(&self) -> LngLatBounds {
            self.scene.visible_bounds()
        }
        fn container(&self) -> Rect {
            self.scene.container()
        }
        fn is_stable(&self) -> bool {
            self.scene.is_stable()
        }
        fn set_layer_visibility(
            &mut self,
            layer_id: &str,
            visibility: Visibility,
        ) -> MapGrabResult<()> {
            if layer_id == self.refused {
                return Err(MapGrabError::unsupported("set_layer_visibility"));
            }
            self.scene.set_layer_visibility(layer_id, visibility)
        }
    }

    #[test]
    fn test_refused_layer_puts_earlier_changes_back() {
        let mut map = Refusing {
            scene: scene(),
            refused: "pois",
        };
        let before = visibility(&map.scene);
        let err = expose_layers(&mut map, &["roads".to_string()], &HiddenLayers::AllOther)
            .unwrap_err();
        assert!(matches!(err, MapGrabError::Unsupported { .. }));
        // water and roads were changed before pois was refused
        assert_eq!(visibility(&map.scene), before);
    }

    #[test]
    fn test_unchanged_layers_not_recorded() {
        let mut scene = scene();
        let hidden = HiddenLayers::Only(vec!["roads".to_string()]);
        let state = expose_layers(&mut scene, &[], &hidden).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_exposure_state_json() {
        let state = ExposureState {
            mutations: vec![LayerMutation {
                layer_id: "water".to_string(),
                from: Visibility::Visible,
                to: Visibility::None,
            }],
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["mutations"][0]["layerId"], "water");
        assert_eq!(json["mutations"][0]["to"], "none");
    }
}
