//! Layer resolvers.
//!
//! One resolver per geometry family turns raw engine features into
//! [`ResultFeature`]s:
//!
//! - **Circle**: projected centre, paint translate, radius plus stroke
//! - **Fill**: clip to the visible bounds, project, translate, envelope
//! - **Line**: as fill, plus line offset and stroke width
//! - **Symbol**: replays the placement index instead of projecting
//!
//! Resolvers work in map-relative pixels and produce a [`DisplayRecord`];
//! [`ResolveContext::to_result`] converts it to page pixels.

mod circle;
mod fill;
mod line;
mod symbol;

pub use circle::CircleResolver;
pub use fill::FillResolver;
pub use line::LineResolver;
pub use symbol::SymbolResolver;

pub(crate) use line::stroke_width;

use crate::engine::{
    FeatureId, LayerType, MapAdapter, MapTransform, PaintEvaluator, QueryGeometry, QueryOptions,
    RawFeature,
};
use crate::feature::ResultFeature;
use crate::geometry::{Geometry, LngLat, LngLatBounds, Point};
use crate::interaction::InteractionPointFinder;
use crate::rect::{Offset, Rect};
use crate::result::{MapGrabError, MapGrabResult};

/// Turns raw features of one layer type into resolved features
pub trait LayerResolver: Sync {
    /// Layer type handled
    fn layer_type(&self) -> LayerType;

    /// Resolve a group of raw features of this type from one map
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        features: &[RawFeature],
    ) -> MapGrabResult<Vec<ResultFeature>>;
}

/// Resolver for a layer type; `None` for types without screen geometry
#[must_use]
pub fn resolver_for(layer_type: LayerType) -> Option<&'static dyn LayerResolver> {
    match layer_type {
        LayerType::Circle => Some(&CircleResolver),
        LayerType::Fill => Some(&FillResolver),
        LayerType::Line => Some(&LineResolver),
        LayerType::Symbol => Some(&SymbolResolver),
        _ => None,
    }
}

/// Map state shared by the resolvers during one query
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Map being resolved
    pub map_id: &'a str,
    /// Adapter of the map
    pub adapter: &'a dyn MapAdapter,
    /// Camera at query time
    pub transform: MapTransform,
    /// Map container in page pixels
    pub container: Rect,
    /// Geographic bounds visible on the canvas
    pub bounds: LngLatBounds,
    /// Geometry the raw query was restricted to
    pub geometry: Option<QueryGeometry>,
    /// Options of the raw query
    pub options: &'a QueryOptions,
}

impl<'a> ResolveContext<'a> {
    /// Snapshot the adapter state for one query
    #[must_use]
    pub fn new(
        map_id: &'a str,
        adapter: &'a dyn MapAdapter,
        geometry: Option<QueryGeometry>,
        options: &'a QueryOptions,
    ) -> Self {
        Self {
            map_id,
            adapter,
            transform: adapter.transform(),
            container: adapter.container(),
            bounds: adapter.visible_bounds(),
            geometry,
            options,
        }
    }

    /// Paint state of a layer
    ///
    /// # Errors
    ///
    /// Returns an engine error when the layer has no paint state.
    pub fn paint(&self, layer_id: &str) -> MapGrabResult<&'a dyn PaintEvaluator> {
        self.adapter.paint(layer_id).ok_or_else(|| {
            MapGrabError::engine(self.map_id, format!("no paint state for layer `{layer_id}`"))
        })
    }

    /// Interaction point finder for this map
    #[must_use]
    pub fn finder(&self) -> InteractionPointFinder<'a> {
        InteractionPointFinder::new(self.adapter)
    }

    /// Geometry moved to the world copy the camera looks at
    #[must_use]
    pub fn world_copy(&self, geometry: &Geometry) -> Geometry {
        geometry.world_copy_near(self.transform.center.lng)
    }

    /// Project positions to canvas pixels
    #[must_use]
    pub fn project_all(&self, positions: &[LngLat]) -> Vec<Point> {
        positions.iter().map(|p| self.adapter.project(*p)).collect()
    }

    /// Canvas rectangle in map-relative pixels
    #[must_use]
    pub fn canvas(&self) -> Rect {
        self.transform.canvas()
    }

    /// Convert a display record to a page-space result.
    ///
    /// The rect is shifted by the container origin, clamped to the container
    /// and rounded. Interaction points are shifted, rounded and kept inside
    /// the container's last pixel row/column; negative values become zero.
    #[must_use]
    pub fn to_result(&self, feature: &RawFeature, display: DisplayRecord) -> ResultFeature {
        let origin = Offset::Xy {
            x: self.container.x(),
            y: self.container.y(),
        };
        let rect = display
            .rect
            .apply_offset(origin)
            .clamp_to(&self.container)
            .round();

        let max_x = self.container.right() - 1.0;
        let max_y = self.container.bottom() - 1.0;
        let interaction_points = display
            .interaction_points
            .into_iter()
            .map(|p| {
                let page = Point::new(p.x + self.container.x(), p.y + self.container.y()).round();
                Point::new(page.x.min(max_x).max(0.0), page.y.min(max_y).max(0.0))
            })
            .collect();

        ResultFeature {
            feature_id: feature.id.clone(),
            source_id: feature.source_id.clone(),
            layer_id: feature.layer_id.clone(),
            properties: feature.properties.clone(),
            map_id: self.map_id.to_string(),
            is_visible: display.is_visible,
            interaction_points,
            rect,
        }
    }
}

/// Map-relative resolution of one feature
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRecord {
    /// Bounding rectangle in canvas pixels
    pub rect: Rect,
    /// Confirmed interaction points in canvas pixels
    pub interaction_points: Vec<Point>,
    /// Whether the layer paints the feature with non-zero opacity
    pub is_visible: bool,
}

// =============================================================================
// TILE FRAGMENT COALESCING
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum FragmentKey {
    Id(FeatureId),
    Generated(usize),
}

/// Folds tile fragments of one logical feature together.
///
/// Fragments sharing a feature id are merged; features without an id get a
/// fresh key and are never merged. Output keeps first-seen order.
#[derive(Debug, Default)]
pub(crate) struct FragmentCoalescer {
    entries: Vec<(FragmentKey, ResultFeature)>,
}

impl FragmentCoalescer {
    pub(crate) fn push(&mut self, fragment: ResultFeature) {
        let key = match &fragment.feature_id {
            Some(id) => FragmentKey::Id(id.clone()),
            None => FragmentKey::Generated(self.entries.len()),
        };

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = merge_fragments(existing, fragment),
            None => self.entries.push((key, fragment)),
        }
    }

    pub(crate) fn finish(self) -> Vec<ResultFeature> {
        self.entries.into_iter().map(|(_, f)| f).collect()
    }
}

/// Later fragment wins on identity, visibility and conflicting properties
fn merge_fragments(earlier: &ResultFeature, later: ResultFeature) -> ResultFeature {
    let mut properties = earlier.properties.clone();
    properties.extend(later.properties);

    let mut interaction_points = earlier.interaction_points.clone();
    interaction_points.extend(later.interaction_points);

    ResultFeature {
        properties,
        interaction_points,
        rect: earlier.rect.merge(&later.rect),
        ..later
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{Properties, QueryOptions};
    use crate::geometry::Geometry;
    use crate::scene::{Camera, SceneMap};
    use serde_json::json;

    fn raw() -> RawFeature {
        RawFeature {
            id: Some(FeatureId::Int(4)),
            source_id: "src".to_string(),
            source_layer: None,
            layer_id: "layer".to_string(),
            layer_type: LayerType::Fill,
            properties: Properties::new(),
            state: Properties::new(),
            geometry: Geometry::Point([0.0, 0.0]),
        }
    }

    fn fragment(id: Option<i64>, rect: Rect, key: &str, value: i64) -> ResultFeature {
        let mut properties = Properties::new();
        properties.insert(key.to_string(), json!(value));
        ResultFeature {
            feature_id: id.map(FeatureId::Int),
            source_id: "src".to_string(),
            layer_id: "layer".to_string(),
            properties,
            map_id: "m".to_string(),
            is_visible: true,
            interaction_points: vec![rect.center()],
            rect,
        }
    }

    mod page_conversion_tests {
        use super::*;

        fn context<'a>(scene: &'a SceneMap, options: &'a QueryOptions) -> ResolveContext<'a> {
            ResolveContext::new("m", scene, None, options)
        }

        #[test]
        fn test_rect_offset_and_clamped() {
            let scene = SceneMap::new(Camera::new(0.0, 0.0, 1.0, 100.0, 100.0))
                .with_container_origin(50.0, 20.0);
            let options = QueryOptions::default();
            let ctx = context(&scene, &options);
            let result = ctx.to_result(
                &raw(),
                DisplayRecord {
                    rect: Rect::new(-10.0, 10.4, 40.0, 130.0),
                    interaction_points: vec![],
                    is_visible: true,
                },
            );
            assert_eq!(result.rect, Rect::new(50.0, 30.0, 90.0, 120.0));
            assert_eq!(result.map_id, "m");
            assert_eq!(result.feature_id, Some(FeatureId::Int(4)));
        }

        #[test]
        fn test_points_kept_inside_container() {
            let scene = SceneMap::new(Camera::new(0.0, 0.0, 1.0, 100.0, 100.0))
                .with_container_origin(10.0, 10.0);
            let options = QueryOptions::default();
            let ctx = context(&scene, &options);
            let result = ctx.to_result(
                &raw(),
                DisplayRecord {
                    rect: Rect::new(0.0, 0.0, 1.0, 1.0),
                    interaction_points: vec![Point::new(20.4, 30.6), Point::new(100.0, 250.0)],
                    is_visible: false,
                },
            );
            assert_eq!(
                result.interaction_points,
                vec![Point::new(30.0, 41.0), Point::new(109.0, 109.0)]
            );
            assert!(!result.is_visible);
        }
    }

    mod coalescer_tests {
        use super::*;

        #[test]
        fn test_same_id_fragments_merge() {
            let mut coalescer = FragmentCoalescer::default();
            coalescer.push(fragment(Some(1), Rect::new(0.0, 0.0, 10.0, 10.0), "a", 1));
            coalescer.push(fragment(Some(2), Rect::new(50.0, 50.0, 60.0, 60.0), "a", 1));
            coalescer.push(fragment(Some(1), Rect::new(10.0, 0.0, 30.0, 5.0), "b", 2));
            let out = coalescer.finish();
            assert_eq!(out.len(), 2);
            assert_eq!(out[0].rect, Rect::new(0.0, 0.0, 30.0, 10.0));
            assert_eq!(out[0].interaction_points.len(), 2);
            assert_eq!(out[0].properties.len(), 2);
        }

        #[test]
        fn test_later_fragment_overwrites_properties() {
            let mut coalescer = FragmentCoalescer::default();
            coalescer.push(fragment(Some(1), Rect::default(), "a", 1));
            let mut later = fragment(Some(1), Rect::default(), "a", 2);
            later.is_visible = false;
            coalescer.push(later);
            let out = coalescer.finish();
            assert_eq!(out[0].properties["a"], json!(2));
            assert!(!out[0].is_visible);
        }

        #[test]
        fn test_features_without_id_never_merge() {
            let mut coalescer = FragmentCoalescer::default();
            coalescer.push(fragment(None, Rect::default(), "a", 1));
            coalescer.push(fragment(None, Rect::default(), "a", 1));
            assert_eq!(coalescer.finish().len(), 2);
        }
    }

    #[test]
    fn test_resolver_dispatch() {
        assert_eq!(
            resolver_for(LayerType::Line).map(|r| r.layer_type()),
            Some(LayerType::Line)
        );
        assert!(resolver_for(LayerType::Raster).is_none());
    }
}
