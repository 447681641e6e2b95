//! In-memory map adapter.
//!
//! [`SceneMap`] answers every question a live engine answers, over a plain
//! description of a map: a [`Camera`], an ordered style of [`SceneLayer`]s
//! and named sources of [`SceneFeature`]s. Nothing is drawn. It backs the
//! test suites, the benchmarks and the command-line tool.
//!
//! - Layers are drawn bottom-up in style order; queries report the top-most
//!   layer first and, within a layer, features in source order
//! - Paint values are constants or style expressions ([`expression`])
//! - Symbol layers are placed into a [`PlacementIndex`] on first use; labels
//!   never collide, every symbol is placed
//!
//! Scenes load from JSON:
//!
//! ```json
//! {
//!   "camera": { "center": { "lng": 0, "lat": 0 }, "zoom": 3, "width": 400, "height": 300 },
//!   "layers": [{ "id": "stops", "type": "circle", "source": "transit" }],
//!   "sources": {
//!     "transit": [{ "id": 1, "geometry": { "type": "Point", "coordinates": [0, 0] } }]
//!   }
//! }
//! ```

pub mod camera;
pub mod expression;

pub use camera::Camera;

use crate::engine::{
    EngineKind, FeatureId, LayerType, MapAdapter, MapTransform, PaintEvaluator, PaintProperty,
    Properties, QueryGeometry, QueryOptions, RawFeature, StyleLayer, TranslateAnchor, Visibility,
};
use crate::geometry::{
    distance_to_segment, offset_polyline, point_in_rings, translate_points, Geometry, LngLat,
    LngLatBounds, Point, Position,
};
use crate::placement::{
    CollisionGrid, PlacementIndex, RetainedQueryData, RetainedSymbol, SymbolKey,
};
use crate::rect::{Offset, Padding, Rect};
use crate::resolvers::stroke_width;
use crate::result::{MapGrabError, MapGrabResult};
use crate::selector::FilterExpression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, OnceCell};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Map id reported in engine errors raised by a scene
const SCENE: &str = "scene";

/// Collision box of a label whose layout gives neither `text-box` nor
/// `icon-box`
pub const DEFAULT_TEXT_BOX: [f64; 2] = [32.0, 16.0];

/// Distance between repeated labels along a line
pub const DEFAULT_SYMBOL_SPACING: f64 = 250.0;

// =============================================================================
// PAINT
// =============================================================================

/// Paint table of a layer: property name to constant or expression
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenePaint(Properties);

impl ScenePaint {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Raw value of a property
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl PaintEvaluator for ScenePaint {
    fn number(&self, property: PaintProperty, feature: &RawFeature) -> Option<f64> {
        expression::evaluate(self.get(property.name())?, feature).as_f64()
    }

    fn vector(&self, property: PaintProperty) -> Option<[f64; 2]> {
        pair(self.get(property.name())?)
    }

    fn anchor(&self, property: PaintProperty) -> Option<TranslateAnchor> {
        serde_json::from_value(self.get(property.name())?.clone()).ok()
    }
}

/// `[x, y]` or `["literal", [x, y]]`
fn pair(value: &Value) -> Option<[f64; 2]> {
    let value = match value.as_array() {
        Some(items) if items.first().and_then(Value::as_str) == Some("literal") => items.get(1)?,
        _ => value,
    };
    match value.as_array()?.as_slice() {
        [x, y] => Some([x.as_f64()?, y.as_f64()?]),
        _ => None,
    }
}

// =============================================================================
// LAYERS AND FEATURES
// =============================================================================

/// A style layer of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneLayer {
    /// Layer id
    pub id: String,
    /// Layer type
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    /// Source the layer draws
    pub source: String,
    /// Restrict to features of one source layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Layout visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Layer filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpression>,
    /// Paint properties
    #[serde(default)]
    pub paint: ScenePaint,
    /// Layout properties (`text-box`, `icon-box`, `symbol-spacing`,
    /// `symbol-placement`)
    #[serde(default)]
    pub layout: Properties,
}

impl SceneLayer {
    /// Create a visible layer with default paint
    #[must_use]
    pub fn new(id: impl Into<String>, layer_type: LayerType, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer_type,
            source: source.into(),
            source_layer: None,
            visibility: Visibility::Visible,
            filter: None,
            paint: ScenePaint::default(),
            layout: Properties::new(),
        }
    }

    /// Set a paint property
    #[must_use]
    pub fn with_paint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.paint = self.paint.with(name, value);
        self
    }

    /// Set a layout property
    #[must_use]
    pub fn with_layout(mut self, name: impl Into<String>, value: Value) -> Self {
        self.layout.insert(name.into(), value);
        self
    }

    /// Set the visibility
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the layer filter
    #[must_use]
    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Restrict to a source layer
    #[must_use]
    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    /// Style entry of the layer
    #[must_use]
    pub fn style_layer(&self) -> StyleLayer {
        StyleLayer {
            id: self.id.clone(),
            layer_type: self.layer_type,
            source: Some(self.source.clone()),
            visibility: self.visibility,
        }
    }

    fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    fn layout_pair(&self, name: &str) -> Option<[f64; 2]> {
        pair(self.layout.get(name)?)
    }

    fn layout_number(&self, name: &str) -> Option<f64> {
        self.layout.get(name)?.as_f64()
    }

    fn layout_text(&self, name: &str) -> Option<&str> {
        self.layout.get(name)?.as_str()
    }
}

/// A source feature of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFeature {
    /// Feature id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
    /// Source layer within a vector source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Feature properties
    #[serde(default)]
    pub properties: Properties,
    /// Feature state
    #[serde(default)]
    pub state: Properties,
    /// Geometry
    pub geometry: Geometry,
}

impl SceneFeature {
    /// Create a feature without id
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            source_layer: None,
            properties: Properties::new(),
            state: Properties::new(),
            geometry,
        }
    }

    /// Point feature
    #[must_use]
    pub fn point(id: i64, position: Position) -> Self {
        Self::new(Geometry::Point(position)).with_id(Some(FeatureId::Int(id)))
    }

    /// Line feature
    #[must_use]
    pub fn line(id: i64, positions: Vec<Position>) -> Self {
        Self::new(Geometry::LineString(positions)).with_id(Some(FeatureId::Int(id)))
    }

    /// Polygon feature, outer ring first
    #[must_use]
    pub fn polygon(id: i64, rings: Vec<Vec<Position>>) -> Self {
        Self::new(Geometry::Polygon(rings)).with_id(Some(FeatureId::Int(id)))
    }

    /// Replace the id
    #[must_use]
    pub fn with_id(mut self, id: Option<FeatureId>) -> Self {
        self.id = id;
        self
    }

    /// Set a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Set a feature-state entry
    #[must_use]
    pub fn with_state(mut self, name: impl Into<String>, value: Value) -> Self {
        self.state.insert(name.into(), value);
        self
    }

    /// Set the source layer
    #[must_use]
    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    fn to_raw(&self, layer: &SceneLayer) -> RawFeature {
        RawFeature {
            id: self.id.clone(),
            source_id: layer.source.clone(),
            source_layer: self.source_layer.clone(),
            layer_id: layer.id.clone(),
            layer_type: layer.layer_type,
            properties: self.properties.clone(),
            state: self.state.clone(),
            geometry: self.geometry.clone(),
        }
    }
}

// =============================================================================
// SCREEN SHAPES
// =============================================================================

/// What a layer draws for one feature, in canvas pixels
#[derive(Debug, Clone, PartialEq)]
enum ScreenShape {
    Circles { centers: Vec<Point>, radius: f64 },
    Area { rings: Vec<Vec<Point>> },
    Stroke { parts: Vec<Vec<Point>>, half_width: f64 },
    Nothing,
}

impl ScreenShape {
    fn envelope(&self) -> Option<Rect> {
        match self {
            Self::Circles { centers, radius } => {
                Rect::from_points(centers).map(|r| r.apply_padding(Padding::Uniform(*radius)))
            }
            Self::Area { rings } => Rect::from_points(rings.iter().flatten()),
            Self::Stroke { parts, half_width } => Rect::from_points(parts.iter().flatten())
                .map(|r| r.apply_padding(Padding::Uniform(*half_width))),
            Self::Nothing => None,
        }
    }

    fn contains(&self, point: Point) -> bool {
        match self {
            Self::Circles { centers, radius } => centers.iter().any(|c| c.distance(point) <= *radius),
            Self::Area { rings } => point_in_rings(point, rings),
            Self::Stroke { parts, half_width } => parts.iter().any(|part| match part.as_slice() {
                [single] => single.distance(point) <= *half_width,
                _ => part
                    .windows(2)
                    .any(|w| distance_to_segment(point, w[0], w[1]) <= *half_width),
            }),
            Self::Nothing => false,
        }
    }
}

// =============================================================================
// SCENE MAP
// =============================================================================

/// In-memory map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMap {
    #[serde(default)]
    engine: EngineKind,
    #[serde(default)]
    camera: Camera,
    #[serde(default)]
    container_origin: Point,
    #[serde(default)]
    layers: Vec<SceneLayer>,
    #[serde(default)]
    sources: BTreeMap<String, Vec<SceneFeature>>,
    #[serde(default)]
    pending_frames: Cell<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engine_fault: Option<String>,
    #[serde(skip)]
    placement: OnceCell<PlacementIndex>,
}

impl SceneMap {
    /// Create a map without style or sources
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    /// Load a scene from a JSON file
    ///
    /// # Errors
    ///
    /// Returns I/O and JSON errors.
    pub fn from_file(path: impl AsRef<Path>) -> MapGrabResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Set the rendering engine
    #[must_use]
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self.placement = OnceCell::new();
        self
    }

    /// Append a layer on top of the style
    #[must_use]
    pub fn with_layer(mut self, layer: SceneLayer) -> Self {
        self.layers.push(layer);
        self.placement = OnceCell::new();
        self
    }

    /// Append a feature to a source
    #[must_use]
    pub fn with_feature(mut self, source: impl Into<String>, feature: SceneFeature) -> Self {
        self.sources.entry(source.into()).or_default().push(feature);
        self.placement = OnceCell::new();
        self
    }

    /// Place the canvas inside the page
    #[must_use]
    pub fn with_container_origin(mut self, x: f64, y: f64) -> Self {
        self.container_origin = Point::new(x, y);
        self
    }

    /// Report unstable for the next `frames` stability checks
    #[must_use]
    pub fn with_pending_frames(self, frames: u32) -> Self {
        self.pending_frames.set(frames);
        self
    }

    /// Make every feature query fail with an engine error
    #[must_use]
    pub fn with_engine_fault(mut self, message: impl Into<String>) -> Self {
        self.engine_fault = Some(message.into());
        self
    }

    /// Camera
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Layer by id
    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&SceneLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Features of a source
    #[must_use]
    pub fn features(&self, source: &str) -> &[SceneFeature] {
        self.sources.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    fn canvas(&self) -> Rect {
        self.camera.transform().canvas()
    }

    fn placement_index(&self) -> &PlacementIndex {
        self.placement.get_or_init(|| self.place_symbols())
    }

    /// Features a layer draws, with their index in the source
    fn layer_features<'s>(
        &'s self,
        layer: &'s SceneLayer,
    ) -> impl Iterator<Item = (usize, RawFeature)> + 's {
        self.features(&layer.source)
            .iter()
            .enumerate()
            .filter(move |(_, f)| layer.source_layer.is_none() || f.source_layer == layer.source_layer)
            .map(move |(i, f)| (i, f.to_raw(layer)))
            .filter(move |(_, raw)| {
                layer
                    .filter
                    .as_ref()
                    .map_or(true, |filter| expression::evaluate_filter(filter.as_value(), raw))
            })
    }

    fn screen_shape(&self, layer: &SceneLayer, feature: &RawFeature) -> ScreenShape {
        let paint = &layer.paint;
        let geometry = self.world_copy(&feature.geometry);
        let project = |part: &Vec<LngLat>| -> Vec<Point> {
            part.iter().map(|p| self.camera.project(*p)).collect()
        };
        let shift = |points: Vec<Point>, vector: PaintProperty, anchor: PaintProperty| {
            let translate = paint.translate(vector, anchor);
            translate_points(&points, translate.offset, translate.rotation(self.camera.bearing))
        };

        match layer.layer_type {
            LayerType::Circle => ScreenShape::Circles {
                centers: shift(
                    project(&geometry.coord_all()),
                    PaintProperty::CircleTranslate,
                    PaintProperty::CircleTranslateAnchor,
                ),
                radius: paint.evaluate(PaintProperty::CircleRadius, feature)
                    + paint.evaluate(PaintProperty::CircleStrokeWidth, feature),
            },
            LayerType::Fill if geometry.is_polygonal() => ScreenShape::Area {
                rings: geometry
                    .parts()
                    .iter()
                    .map(|ring| {
                        shift(
                            project(ring),
                            PaintProperty::FillTranslate,
                            PaintProperty::FillTranslateAnchor,
                        )
                    })
                    .collect(),
            },
            LayerType::Line => {
                let offset = paint.evaluate(PaintProperty::LineOffset, feature);
                ScreenShape::Stroke {
                    parts: geometry
                        .parts()
                        .iter()
                        .map(|part| {
                            let shifted = shift(
                                project(part),
                                PaintProperty::LineTranslate,
                                PaintProperty::LineTranslateAnchor,
                            );
                            offset_polyline(&shifted, offset)
                        })
                        .collect(),
                    half_width: stroke_width(paint, feature) / 2.0,
                }
            }
            _ => ScreenShape::Nothing,
        }
    }

    fn world_copy(&self, geometry: &Geometry) -> Geometry {
        geometry.world_copy_near(self.camera.center.lng)
    }

    fn hit(&self, layer: &SceneLayer, feature: &RawFeature, geometry: Option<&QueryGeometry>) -> bool {
        let shape = self.screen_shape(layer, feature);
        match geometry {
            None => shape.envelope().is_some_and(|e| e.intersects(&self.canvas())),
            Some(QueryGeometry::Box(area)) => shape.envelope().is_some_and(|e| e.intersects(area)),
            Some(QueryGeometry::Point(point)) => shape.contains(*point),
        }
    }

    fn rendered_symbols(
        &self,
        layer: &SceneLayer,
        geometry: Option<&QueryGeometry>,
        options: &QueryOptions,
    ) -> Vec<RawFeature> {
        let area = geometry.map_or_else(|| self.canvas(), QueryGeometry::rect);
        let restricted = QueryOptions::default()
            .with_layers(vec![layer.id.clone()])
            .with_filter(options.filter.clone());
        self.placement_index()
            .query_rendered_symbols(&area, &restricted, |feature, filter| {
                self.feature_matches(feature, filter)
            })
            .into_iter()
            .flat_map(|layer| layer.symbols)
            .map(|hit| hit.feature)
            .collect()
    }

    // =========================================================================
    // SYMBOL PLACEMENT
    // =========================================================================

    /// One bucket per visible symbol layer, all in the tile under the centre
    fn place_symbols(&self) -> PlacementIndex {
        let mut index = PlacementIndex::default();
        let tile_id = self.camera.center_tile();
        let symbol_layers = self
            .layers
            .iter()
            .filter(|l| l.layer_type == LayerType::Symbol && l.is_visible());

        for (bucket, layer) in symbol_layers.enumerate() {
            let bucket_instance_id = bucket as u32;
            let mut features = Vec::new();
            for (i, raw) in self.layer_features(layer) {
                let key = SymbolKey::new(bucket_instance_id, i as u32);
                if self.place(&mut index.grid, key, layer, &raw) {
                    features.push(RetainedSymbol {
                        feature_index: key.feature_index,
                        feature: raw,
                    });
                }
            }
            index.retained.push(RetainedQueryData {
                bucket_instance_id,
                tile_id,
                feature_sort_order: None,
                features,
            });
        }

        debug!(
            buckets = index.retained.len(),
            boxes = index.grid.boxes.len(),
            circles = index.grid.circles.len(),
            "symbols placed"
        );
        index
    }

    fn place(&self, grid: &mut CollisionGrid, key: SymbolKey, layer: &SceneLayer, feature: &RawFeature) -> bool {
        let linear = matches!(
            feature.geometry,
            Geometry::LineString(_) | Geometry::MultiLineString(_)
        );
        if linear && layer.layout_text("symbol-placement") != Some("point") {
            self.place_along_lines(grid, key, layer, feature)
        } else {
            self.place_at_anchors(grid, key, layer, feature)
        }
    }

    /// MapLibre stores boxes already moved by the paint translate; MapBox
    /// stores them where the layout put them
    fn stored_shift(&self, layer: &SceneLayer, property: PaintProperty) -> Point {
        match self.engine {
            EngineKind::MapBox => Point::default(),
            EngineKind::MapLibre => {
                let [x, y] = layer.paint.vector(property).unwrap_or([0.0, 0.0]);
                Point::new(x, y)
            }
        }
    }

    fn place_at_anchors(
        &self,
        grid: &mut CollisionGrid,
        key: SymbolKey,
        layer: &SceneLayer,
        feature: &RawFeature,
    ) -> bool {
        let boxes: Vec<([f64; 2], PaintProperty)> =
            match (layer.layout_pair("text-box"), layer.layout_pair("icon-box")) {
                (None, None) => vec![(DEFAULT_TEXT_BOX, PaintProperty::TextTranslate)],
                (text, icon) => text
                    .map(|size| (size, PaintProperty::TextTranslate))
                    .into_iter()
                    .chain(icon.map(|size| (size, PaintProperty::IconTranslate)))
                    .collect(),
            };

        let anchors = label_anchors(&self.world_copy(&feature.geometry));
        for anchor in &anchors {
            let at = self.camera.project(*anchor);
            for ([width, height], translate) in &boxes {
                let shift = self.stored_shift(layer, *translate);
                let rect = Rect::new(
                    at.x - width / 2.0,
                    at.y - height / 2.0,
                    at.x + width / 2.0,
                    at.y + height / 2.0,
                );
                grid.insert_box(key, rect.apply_offset(Offset::Xy { x: shift.x, y: shift.y }));
            }
        }
        !anchors.is_empty()
    }

    /// Repeat the label every `symbol-spacing` pixels, starting half a
    /// spacing in, wherever the whole label fits on the line. Each instance
    /// is a row of collision circles as tall as the label.
    fn place_along_lines(
        &self,
        grid: &mut CollisionGrid,
        key: SymbolKey,
        layer: &SceneLayer,
        feature: &RawFeature,
    ) -> bool {
        let [width, height] = layer.layout_pair("text-box").unwrap_or(DEFAULT_TEXT_BOX);
        let spacing = layer
            .layout_number("symbol-spacing")
            .unwrap_or(DEFAULT_SYMBOL_SPACING)
            .max(1.0);
        let radius = height / 2.0;
        let count = ((width - height) / height).max(0.0).floor() as usize + 1;
        let shift = self.stored_shift(layer, PaintProperty::TextTranslate);

        let mut placed = false;
        for part in self.world_copy(&feature.geometry).parts() {
            let line: Vec<Point> = part.iter().map(|p| self.camera.project(*p)).collect();
            let length = polyline_length(&line);
            let mut anchor = spacing / 2.0;
            while anchor + width / 2.0 <= length {
                if anchor >= width / 2.0 {
                    let first = anchor - (count - 1) as f64 * height / 2.0;
                    for k in 0..count {
                        if let Some(center) = point_along(&line, first + k as f64 * height) {
                            grid.insert_circle(key, center.add(shift), radius);
                        }
                    }
                    placed = true;
                }
                anchor += spacing;
            }
        }
        placed
    }
}

/// Anchors of point-placed labels: every point, the first vertex of each
/// line, the bounding box centre of each outer ring
fn label_anchors(geometry: &Geometry) -> Vec<LngLat> {
    let ring_center = |rings: &Vec<Vec<Position>>| {
        let outer = rings.first()?;
        let b = LngLatBounds::from_positions(outer.iter().copied().map(LngLat::from))?;
        Some(LngLat::new((b.west + b.east) / 2.0, (b.south + b.north) / 2.0))
    };
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => geometry.coord_all(),
        Geometry::LineString(_) | Geometry::MultiLineString(_) => geometry
            .parts()
            .into_iter()
            .filter_map(|part| part.first().copied())
            .collect(),
        Geometry::Polygon(rings) => ring_center(rings).into_iter().collect(),
        Geometry::MultiPolygon(polygons) => polygons.iter().filter_map(ring_center).collect(),
    }
}

fn polyline_length(line: &[Point]) -> f64 {
    line.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point at a distance along a polyline
fn point_along(line: &[Point], distance: f64) -> Option<Point> {
    let mut travelled = 0.0;
    for w in line.windows(2) {
        let segment = w[0].distance(w[1]);
        if segment > 0.0 && travelled + segment >= distance {
            let t = (distance - travelled) / segment;
            return Some(w[0].add(w[1].sub(w[0]).mult(t)));
        }
        travelled += segment;
    }
    None
}

impl MapAdapter for SceneMap {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    fn style_layers(&self) -> Vec<StyleLayer> {
        self.layers.iter().map(SceneLayer::style_layer).collect()
    }

    fn query_rendered_features(
        &self,
        geometry: Option<&QueryGeometry>,
        options: &QueryOptions,
    ) -> MapGrabResult<Vec<RawFeature>> {
        if let Some(message) = &self.engine_fault {
            return Err(MapGrabError::engine(SCENE, message.clone()));
        }
        if let Some(missing) = options.layers.iter().flatten().find(|id| self.layer(id).is_none()) {
            return Err(MapGrabError::engine(
                SCENE,
                format!("layer `{missing}` does not exist in the map's style"),
            ));
        }

        let mut rendered = Vec::new();
        for layer in self.layers.iter().rev() {
            if !layer.is_visible() || !options.allows_layer(&layer.id) {
                continue;
            }
            if layer.layer_type == LayerType::Symbol {
                rendered.extend(self.rendered_symbols(layer, geometry, options));
                continue;
            }
            for (_, feature) in self.layer_features(layer) {
                if let Some(filter) = &options.filter {
                    if !self.feature_matches(&feature, filter) {
                        continue;
                    }
                }
                if self.hit(layer, &feature, geometry) {
                    rendered.push(feature);
                }
            }
        }
        Ok(rendered)
    }

    fn paint(&self, layer_id: &str) -> Option<&dyn PaintEvaluator> {
        self.layer(layer_id)
            .map(|layer| &layer.paint as &dyn PaintEvaluator)
    }

    fn placement(&self) -> Option<&PlacementIndex> {
        Some(self.placement_index())
    }

    fn feature_matches(&self, feature: &RawFeature, filter: &FilterExpression) -> bool {
        expression::evaluate_filter(filter.as_value(), feature)
    }

    fn transform(&self) -> MapTransform {
        self.camera.transform()
    }

    fn project(&self, position: LngLat) -> Point {
        self.camera.project(position)
    }

    fn unproject(&self, point: Point) -> LngLat {
        self.camera.unproject(point)
    }

    fn visible_bounds(&self) -> LngLatBounds {
        self.camera.visible_bounds()
    }

    fn container(&self) -> Rect {
        Rect::from_xywh(
            self.container_origin.x,
            self.container_origin.y,
            self.camera.width,
            self.camera.height,
        )
    }

    fn is_stable(&self) -> bool {
        let pending = self.pending_frames.get();
        if pending == 0 {
            return true;
        }
        self.pending_frames.set(pending - 1);
        false
    }

    fn set_layer_visibility(&mut self, layer_id: &str, visibility: Visibility) -> MapGrabResult<()> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or_else(|| {
                MapGrabError::engine(SCENE, format!("layer `{layer_id}` does not exist"))
            })?;
        layer.visibility = visibility;
        self.placement = OnceCell::new();
        Ok(())
    }
}
