//! Map engine abstraction.
//!
//! Everything the resolvers read from a live map goes through the
//! [`MapAdapter`] trait: the style's layer list, the raw rendered-feature
//! query, paint property evaluation, the symbol placement index, the camera
//! transform and the canvas container.
//!
//! Two engines are supported. They share the shape of their internal state
//! and differ only in a few narrow spots, which are selected by
//! [`EngineKind`].

use crate::geometry::{Geometry, LngLat, LngLatBounds, Point};
use crate::placement::PlacementIndex;
use crate::rect::Rect;
use crate::result::{MapGrabError, MapGrabResult};
use crate::selector::FilterExpression;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ENGINE KIND
// =============================================================================

/// Supported rendering engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// MapLibre GL
    #[default]
    MapLibre,
    /// Mapbox GL
    MapBox,
}

impl EngineKind {
    /// Detect the engine from the map container's class list
    #[must_use]
    pub fn detect(container_class: &str) -> Self {
        if container_class.contains("mapbox") {
            Self::MapBox
        } else {
            Self::MapLibre
        }
    }

    /// Get engine name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MapLibre => "maplibre",
            Self::MapBox => "mapbox",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// STYLE
// =============================================================================

/// Style layer types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    /// Polygons
    Fill,
    /// Polylines
    Line,
    /// Labels and icons
    Symbol,
    /// Point circles
    Circle,
    /// Map background
    Background,
    /// Raster tiles
    Raster,
    /// Heatmap
    Heatmap,
    /// Hillshading
    Hillshade,
    /// Extruded polygons
    FillExtrusion,
    /// Any type this crate does not know
    #[serde(other)]
    Unknown,
}

impl LayerType {
    /// Style name of the type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Line => "line",
            Self::Symbol => "symbol",
            Self::Circle => "circle",
            Self::Background => "background",
            Self::Raster => "raster",
            Self::Heatmap => "heatmap",
            Self::Hillshade => "hillshade",
            Self::FillExtrusion => "fill-extrusion",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout visibility of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Layer is drawn
    #[default]
    Visible,
    /// Layer is hidden
    None,
}

impl Visibility {
    /// Style name of the value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::None => "none",
        }
    }
}

/// A layer of the map's current style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleLayer {
    /// Layer id
    pub id: String,
    /// Layer type
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    /// Source id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Layout visibility
    #[serde(default)]
    pub visibility: Visibility,
}

impl StyleLayer {
    /// Create a visible layer
    #[must_use]
    pub fn new(id: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            id: id.into(),
            layer_type,
            source: None,
            visibility: Visibility::Visible,
        }
    }

    /// Set the source id
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// =============================================================================
// FEATURES
// =============================================================================

/// Feature identifier reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    /// Numeric id
    Int(i64),
    /// String id
    Text(String),
}

impl FeatureId {
    /// JSON form of the id
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Text(v) => serde_json::Value::from(v.as_str()),
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FeatureId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Feature properties
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A rendered feature as reported by the engine's feature query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeature {
    /// Feature id, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
    /// Source id
    pub source_id: String,
    /// Source layer within a vector source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Style layer that rendered the feature
    pub layer_id: String,
    /// Type of that layer
    pub layer_type: LayerType,
    /// Feature properties
    #[serde(default)]
    pub properties: Properties,
    /// Feature state
    #[serde(default)]
    pub state: Properties,
    /// Geometry in geographic coordinates
    pub geometry: Geometry,
}

// =============================================================================
// PAINT
// =============================================================================

/// Paint properties read by the resolvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaintProperty {
    /// `circle-radius`
    CircleRadius,
    /// `circle-stroke-width`
    CircleStrokeWidth,
    /// `circle-opacity`
    CircleOpacity,
    /// `circle-translate`
    CircleTranslate,
    /// `circle-translate-anchor`
    CircleTranslateAnchor,
    /// `fill-opacity`
    FillOpacity,
    /// `fill-translate`
    FillTranslate,
    /// `fill-translate-anchor`
    FillTranslateAnchor,
    /// `line-opacity`
    LineOpacity,
    /// `line-width`
    LineWidth,
    /// `line-gap-width`
    LineGapWidth,
    /// `line-blur`
    LineBlur,
    /// `line-offset`
    LineOffset,
    /// `line-translate`
    LineTranslate,
    /// `line-translate-anchor`
    LineTranslateAnchor,
    /// `icon-opacity`
    IconOpacity,
    /// `text-opacity`
    TextOpacity,
    /// `icon-translate`
    IconTranslate,
    /// `text-translate`
    TextTranslate,
}

impl PaintProperty {
    /// Style name of the property
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CircleRadius => "circle-radius",
            Self::CircleStrokeWidth => "circle-stroke-width",
            Self::CircleOpacity => "circle-opacity",
            Self::CircleTranslate => "circle-translate",
            Self::CircleTranslateAnchor => "circle-translate-anchor",
            Self::FillOpacity => "fill-opacity",
            Self::FillTranslate => "fill-translate",
            Self::FillTranslateAnchor => "fill-translate-anchor",
            Self::LineOpacity => "line-opacity",
            Self::LineWidth => "line-width",
            Self::LineGapWidth => "line-gap-width",
            Self::LineBlur => "line-blur",
            Self::LineOffset => "line-offset",
            Self::LineTranslate => "line-translate",
            Self::LineTranslateAnchor => "line-translate-anchor",
            Self::IconOpacity => "icon-opacity",
            Self::TextOpacity => "text-opacity",
            Self::IconTranslate => "icon-translate",
            Self::TextTranslate => "text-translate",
        }
    }

    /// Look a property up by its style name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Every property
    pub const ALL: [Self; 19] = [
        Self::CircleRadius,
        Self::CircleStrokeWidth,
        Self::CircleOpacity,
        Self::CircleTranslate,
        Self::CircleTranslateAnchor,
        Self::FillOpacity,
        Self::FillTranslate,
        Self::FillTranslateAnchor,
        Self::LineOpacity,
        Self::LineWidth,
        Self::LineGapWidth,
        Self::LineBlur,
        Self::LineOffset,
        Self::LineTranslate,
        Self::LineTranslateAnchor,
        Self::IconOpacity,
        Self::TextOpacity,
        Self::IconTranslate,
        Self::TextTranslate,
    ];

    /// Engine default for numeric properties
    #[must_use]
    pub const fn default_value(&self) -> f64 {
        match self {
            Self::CircleRadius => 5.0,
            Self::LineWidth
            | Self::CircleOpacity
            | Self::FillOpacity
            | Self::LineOpacity
            | Self::IconOpacity
            | Self::TextOpacity => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for PaintProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame a paint translate is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslateAnchor {
    /// Relative to the map (rotates with it)
    #[default]
    Map,
    /// Relative to the viewport
    Viewport,
}

/// Evaluated paint translate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaintTranslate {
    /// Translate vector in pixels
    pub offset: Point,
    /// Anchor frame
    pub anchor: TranslateAnchor,
}

impl PaintTranslate {
    /// Rotation (radians) to apply to the vector for a map bearing in degrees
    #[must_use]
    pub fn rotation(&self, bearing: f64) -> f64 {
        match self.anchor {
            TranslateAnchor::Viewport => bearing.to_radians(),
            TranslateAnchor::Map => 0.0,
        }
    }
}

/// Read access to one layer's evaluated paint properties
pub trait PaintEvaluator {
    /// Evaluate a numeric (possibly data-driven) property for a feature
    fn number(&self, property: PaintProperty, feature: &RawFeature) -> Option<f64>;

    /// Evaluate a two-component property (translates)
    fn vector(&self, property: PaintProperty) -> Option<[f64; 2]>;

    /// Evaluate a translate anchor property
    fn anchor(&self, property: PaintProperty) -> Option<TranslateAnchor>;

    /// Numeric property with the engine default as fallback
    fn evaluate(&self, property: PaintProperty, feature: &RawFeature) -> f64 {
        self.number(property, feature)
            .unwrap_or_else(|| property.default_value())
    }

    /// Translate vector and its anchor
    fn translate(&self, vector: PaintProperty, anchor: PaintProperty) -> PaintTranslate {
        let [x, y] = self.vector(vector).unwrap_or([0.0, 0.0]);
        PaintTranslate {
            offset: Point::new(x, y),
            anchor: self.anchor(anchor).unwrap_or_default(),
        }
    }
}

// =============================================================================
// MAP ADAPTER
// =============================================================================

/// Camera state needed for screen conversion
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapTransform {
    /// Geographic position at the canvas centre
    #[serde(default)]
    pub center: LngLat,
    /// Bearing in degrees, clockwise from north
    pub bearing: f64,
    /// Zoom level
    pub zoom: f64,
    /// Canvas width in CSS pixels
    pub width: f64,
    /// Canvas height in CSS pixels
    pub height: f64,
}

impl MapTransform {
    /// Canvas rectangle in map-relative pixels
    #[must_use]
    pub fn canvas(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Geometry restricting a rendered-feature query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryGeometry {
    /// Single canvas pixel
    Point(Point),
    /// Canvas rectangle
    Box(Rect),
}

impl QueryGeometry {
    /// Query rectangle (a point becomes a degenerate box)
    #[must_use]
    pub fn rect(&self) -> Rect {
        match self {
            Self::Point(p) => Rect::new(p.x, p.y, p.x, p.y),
            Self::Box(r) => *r,
        }
    }
}

/// Options of a rendered-feature query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Layer restriction; `None` queries every layer
    pub layers: Option<Vec<String>>,
    /// Feature filter
    pub filter: Option<FilterExpression>,
}

impl QueryOptions {
    /// Restrict to a set of layers
    #[must_use]
    pub fn with_layers(mut self, layers: Vec<String>) -> Self {
        self.layers = Some(layers);
        self
    }

    /// Apply a filter
    #[must_use]
    pub fn with_filter(mut self, filter: Option<FilterExpression>) -> Self {
        self.filter = filter;
        self
    }

    /// Check if a layer passes the restriction
    #[must_use]
    pub fn allows_layer(&self, layer_id: &str) -> bool {
        self.layers
            .as_ref()
            .map_or(true, |layers| layers.iter().any(|l| l == layer_id))
    }
}

/// A live map instance the resolvers read from
pub trait MapAdapter: fmt::Debug {
    /// Engine rendering the map
    fn engine(&self) -> EngineKind;

    /// Layers of the current style, bottom-most first; empty while the style
    /// is not loaded
    fn style_layers(&self) -> Vec<StyleLayer>;

    /// Rendered features touching the geometry (whole canvas when `None`),
    /// top-most layer first
    fn query_rendered_features(
        &self,
        geometry: Option<&QueryGeometry>,
        options: &QueryOptions,
    ) -> MapGrabResult<Vec<RawFeature>>;

    /// Paint state of a layer
    fn paint(&self, layer_id: &str) -> Option<&dyn PaintEvaluator>;

    /// Symbol placement index, when labels have been placed
    fn placement(&self) -> Option<&PlacementIndex>;

    /// Check if a feature passes a filter expression
    fn feature_matches(&self, feature: &RawFeature, filter: &FilterExpression) -> bool;

    /// Current camera
    fn transform(&self) -> MapTransform;

    /// Geographic position to canvas pixels
    fn project(&self, position: LngLat) -> Point;

    /// Canvas pixels to geographic position
    fn unproject(&self, point: Point) -> LngLat;

    /// Geographic bounds currently visible on the canvas
    fn visible_bounds(&self) -> LngLatBounds;

    /// Container bounds in page pixels
    fn container(&self) -> Rect;

    /// Check if the map is idle (no camera animation, no pending tiles)
    fn is_stable(&self) -> bool;

    /// Change a layer's layout visibility
    fn set_layer_visibility(
        &mut self,
        layer_id: &str,
        visibility: Visibility,
    ) -> MapGrabResult<()> {
        let _ = (layer_id, visibility);
        Err(MapGrabError::unsupported("set_layer_visibility"))
    }
}
