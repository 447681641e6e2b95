//! MapGrab: selector-driven locators for vector-tile map features
//!
//! Browser test tooling sees a map widget as one opaque canvas. MapGrab looks
//! inside it: a CSS-like selector names maps, layers and a feature filter, and
//! every rendered feature it matches comes back with its on-screen rectangle,
//! the canvas points where a click would really land on it and its
//! properties.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      MapGrab Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐             │
//! │   │ Selector   │    │ Query      │    │ MapAdapter │             │
//! │   │ map[..]    │───►│ Resolver   │───►│ (engine or │             │
//! │   │ layer[..]  │    │            │    │  SceneMap) │             │
//! │   └────────────┘    └─────┬──────┘    └────────────┘             │
//! │                           │                                       │
//! │         ┌─────────────────┼─────────────────┐                     │
//! │         ▼                 ▼                 ▼                     │
//! │   ┌──────────┐     ┌────────────┐    ┌─────────────┐              │
//! │   │ Layer    │     │ Symbol     │    │ Interaction │              │
//! │   │ resolvers│     │ placement  │    │ points      │              │
//! │   └──────────┘     └────────────┘    └─────────────┘              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use mapgrab::prelude::*;
//!
//! let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
//!     .with_layer(SceneLayer::new("stops", LayerType::Circle, "transit"))
//!     .with_feature("transit", SceneFeature::point(1, [0.0, 0.0]));
//!
//! let mut grab = MapGrab::new();
//! grab.register("main", Box::new(scene));
//!
//! let stop = grab.locator("layer[id=stops]").element().unwrap();
//! assert!(stop.is_visible());
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod engine;
pub mod expose;
pub mod feature;
pub mod geometry;
pub mod interaction;
pub mod interface;
#[allow(clippy::missing_errors_doc)]
pub mod locator;
pub mod placement;
pub mod query;
pub mod rect;
pub mod registry;
pub mod resolvers;
pub mod result;
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub mod scene;
pub mod selector;
pub mod wait;

pub use engine::{
    EngineKind, FeatureId, LayerType, MapAdapter, MapTransform, PaintEvaluator, PaintProperty,
    Properties, QueryGeometry, QueryOptions, RawFeature, StyleLayer, Visibility,
};
pub use expose::{ExposureState, HiddenLayers};
pub use feature::{FeatureMerger, LocatedFeature, MergedFeature, ResultFeature};
pub use geometry::{Geometry, LngLat, LngLatBounds, Point};
pub use interface::MapGrab;
pub use locator::{BoundingBoxOptions, LocatorOptions, MapLocator};
pub use rect::{Offset, Padding, Rect};
pub use result::{MapGrabError, MapGrabResult};
pub use selector::{FilterExpression, Selector};
pub use wait::{CancellationToken, WaitOptions, WaitResult};

/// Everything a test needs in one import
pub mod prelude {
    pub use super::engine::{
        EngineKind, FeatureId, LayerType, MapAdapter, QueryGeometry, QueryOptions, Visibility,
    };
    pub use super::expose::{ExposureState, HiddenLayers};
    pub use super::feature::{FeatureMerger, LocatedFeature, MergedFeature, ResultFeature};
    pub use super::geometry::{Geometry, LngLat, Point};
    pub use super::interface::MapGrab;
    pub use super::locator::{BoundingBoxOptions, LocatorOptions, MapLocator};
    pub use super::rect::{Offset, Padding, Rect};
    pub use super::result::{MapGrabError, MapGrabResult};
    pub use super::scene::{Camera, SceneFeature, SceneLayer, SceneMap};
    pub use super::selector::{FilterExpression, Selector};
    pub use super::wait::{CancellationToken, WaitOptions, WaitResult};
}
