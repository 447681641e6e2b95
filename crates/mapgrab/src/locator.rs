//! Caller-level locator.
//!
//! A [`MapLocator`] sits on top of [`MapGrab::query`] and applies what a test
//! framework binding needs before dispatching input:
//!
//! - **Visibility**: invisible features are dropped unless asked for
//! - **Merging**: everything into one element, or grouped by a property or
//!   a caller-supplied key
//! - **Indexing**: `first`, `last`, `nth` (negative counts from the end)
//! - **Strictness**: [`MapLocator::element`] refuses ambiguous results
//!
//! Locators are lazy: nothing is resolved until a terminal method runs, and
//! every terminal method resolves afresh.
//!
//! ```
//! use mapgrab::prelude::*;
//! use serde_json::json;
//!
//! let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
//!     .with_layer(SceneLayer::new("stops", LayerType::Circle, "transit"))
//!     .with_feature("transit", SceneFeature::point(1, [0.0, 0.0]).with_property("line", json!("U1")))
//!     .with_feature("transit", SceneFeature::point(2, [1.0, 0.0]).with_property("line", json!("U1")));
//!
//! let mut grab = MapGrab::new();
//! grab.register("main", Box::new(scene));
//!
//! let stops = grab.locator("layer[id=stops]");
//! assert_eq!(stops.count().unwrap(), 2);
//! assert!(stops.element().is_err());
//!
//! let line = grab.locator("layer[id=stops]").merge_by_property("line");
//! assert_eq!(line.element().unwrap().features().len(), 2);
//! ```

use crate::feature::{FeatureMerger, LocatedFeature, ResultFeature};
use crate::geometry::Point;
use crate::interface::MapGrab;
use crate::rect::{Offset, Padding, Rect};
use crate::result::{MapGrabError, MapGrabResult};
use crate::selector::Selector;
use crate::wait::{poll_until, CancellationToken, WaitOptions, WaitResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options of a locator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Keep features drawn with zero opacity
    pub include_hidden: bool,
    /// Polling used by [`MapLocator::wait_for_element`]
    pub wait: WaitOptions,
}

impl LocatorOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep or drop invisible features
    #[must_use]
    pub const fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Set the polling options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }
}

/// Adjustments applied to an element's rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxOptions {
    /// Padding, applied first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    /// Offset, applied after the padding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
}

impl BoundingBoxOptions {
    /// Set the padding
    #[must_use]
    pub const fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Set the offset
    #[must_use]
    pub const fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Apply both adjustments to a rectangle
    #[must_use]
    pub fn apply(&self, rect: Rect) -> Rect {
        let padded = self.padding.map_or(rect, |p| rect.apply_padding(p));
        self.offset.map_or(padded, |o| padded.apply_offset(o))
    }
}

// =============================================================================
// MERGE MODE
// =============================================================================

/// Grouping key computed from a feature
pub type MergeKeyFn = Arc<dyn Fn(&ResultFeature) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
enum MergeMode {
    #[default]
    None,
    All,
    ByProperty(String),
    ByKey(MergeKeyFn),
}

impl fmt::Debug for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::All => f.write_str("All"),
            Self::ByProperty(name) => f.debug_tuple("ByProperty").field(name).finish(),
            Self::ByKey(_) => f.write_str("ByKey(<fn>)"),
        }
    }
}

impl MergeMode {
    fn apply(&self, items: Vec<LocatedFeature>) -> Vec<LocatedFeature> {
        match self {
            Self::None => items,
            Self::All => FeatureMerger::merge_all(items).into_iter().collect(),
            Self::ByProperty(name) => FeatureMerger::merge_by_key(items, |f| f.property_text(name)),
            Self::ByKey(key) => FeatureMerger::merge_by_key(items, |f| key(f)),
        }
    }
}

// =============================================================================
// LOCATOR
// =============================================================================

/// Lazy, chainable query over a [`MapGrab`]
#[derive(Debug, Clone)]
pub struct MapLocator<'a> {
    grab: &'a MapGrab,
    selector: String,
    options: LocatorOptions,
    merge: MergeMode,
    index: Option<i64>,
}

impl<'a> MapLocator<'a> {
    /// Create a locator for selector text
    #[must_use]
    pub fn new(grab: &'a MapGrab, selector: impl Into<String>) -> Self {
        Self {
            grab,
            selector: selector.into(),
            options: LocatorOptions::default(),
            merge: MergeMode::None,
            index: None,
        }
    }

    /// Selector text
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Locator options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Replace the options
    #[must_use]
    pub fn with_options(mut self, options: LocatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Keep invisible features
    #[must_use]
    pub fn include_hidden(mut self) -> Self {
        self.options.include_hidden = true;
        self
    }

    /// Merge every feature into one element
    #[must_use]
    pub fn merge_all(mut self) -> Self {
        self.merge = MergeMode::All;
        self
    }

    /// Merge features sharing a property value
    #[must_use]
    pub fn merge_by_property(mut self, name: impl Into<String>) -> Self {
        self.merge = MergeMode::ByProperty(name.into());
        self
    }

    /// Merge features sharing a caller-computed key
    #[must_use]
    pub fn merge_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&ResultFeature) -> Option<String> + Send + Sync + 'static,
    {
        self.merge = MergeMode::ByKey(Arc::new(key));
        self
    }

    /// First element
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Last element
    #[must_use]
    pub fn last(self) -> Self {
        self.nth(-1)
    }

    /// Element at an index; negative indexes count from the end
    #[must_use]
    pub fn nth(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    /// Resolve to elements
    ///
    /// # Errors
    ///
    /// Returns parse errors and `NoMatchingLayer`.
    pub fn resolve(&self) -> MapGrabResult<Vec<LocatedFeature>> {
        let features = self.grab.query(&self.selector)?;
        let items: Vec<LocatedFeature> = features
            .into_iter()
            .filter(|f| self.options.include_hidden || f.is_visible)
            .map(LocatedFeature::from)
            .collect();
        Ok(self.pick(self.merge.apply(items)))
    }

    /// Number of elements
    ///
    /// # Errors
    ///
    /// See [`MapLocator::resolve`].
    pub fn count(&self) -> MapGrabResult<usize> {
        self.resolve().map(|items| items.len())
    }

    /// The single element this locator designates
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when nothing resolves and `TooManyElements`
    /// when several elements resolve without an index.
    pub fn element(&self) -> MapGrabResult<LocatedFeature> {
        self.single(self.resolve()?)
    }

    /// Poll until the locator designates an element
    ///
    /// Resolution errors other than malformed selectors count as "not yet".
    ///
    /// # Errors
    ///
    /// Returns parse errors immediately, `Timeout`, `Cancelled` and
    /// `TooManyElements`.
    pub fn wait_for_element(
        &self,
        token: &CancellationToken,
    ) -> MapGrabResult<(LocatedFeature, WaitResult)> {
        Selector::parse(&self.selector)?;
        let description = format!("element {}", self.describe());
        let (items, waited) = poll_until(&self.options.wait, token, &description, || {
            self.resolve().ok().filter(|items| !items.is_empty())
        })?;
        Ok((self.single(items)?, waited))
    }

    /// First interaction point of the element
    ///
    /// # Errors
    ///
    /// Returns `NotInteractable` when the element has no confirmed point,
    /// plus the errors of [`MapLocator::element`].
    pub fn interaction_point(&self) -> MapGrabResult<Point> {
        self.element()?
            .interaction_points()
            .first()
            .copied()
            .ok_or_else(|| MapGrabError::NotInteractable {
                selector: self.describe(),
            })
    }

    /// Rectangle of the element, padded then offset
    ///
    /// # Errors
    ///
    /// See [`MapLocator::element`].
    pub fn bounding_box(&self, options: &BoundingBoxOptions) -> MapGrabResult<Rect> {
        Ok(options.apply(*self.element()?.rect()))
    }

    /// Selector text plus chained modifiers, for error messages
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = self.selector.clone();
        match &self.merge {
            MergeMode::None => {}
            MergeMode::All => text.push_str(" >> merge()"),
            MergeMode::ByProperty(name) => text.push_str(&format!(" >> merge({name})")),
            MergeMode::ByKey(_) => text.push_str(" >> merge(<fn>)"),
        }
        if let Some(index) = self.index {
            text.push_str(&format!(" >> nth({index})"));
        }
        text
    }

    fn pick(&self, mut items: Vec<LocatedFeature>) -> Vec<LocatedFeature> {
        let Some(index) = self.index else {
            return items;
        };
        let len = items.len() as i64;
        let position = if index < 0 { len + index } else { index };
        if (0..len).contains(&position) {
            vec![items.swap_remove(position as usize)]
        } else {
            Vec::new()
        }
    }

    fn single(&self, mut items: Vec<LocatedFeature>) -> MapGrabResult<LocatedFeature> {
        if self.index.is_none() && items.len() > 1 {
            return Err(MapGrabError::TooManyElements {
                selector: self.describe(),
                count: items.len(),
            });
        }
        items.pop().ok_or_else(|| MapGrabError::ElementNotFound {
            selector: self.describe(),
        })
    }
}
