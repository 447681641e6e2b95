//! Selector resolution.
//!
//! [`QueryResolver`] turns a parsed [`Selector`] into the list of resolved
//! features across every targeted map:
//!
//! 1. Resolve the target maps from the map predicate
//! 2. Per map, resolve the layer restriction from the layer predicate
//! 3. Per map, run the raw feature query and dispatch each layer type group to
//!    its resolver ([`MapQuery::query_map`])
//! 4. Concatenate the per-map results in registration order
//!
//! A failure on one map never fails the whole query: the map is logged and
//! skipped.

use crate::engine::{LayerType, MapAdapter, QueryGeometry, QueryOptions, RawFeature};
use crate::feature::ResultFeature;
use crate::registry::{MapRegistry, RegisteredMap};
use crate::resolvers::{resolver_for, ResolveContext};
use crate::result::{MapGrabError, MapGrabResult};
use crate::selector::{LayerMatch, Selector};
use tracing::{debug, trace, warn};

/// Raw query parameters for one map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Canvas geometry; `None` queries the whole canvas
    pub geometry: Option<QueryGeometry>,
    /// Layer restriction and filter
    pub options: QueryOptions,
}

impl QueryRequest {
    /// Query the whole canvas
    #[must_use]
    pub fn new(options: QueryOptions) -> Self {
        Self {
            geometry: None,
            options,
        }
    }

    /// Restrict the query to a canvas geometry
    #[must_use]
    pub fn with_geometry(mut self, geometry: QueryGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Single-map query pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct MapQuery;

impl MapQuery {
    /// Query one map and resolve every returned feature.
    ///
    /// Raw features are grouped by layer type in first-seen order; each group
    /// goes to its resolver once. Types without a resolver are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first engine or resolver error.
    pub fn query_map(
        map_id: &str,
        adapter: &dyn MapAdapter,
        request: &QueryRequest,
    ) -> MapGrabResult<Vec<ResultFeature>> {
        let raw = adapter.query_rendered_features(request.geometry.as_ref(), &request.options)?;
        let ctx = ResolveContext::new(map_id, adapter, request.geometry, &request.options);

        let mut resolved = Vec::new();
        for (layer_type, features) in group_by_type(raw) {
            let Some(resolver) = resolver_for(layer_type) else {
                trace!(map = map_id, %layer_type, count = features.len(), "no resolver");
                continue;
            };
            let results = resolver.resolve(&ctx, &features)?;
            debug!(
                map = map_id,
                %layer_type,
                raw = features.len(),
                resolved = results.len(),
                "resolved layer group"
            );
            resolved.extend(results);
        }
        Ok(resolved)
    }
}

fn group_by_type(raw: Vec<RawFeature>) -> Vec<(LayerType, Vec<RawFeature>)> {
    let mut groups: Vec<(LayerType, Vec<RawFeature>)> = Vec::new();
    for feature in raw {
        match groups.iter_mut().find(|(t, _)| *t == feature.layer_type) {
            Some((_, features)) => features.push(feature),
            None => groups.push((feature.layer_type, vec![feature])),
        }
    }
    groups
}

/// Layer restriction computed for one map
#[derive(Debug, Clone, PartialEq, Eq)]
enum LayerTargets {
    /// Query every layer
    All,
    /// Style not loaded; requested ids passed through unchecked
    PassThrough(Vec<String>),
    /// Layers of the loaded style matching the predicate
    Matched(Vec<String>),
    /// Loaded style has no matching layer
    NoMatch,
}

fn layer_targets(map: &RegisteredMap, layer_match: Option<&LayerMatch>) -> LayerTargets {
    let Some(layer_match) = layer_match else {
        return LayerTargets::All;
    };

    let style = map.adapter().style_layers();
    if style.is_empty() {
        let requested = layer_match
            .id
            .as_ref()
            .map(|m| m.values.clone())
            .unwrap_or_default();
        debug!(map = %map.id, ?requested, "style not loaded, passing layer ids through");
        return LayerTargets::PassThrough(requested);
    }

    let matched: Vec<String> = style
        .iter()
        .filter(|layer| layer_match.matches(&layer.id, layer.layer_type.as_str()))
        .map(|layer| layer.id.clone())
        .collect();
    if matched.is_empty() {
        LayerTargets::NoMatch
    } else {
        LayerTargets::Matched(matched)
    }
}

/// Resolves selectors against a registry
#[derive(Debug, Clone, Copy)]
pub struct QueryResolver<'a> {
    registry: &'a MapRegistry,
}

impl<'a> QueryResolver<'a> {
    /// Create a resolver over a registry
    #[must_use]
    pub const fn new(registry: &'a MapRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a selector over the whole canvas of every target map
    ///
    /// # Errors
    ///
    /// Returns `NoMatchingLayer` when a layer predicate matched no layer of
    /// any loaded style among the target maps.
    pub fn resolve(&self, selector: &Selector) -> MapGrabResult<Vec<ResultFeature>> {
        self.resolve_within(selector, None)
    }

    /// Resolve a selector restricted to a canvas geometry
    ///
    /// # Errors
    ///
    /// See [`QueryResolver::resolve`].
    pub fn resolve_within(
        &self,
        selector: &Selector,
        geometry: Option<QueryGeometry>,
    ) -> MapGrabResult<Vec<ResultFeature>> {
        let layer_match = selector.layer_predicate();
        let mut checked: Vec<String> = Vec::new();
        let mut any_match = false;
        let mut features = Vec::new();

        for map in self.registry.resolve(selector.map_match.as_ref()) {
            let options = match layer_targets(map, layer_match) {
                LayerTargets::All => QueryOptions::default(),
                LayerTargets::PassThrough(ids) => QueryOptions::default().with_layers(ids),
                LayerTargets::Matched(ids) => {
                    checked.push(map.id.clone());
                    any_match = true;
                    QueryOptions::default().with_layers(ids)
                }
                LayerTargets::NoMatch => {
                    checked.push(map.id.clone());
                    continue;
                }
            };

            let request = QueryRequest {
                geometry,
                options: options.with_filter(selector.filter.clone()),
            };
            match MapQuery::query_map(&map.id, map.adapter(), &request) {
                Ok(resolved) => {
                    debug!(map = %map.id, count = resolved.len(), "map resolved");
                    features.extend(resolved);
                }
                Err(err) => warn!(map = %map.id, error = %err, "map skipped"),
            }
        }

        if let Some(layer_match) = layer_match {
            if !checked.is_empty() && !any_match {
                return Err(MapGrabError::NoMatchingLayer {
                    map_ids: checked,
                    requested: layer_match.to_string(),
                });
            }
        }
        Ok(features)
    }
}
