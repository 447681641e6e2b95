//! Symbol placement index.
//!
//! Labels and icons are not drawn where their geometry projects: the engine's
//! placement pass moves, drops and splits them to avoid collisions, and records
//! the outcome in a collision grid. This module models that grid plus the
//! per-bucket data retained for queries, and replays the engine's
//! "query rendered symbols" traversal over it.
//!
//! Grid coordinates carry a fixed padding of [`GRID_PADDING`] pixels on both
//! axes; every accessor returns canvas pixels.

use crate::engine::{QueryOptions, RawFeature};
use crate::geometry::Point;
use crate::rect::Rect;
use crate::selector::FilterExpression;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Padding of the collision grid around the canvas, in pixels
pub const GRID_PADDING: f64 = 100.0;

/// Identifies one placed symbol instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolKey {
    /// Bucket the symbol belongs to
    pub bucket_instance_id: u32,
    /// Index of the feature inside the bucket
    pub feature_index: u32,
}

impl SymbolKey {
    /// Create a key
    #[must_use]
    pub const fn new(bucket_instance_id: u32, feature_index: u32) -> Self {
        Self {
            bucket_instance_id,
            feature_index,
        }
    }
}

/// Collision box in padded grid space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    /// Owning symbol
    pub key: SymbolKey,
    /// `[x1, y1, x2, y2]`
    pub bounds: [f64; 4],
}

/// Collision circle in padded grid space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionCircle {
    /// Owning symbol
    pub key: SymbolKey,
    /// Centre x
    pub x: f64,
    /// Centre y
    pub y: f64,
    /// Radius
    pub radius: f64,
}

/// A collision circle converted to canvas pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedCircle {
    /// Centre, rounded to whole pixels
    pub center: Point,
    /// Radius
    pub radius: f64,
}

/// Collision grid filled by the placement pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionGrid {
    /// Boxes in insertion order
    #[serde(default)]
    pub boxes: Vec<CollisionBox>,
    /// Circles in insertion order
    #[serde(default)]
    pub circles: Vec<CollisionCircle>,
}

impl CollisionGrid {
    /// Insert a box given in canvas pixels
    pub fn insert_box(&mut self, key: SymbolKey, rect: Rect) {
        self.boxes.push(CollisionBox {
            key,
            bounds: [
                rect.x() + GRID_PADDING,
                rect.y() + GRID_PADDING,
                rect.right() + GRID_PADDING,
                rect.bottom() + GRID_PADDING,
            ],
        });
    }

    /// Insert a circle given in canvas pixels
    pub fn insert_circle(&mut self, key: SymbolKey, center: Point, radius: f64) {
        self.circles.push(CollisionCircle {
            key,
            x: center.x + GRID_PADDING,
            y: center.y + GRID_PADDING,
            radius,
        });
    }

    /// Boxes of a symbol in canvas pixels, rounded
    #[must_use]
    pub fn boxes_for(&self, key: SymbolKey) -> Vec<Rect> {
        self.boxes
            .iter()
            .filter(|b| b.key == key)
            .map(|b| {
                let [x1, y1, x2, y2] = b.bounds.map(|v| (v - GRID_PADDING).round());
                Rect::new(x1, y1, x2, y2)
            })
            .collect()
    }

    /// Circles of a symbol in canvas pixels, in placement order
    #[must_use]
    pub fn circles_for(&self, key: SymbolKey) -> Vec<PlacedCircle> {
        self.circles
            .iter()
            .filter(|c| c.key == key)
            .map(|c| PlacedCircle {
                center: Point::new(
                    (c.x - GRID_PADDING).round(),
                    (c.y - GRID_PADDING).round(),
                ),
                radius: c.radius,
            })
            .collect()
    }

    /// Symbols whose boxes or circles touch a canvas rectangle, grouped by
    /// bucket in first-seen order
    #[must_use]
    pub fn query(&self, area: &Rect) -> Vec<(u32, Vec<u32>)> {
        let padded = Rect::new(
            area.x() + GRID_PADDING,
            area.y() + GRID_PADDING,
            area.right() + GRID_PADDING,
            area.bottom() + GRID_PADDING,
        );

        let box_hits = self.boxes.iter().filter_map(|b| {
            let [x1, y1, x2, y2] = b.bounds;
            padded
                .intersects(&Rect::new(x1, y1, x2, y2))
                .then_some(b.key)
        });
        let circle_hits = self.circles.iter().filter_map(|c| {
            let nearest = Point::new(
                c.x.clamp(padded.x(), padded.right()),
                c.y.clamp(padded.y(), padded.bottom()),
            );
            (nearest.distance(Point::new(c.x, c.y)) <= c.radius).then_some(c.key)
        });

        let mut buckets: Vec<(u32, Vec<u32>)> = Vec::new();
        for key in box_hits.chain(circle_hits) {
            let index = match buckets.iter().position(|(id, _)| *id == key.bucket_instance_id) {
                Some(i) => i,
                None => {
                    buckets.push((key.bucket_instance_id, Vec::new()));
                    buckets.len() - 1
                }
            };
            let slot = &mut buckets[index].1;
            if !slot.contains(&key.feature_index) {
                slot.push(key.feature_index);
            }
        }
        buckets
    }
}

/// Canonical tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CanonicalTileId {
    /// Zoom
    pub z: u8,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

/// Tile id including overscaling and world wrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverscaledTileId {
    /// Overscaled zoom
    pub overscaled_z: u8,
    /// World copy index
    pub wrap: i32,
    /// Canonical tile
    pub canonical: CanonicalTileId,
}

impl OverscaledTileId {
    /// Engine ordering key: overscaled z, then row, wrap and column
    #[must_use]
    pub const fn sort_key(&self) -> (u8, u32, i32, u32) {
        (self.overscaled_z, self.canonical.y, self.wrap, self.canonical.x)
    }
}

/// A symbol feature retained by a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetainedSymbol {
    /// Index inside the bucket
    pub feature_index: u32,
    /// The feature itself
    pub feature: RawFeature,
}

/// Data a symbol bucket keeps for rendered-symbol queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetainedQueryData {
    /// Bucket id
    pub bucket_instance_id: u32,
    /// Tile the bucket belongs to
    pub tile_id: OverscaledTileId,
    /// Feature draw order after the bucket was re-sorted, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_sort_order: Option<Vec<u32>>,
    /// Features of the bucket
    #[serde(default)]
    pub features: Vec<RetainedSymbol>,
}

impl RetainedQueryData {
    fn top_down_rank(&self, feature_index: u32) -> i64 {
        match &self.feature_sort_order {
            Some(order) => order
                .iter()
                .position(|i| *i == feature_index)
                .map_or(-1, |p| p as i64),
            None => i64::from(feature_index),
        }
    }
}

/// A rendered symbol found by the traversal
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolHit {
    /// Placement key
    pub key: SymbolKey,
    /// Tile of the bucket
    pub tile_id: OverscaledTileId,
    /// Retained feature
    pub feature: RawFeature,
}

/// Rendered symbols of one layer, top-most first within each bucket
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSymbols {
    /// Style layer id
    pub layer_id: String,
    /// Matching symbols
    pub symbols: Vec<SymbolHit>,
}

/// Collision grid plus retained bucket data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementIndex {
    /// Collision grid
    #[serde(default)]
    pub grid: CollisionGrid,
    /// Retained data per bucket
    #[serde(default)]
    pub retained: Vec<RetainedQueryData>,
}

impl PlacementIndex {
    /// Find the symbols rendered inside `area`.
    ///
    /// Buckets are visited in tile order; within a bucket, symbols passing the
    /// layer restriction and the filter are grouped by layer and sorted
    /// top-down. Layers appear in first-seen order.
    pub fn query_rendered_symbols<F>(
        &self,
        area: &Rect,
        options: &QueryOptions,
        matches: F,
    ) -> Vec<LayerSymbols>
    where
        F: Fn(&RawFeature, &FilterExpression) -> bool,
    {
        let mut buckets: Vec<(&RetainedQueryData, Vec<u32>)> = self
            .grid
            .query(area)
            .into_iter()
            .filter_map(|(bucket_id, indexes)| {
                self.retained
                    .iter()
                    .find(|data| data.bucket_instance_id == bucket_id)
                    .map(|data| (data, indexes))
            })
            .collect();
        buckets.sort_by_key(|(data, _)| data.tile_id.sort_key());

        let mut result: Vec<LayerSymbols> = Vec::new();
        for (data, indexes) in buckets {
            let mut per_layer: Vec<(String, Vec<&RetainedSymbol>)> = Vec::new();
            for index in indexes {
                let Some(symbol) = data.features.iter().find(|s| s.feature_index == index) else {
                    continue;
                };
                let feature = &symbol.feature;
                if !options.allows_layer(&feature.layer_id) {
                    continue;
                }
                if let Some(filter) = &options.filter {
                    if !matches(feature, filter) {
                        continue;
                    }
                }
                match per_layer.iter_mut().find(|(id, _)| *id == feature.layer_id) {
                    Some((_, symbols)) => symbols.push(symbol),
                    None => per_layer.push((feature.layer_id.clone(), vec![symbol])),
                }
            }

            for (layer_id, mut symbols) in per_layer {
                symbols.sort_by_key(|s| Reverse(data.top_down_rank(s.feature_index)));
                let hits = symbols.into_iter().map(|s| SymbolHit {
                    key: SymbolKey::new(data.bucket_instance_id, s.feature_index),
                    tile_id: data.tile_id,
                    feature: s.feature.clone(),
                });
                match result.iter_mut().find(|l| l.layer_id == layer_id) {
                    Some(layer) => layer.symbols.extend(hits),
                    None => result.push(LayerSymbols {
                        layer_id,
                        symbols: hits.collect(),
                    }),
                }
            }
        }
        result
    }
}
