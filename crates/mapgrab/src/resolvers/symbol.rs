//! Symbol layer resolution.
//!
//! Labels and icons are resolved from where the placement pass put them, not
//! from their geometry. Each rendered symbol instance yields:
//!
//! - one feature covering its collision boxes, or
//! - one feature per cluster of collision circles, for labels placed along a
//!   line and drawn several times
//!
//! The traversal runs once per map, however many raw symbol features the
//! query returned.

use super::{DisplayRecord, LayerResolver, ResolveContext};
use crate::engine::{EngineKind, LayerType, PaintEvaluator, PaintProperty, RawFeature};
use crate::feature::ResultFeature;
use crate::placement::PlacedCircle;
use crate::rect::{Offset, Rect};
use crate::result::{MapGrabError, MapGrabResult};

/// Largest gap (pixels) between two circles of one cluster
pub const CLUSTER_GAP: f64 = 5.0;

/// Resolves `symbol` layers
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolResolver;

impl LayerResolver for SymbolResolver {
    fn layer_type(&self) -> LayerType {
        LayerType::Symbol
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        features: &[RawFeature],
    ) -> MapGrabResult<Vec<ResultFeature>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let placement = ctx
            .adapter
            .placement()
            .ok_or_else(|| MapGrabError::engine(ctx.map_id, "symbols rendered without placement"))?;

        let area = ctx.geometry.map_or_else(|| ctx.canvas(), |g| g.rect());
        let layers = placement.query_rendered_symbols(&area, ctx.options, |feature, filter| {
            ctx.adapter.feature_matches(feature, filter)
        });

        let finder = ctx.finder();
        let mut resolved = Vec::new();
        for hit in layers.iter().flat_map(|layer| &layer.symbols) {
            let paint = ctx.paint(&hit.feature.layer_id)?;
            let is_visible = paint.evaluate(PaintProperty::IconOpacity, &hit.feature) > 0.0
                || paint.evaluate(PaintProperty::TextOpacity, &hit.feature) > 0.0;

            let boxes = placement.grid.boxes_for(hit.key);
            let placed = if boxes.is_empty() {
                circle_clusters(&placement.grid.circles_for(hit.key), &ctx.canvas())
                    .into_iter()
                    .map(|cluster| (cluster_rect(&cluster), cluster[0].center))
                    .collect()
            } else {
                let rect = box_rect(ctx.adapter.engine(), paint, &boxes);
                vec![(rect, rect.center().round())]
            };

            for (rect, candidate) in placed {
                let display = DisplayRecord {
                    rect,
                    interaction_points: finder.find(&hit.feature, &[candidate]).into_iter().collect(),
                    is_visible,
                };
                resolved.push(ctx.to_result(&hit.feature, display));
            }
        }

        Ok(resolved)
    }
}

/// Union of a symbol's collision boxes.
///
/// MapBox stores boxes without the paint translate. With several boxes the
/// first one belongs to the text and the rest to the icon; a lone box is
/// taken as the icon.
fn box_rect(engine: EngineKind, paint: &dyn PaintEvaluator, boxes: &[Rect]) -> Rect {
    boxes
        .iter()
        .enumerate()
        .map(|(index, rect)| {
            if engine != EngineKind::MapBox {
                return *rect;
            }
            let property = if boxes.len() > 1 && index == 0 {
                PaintProperty::TextTranslate
            } else {
                PaintProperty::IconTranslate
            };
            let [x, y] = paint.vector(property).unwrap_or([0.0, 0.0]);
            rect.apply_offset(Offset::Xy { x, y })
        })
        .reduce(|a, b| a.merge(&b))
        .unwrap_or_default()
}

/// Split a symbol's circles into visually separate placements.
///
/// Circles entirely off the canvas are skipped. A gap wider than
/// [`CLUSTER_GAP`] between consecutive circles closes the current cluster.
fn circle_clusters(circles: &[PlacedCircle], canvas: &Rect) -> Vec<Vec<PlacedCircle>> {
    let mut clusters: Vec<Vec<PlacedCircle>> = Vec::new();
    let mut current: Vec<PlacedCircle> = Vec::new();

    for (i, circle) in circles.iter().enumerate() {
        let (c, r) = (circle.center, circle.radius);
        if c.x + r >= canvas.x()
            && c.x - r <= canvas.right()
            && c.y + r >= canvas.y()
            && c.y - r <= canvas.bottom()
        {
            current.push(*circle);
        }

        if let Some(next) = circles.get(i + 1) {
            let gap = c.distance(next.center) - r - next.radius;
            if !current.is_empty() && gap > CLUSTER_GAP {
                clusters.push(std::mem::take(&mut current));
            }
        }
    }

    if !current.is_empty() {
        clusters.push(current);
    }
    clusters
}

fn cluster_rect(cluster: &[PlacedCircle]) -> Rect {
    cluster
        .iter()
        .map(|c| Rect::around(c.center, c.radius))
        .reduce(|a, b| a.merge(&b))
        .unwrap_or_default()
}
