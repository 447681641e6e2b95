//! Line layer resolution.

use super::{DisplayRecord, FragmentCoalescer, LayerResolver, ResolveContext};
use crate::engine::{LayerType, PaintEvaluator, PaintProperty, RawFeature};
use crate::feature::ResultFeature;
use crate::geometry::{offset_polyline, translate_points, Point};
use crate::rect::{Padding, Rect};
use crate::result::MapGrabResult;

/// Resolves `line` layers.
///
/// Each clipped part is projected, translated and offset on its own; the
/// rect is the envelope of every part grown by half the stroke width.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineResolver;

/// Full stroke width of a line feature in pixels
pub(crate) fn stroke_width(paint: &dyn PaintEvaluator, feature: &RawFeature) -> f64 {
    let width = paint.evaluate(PaintProperty::LineWidth, feature);
    let gap = paint.evaluate(PaintProperty::LineGapWidth, feature);
    let blur = paint.evaluate(PaintProperty::LineBlur, feature);
    let stroke = if gap > 0.0 { gap + 2.0 * width } else { width };
    stroke + blur
}

impl LayerResolver for LineResolver {
    fn layer_type(&self) -> LayerType {
        LayerType::Line
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        features: &[RawFeature],
    ) -> MapGrabResult<Vec<ResultFeature>> {
        let finder = ctx.finder();
        let mut coalescer = FragmentCoalescer::default();

        for feature in features {
            let paint = ctx.paint(&feature.layer_id)?;
            let translate = paint.translate(
                PaintProperty::LineTranslate,
                PaintProperty::LineTranslateAnchor,
            );
            let rotation = translate.rotation(ctx.transform.bearing);
            let offset = paint.evaluate(PaintProperty::LineOffset, feature);

            let vertices: Vec<Point> = ctx
                .world_copy(&feature.geometry)
                .clip(&ctx.bounds)
                .parts()
                .iter()
                .flat_map(|part| {
                    let projected =
                        translate_points(&ctx.project_all(part), translate.offset, rotation);
                    offset_polyline(&projected, offset)
                })
                .collect();

            let Some(envelope) = Rect::from_points(&vertices) else {
                continue;
            };

            let display = DisplayRecord {
                rect: envelope.apply_padding(Padding::Uniform(stroke_width(paint, feature) / 2.0)),
                interaction_points: finder.find(feature, &vertices).into_iter().collect(),
                is_visible: paint.evaluate(PaintProperty::LineOpacity, feature) > 0.0,
            };
            coalescer.push(ctx.to_result(feature, display));
        }

        Ok(coalescer.finish())
    }
}
