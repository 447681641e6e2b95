//! Fill layer resolution.

use super::{DisplayRecord, FragmentCoalescer, LayerResolver, ResolveContext};
use crate::engine::{LayerType, PaintProperty, RawFeature};
use crate::feature::ResultFeature;
use crate::geometry::translate_points;
use crate::rect::Rect;
use crate::result::MapGrabResult;

/// Resolves `fill` layers.
///
/// Polygons are clipped to the visible bounds before projection, so a
/// feature that spills far off-screen yields an envelope of what is actually
/// drawn. Tile fragments sharing an id come back as one feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillResolver;

impl LayerResolver for FillResolver {
    fn layer_type(&self) -> LayerType {
        LayerType::Fill
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        features: &[RawFeature],
    ) -> MapGrabResult<Vec<ResultFeature>> {
        let canvas = ctx.canvas();
        let finder = ctx.finder();
        let mut coalescer = FragmentCoalescer::default();

        for feature in features {
            let paint = ctx.paint(&feature.layer_id)?;
            let translate = paint.translate(
                PaintProperty::FillTranslate,
                PaintProperty::FillTranslateAnchor,
            );

            let clipped = ctx.world_copy(&feature.geometry).clip(&ctx.bounds);
            let vertices = translate_points(
                &ctx.project_all(&clipped.coord_all()),
                translate.offset,
                translate.rotation(ctx.transform.bearing),
            );
            let Some(envelope) = Rect::from_points(&vertices) else {
                continue;
            };

            let display = DisplayRecord {
                rect: envelope.clamp_to(&canvas),
                interaction_points: finder.find(feature, &vertices).into_iter().collect(),
                is_visible: paint.evaluate(PaintProperty::FillOpacity, feature) > 0.0,
            };
            coalescer.push(ctx.to_result(feature, display));
        }

        Ok(coalescer.finish())
    }
}
