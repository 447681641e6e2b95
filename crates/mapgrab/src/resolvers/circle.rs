//! Circle layer resolution.

use super::{DisplayRecord, LayerResolver, ResolveContext};
use crate::engine::{LayerType, PaintProperty, RawFeature};
use crate::feature::ResultFeature;
use crate::geometry::translate_points;
use crate::rect::Rect;
use crate::result::MapGrabResult;

/// Resolves `circle` layers
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleResolver;

impl LayerResolver for CircleResolver {
    fn layer_type(&self) -> LayerType {
        LayerType::Circle
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        features: &[RawFeature],
    ) -> MapGrabResult<Vec<ResultFeature>> {
        let canvas = ctx.canvas();
        let finder = ctx.finder();
        let mut resolved = Vec::with_capacity(features.len());

        for feature in features {
            let paint = ctx.paint(&feature.layer_id)?;
            let translate = paint.translate(
                PaintProperty::CircleTranslate,
                PaintProperty::CircleTranslateAnchor,
            );

            let centers = translate_points(
                &ctx.project_all(&ctx.world_copy(&feature.geometry).coord_all()),
                translate.offset,
                translate.rotation(ctx.transform.bearing),
            );
            let size = paint.evaluate(PaintProperty::CircleRadius, feature)
                + paint.evaluate(PaintProperty::CircleStrokeWidth, feature);

            let Some(rect) = centers
                .iter()
                .map(|c| Rect::around(*c, size))
                .reduce(|a, b| a.merge(&b))
            else {
                continue;
            };

            // culled when entirely off the canvas
            if rect.right() <= 0.0
                || rect.bottom() <= 0.0
                || rect.x() >= canvas.right()
                || rect.y() >= canvas.bottom()
            {
                continue;
            }

            let display = DisplayRecord {
                rect,
                interaction_points: finder.find(feature, &centers).into_iter().collect(),
                is_visible: paint.evaluate(PaintProperty::CircleOpacity, feature) > 0.0,
            };
            resolved.push(ctx.to_result(feature, display));
        }

        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{MapAdapter, QueryOptions};
    use crate::scene::{Camera, SceneFeature, SceneLayer, SceneMap};
    use serde_json::json;

    fn resolve(scene: &SceneMap) -> Vec<ResultFeature> {
        let options = QueryOptions::default();
        let raw = scene.query_rendered_features(None, &options).unwrap();
        let ctx = ResolveContext::new("m", scene, None, &options);
        CircleResolver.resolve(&ctx, &raw).unwrap()
    }

    fn layer() -> SceneLayer {
        SceneLayer::new("dots", LayerType::Circle, "points")
            .with_paint("circle-radius", json!(6))
            .with_paint("circle-stroke-width", json!(2))
    }

    #[test]
    fn test_rect_is_radius_plus_stroke() {
        let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
            .with_layer(layer())
            .with_feature("points", SceneFeature::point(1, [0.0, 0.0]));
        let result = resolve(&scene);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].rect, Rect::new(192.0, 142.0, 208.0, 158.0));
        assert_eq!(
            result[0].interaction_points,
            vec![crate::geometry::Point::new(200.0, 150.0)]
        );
        assert!(result[0].is_visible);
    }

    #[test]
    fn test_translate_moves_rect() {
        let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
            .with_layer(layer().with_paint("circle-translate", json!([10, -5])))
            .with_feature("points", SceneFeature::point(1, [0.0, 0.0]));
        let result = resolve(&scene);
        assert_eq!(result[0].rect, Rect::new(202.0, 137.0, 218.0, 153.0));
    }

    #[test]
    fn test_viewport_translate_rotates_with_bearing() {
        let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0).with_bearing(90.0))
            .with_layer(
                layer()
                    .with_paint("circle-translate", json!([10, 0]))
                    .with_paint("circle-translate-anchor", json!("viewport")),
            )
            .with_feature("points", SceneFeature::point(1, [0.0, 0.0]));
        let result = resolve(&scene);
        // [10, 0] rotated by 90 degrees points down
        assert_eq!(result[0].rect, Rect::new(192.0, 152.0, 208.0, 168.0));
    }

    #[test]
    fn test_zero_opacity_is_invisible() {
        let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
            .with_layer(layer().with_paint(
                "circle-opacity",
                json!(["case", ["==", ["get", "hidden"], true], 0, 1]),
            ))
            .with_feature(
                "points",
                SceneFeature::point(1, [0.0, 0.0]).with_property("hidden", json!(true)),
            )
            .with_feature("points", SceneFeature::point(2, [1.0, 1.0]));
        let result = resolve(&scene);
        assert_eq!(result.len(), 2);
        assert!(!result[0].is_visible);
        assert!(result[1].is_visible);
    }

    #[test]
    fn test_missing_paint_is_engine_error() {
        let scene = SceneMap::new(Camera::new(0.0, 0.0, 3.0, 400.0, 300.0))
            .with_layer(layer())
            .with_feature("points", SceneFeature::point(1, [0.0, 0.0]));
        let options = QueryOptions::default();
        let mut raw = scene.query_rendered_features(None, &options).unwrap();
        raw[0].layer_id = "missing".to_string();
        let ctx = ResolveContext::new("m", &scene, None, &options);
        assert!(matches!(
            CircleResolver.resolve(&ctx, &raw),
            Err(crate::result::MapGrabError::Engine { .. })
        ));
    }
}
