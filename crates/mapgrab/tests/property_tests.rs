//! Property tests for selector handling and screen geometry.
//!
//! Run with: `cargo test -p mapgrab --test property_tests`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mapgrab::prelude::*;
use mapgrab::selector::PropertyMatch;
use proptest::prelude::*;

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,11}"
}

fn rect() -> impl Strategy<Value = Rect> {
    (-500.0..500.0f64, -500.0..500.0f64, -500.0..500.0f64, -500.0..500.0f64)
        .prop_map(|(a, b, c, d)| Rect::new(a, b, c, d))
}

fn selector() -> impl Strategy<Value = Selector> {
    (
        proptest::option::of(prop::collection::vec(identifier(), 1..4)),
        proptest::option::of(identifier()),
        proptest::option::of(prop_oneof![
            Just("fill"),
            Just("line"),
            Just("circle"),
            Just("symbol")
        ]),
        proptest::option::of(0i64..1000),
    )
        .prop_filter("selector needs a part", |(m, l, t, f)| {
            m.is_some() || l.is_some() || t.is_some() || f.is_some()
        })
        .prop_map(|(maps, layer, layer_type, id)| {
            let mut selector = Selector::default();
            if let Some(maps) = maps {
                selector = selector.with_map(PropertyMatch::exact(maps));
            }
            if let Some(layer) = layer {
                selector = selector.with_layer_id(PropertyMatch::contains([layer]));
            }
            if let Some(layer_type) = layer_type {
                selector = selector.with_layer_type(PropertyMatch::exact([layer_type]));
            }
            if let Some(id) = id {
                selector = selector.with_filter(FilterExpression::id_equals(id.into()));
            }
            selector
        })
}

proptest! {
    #[test]
    fn prop_selector_text_parses_back(selector in selector()) {
        let text = selector.to_string();
        prop_assert_eq!(Selector::parse(&text).unwrap(), selector);
    }

    #[test]
    fn prop_garbage_never_panics(text in "\\PC{0,40}") {
        let _ = Selector::parse(&text);
    }

    #[test]
    fn prop_exact_match_accepts_listed_values(values in prop::collection::vec(identifier(), 1..5)) {
        let m = PropertyMatch::exact(values.clone());
        for value in &values {
            prop_assert!(m.matches(value));
        }
    }

    #[test]
    fn prop_rect_corners_ordered(r in rect()) {
        prop_assert!(r.x() <= r.right());
        prop_assert!(r.y() <= r.bottom());
        prop_assert!(r.width() >= 0.0 && r.height() >= 0.0);
    }

    #[test]
    fn prop_merge_contains_both(a in rect(), b in rect()) {
        let merged = a.merge(&b);
        prop_assert!(merged.contains_rect(&a));
        prop_assert!(merged.contains_rect(&b));
    }

    #[test]
    fn prop_merge_is_a_union(a in rect(), b in rect(), c in rect()) {
        prop_assert_eq!(a.merge(&b), b.merge(&a));
        prop_assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
        prop_assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn prop_merged_elements_cover_inputs(rects in prop::collection::vec(rect(), 1..6)) {
        let items: Vec<LocatedFeature> = rects
            .iter()
            .map(|r| {
                LocatedFeature::Single(ResultFeature {
                    feature_id: None,
                    source_id: "s".to_string(),
                    layer_id: "l".to_string(),
                    properties: serde_json::Map::new(),
                    map_id: "m".to_string(),
                    is_visible: true,
                    interaction_points: vec![r.center()],
                    rect: *r,
                })
            })
            .collect();
        let merged = FeatureMerger::merge_all(items).unwrap();
        prop_assert_eq!(merged.features().len(), rects.len());
        prop_assert_eq!(merged.interaction_points().len(), rects.len());
        for r in &rects {
            prop_assert!(merged.rect().contains_rect(r));
        }
    }

    #[test]
    fn prop_camera_round_trip(
        lng in -170.0..170.0f64,
        lat in -60.0..60.0f64,
        zoom in 4.0..18.0f64,
        bearing in -180.0..180.0f64,
    ) {
        let camera = Camera::new(lng, lat, zoom, 800.0, 600.0).with_bearing(bearing);
        let probe = Point::new(123.0, 456.0);
        let back = camera.project(camera.unproject(probe));
        prop_assert!((back.x - probe.x).abs() < 1e-3);
        prop_assert!((back.y - probe.y).abs() < 1e-3);
    }
}
