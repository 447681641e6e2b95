//! Resolved features and feature merging.
//!
//! - [`ResultFeature`]: one resolved feature in page pixels
//! - [`MergedFeature`]: several features reported as one logical element
//! - [`FeatureMerger`]: rect union, interaction point concatenation and
//!   caller-driven grouping

use crate::engine::{FeatureId, Properties};
use crate::geometry::Point;
use crate::rect::Rect;
use serde::{Deserialize, Serialize};

/// A feature resolved to page geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFeature {
    /// Feature id, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<FeatureId>,
    /// Source id
    pub source_id: String,
    /// Style layer id
    pub layer_id: String,
    /// Feature properties
    pub properties: Properties,
    /// Map the feature was found on
    pub map_id: String,
    /// Whether the layer paints the feature with non-zero opacity
    pub is_visible: bool,
    /// Page pixels a pointer event would hit the feature at
    pub interaction_points: Vec<Point>,
    /// Page bounding rectangle
    pub rect: Rect,
}

impl ResultFeature {
    /// Property as text, numbers and booleans included
    #[must_use]
    pub fn property_text(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Several features combined into one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedFeature {
    /// Underlying features, flat
    pub features: Vec<ResultFeature>,
    /// Union of the feature rects
    pub rect: Rect,
    /// Concatenated interaction points
    pub interaction_points: Vec<Point>,
}

/// Either a single or a merged feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocatedFeature {
    /// Several features
    Merged(MergedFeature),
    /// One feature
    Single(ResultFeature),
}

impl LocatedFeature {
    /// Bounding rectangle
    #[must_use]
    pub const fn rect(&self) -> &Rect {
        match self {
            Self::Single(f) => &f.rect,
            Self::Merged(m) => &m.rect,
        }
    }

    /// Interaction points
    #[must_use]
    pub fn interaction_points(&self) -> &[Point] {
        match self {
            Self::Single(f) => &f.interaction_points,
            Self::Merged(m) => &m.interaction_points,
        }
    }

    /// Underlying features
    #[must_use]
    pub fn features(&self) -> &[ResultFeature] {
        match self {
            Self::Single(f) => std::slice::from_ref(f),
            Self::Merged(m) => &m.features,
        }
    }

    /// Check if any underlying feature is visible
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.features().iter().any(|f| f.is_visible)
    }
}

impl From<ResultFeature> for LocatedFeature {
    fn from(feature: ResultFeature) -> Self {
        Self::Single(feature)
    }
}

/// Combines features into merged elements
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureMerger;

impl FeatureMerger {
    /// Merge two elements.
    ///
    /// Merging an element with itself returns it unchanged. Otherwise rects
    /// are unioned, interaction points concatenated and the underlying
    /// features flattened.
    #[must_use]
    pub fn merge(a: &LocatedFeature, b: &LocatedFeature) -> LocatedFeature {
        if std::ptr::eq(a, b) {
            return a.clone();
        }

        let features: Vec<ResultFeature> = a.features().iter().chain(b.features()).cloned().collect();
        let interaction_points: Vec<Point> = a
            .interaction_points()
            .iter()
            .chain(b.interaction_points())
            .copied()
            .collect();

        LocatedFeature::Merged(MergedFeature {
            features,
            rect: a.rect().merge(b.rect()),
            interaction_points,
        })
    }

    /// Fold every element into one; `None` for an empty input
    #[must_use]
    pub fn merge_all(items: Vec<LocatedFeature>) -> Option<LocatedFeature> {
        let mut iter = items.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |acc, item| Self::merge(&acc, &item)))
    }

    /// Fold elements sharing a key.
    ///
    /// The key is computed from each element's first feature. Groups keep
    /// the order in which their key was first seen; elements without a key
    /// form one group of their own.
    #[must_use]
    pub fn merge_by_key<F>(items: Vec<LocatedFeature>, key: F) -> Vec<LocatedFeature>
    where
        F: Fn(&ResultFeature) -> Option<String>,
    {
        let mut groups: Vec<(Option<String>, LocatedFeature)> = Vec::new();
        for item in items {
            let item_key = item.features().first().and_then(&key);
            match groups.iter_mut().find(|(k, _)| *k == item_key) {
                Some((_, acc)) => *acc = Self::merge(acc, &item),
                None => groups.push((item_key, item)),
            }
        }
        groups.into_iter().map(|(_, item)| item).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn feature(id: i64, rect: Rect, kind: &str) -> ResultFeature {
        let mut properties = Properties::new();
        properties.insert("kind".to_string(), json!(kind));
        ResultFeature {
            feature_id: Some(FeatureId::Int(id)),
            source_id: "src".to_string(),
            layer_id: "layer".to_string(),
            properties,
            map_id: "map".to_string(),
            is_visible: true,
            interaction_points: vec![rect.center()],
            rect,
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn test_merge_unions_rect_and_concatenates_points() {
            let a: LocatedFeature = feature(1, Rect::new(0.0, 0.0, 10.0, 10.0), "a").into();
            let b: LocatedFeature = feature(2, Rect::new(20.0, 5.0, 30.0, 15.0), "b").into();
            let merged = FeatureMerger::merge(&a, &b);
            assert_eq!(merged.rect(), &Rect::new(0.0, 0.0, 30.0, 15.0));
            assert_eq!(
                merged.interaction_points(),
                &[Point::new(5.0, 5.0), Point::new(25.0, 10.0)]
            );
            assert_eq!(merged.features().len(), 2);
        }

        #[test]
        fn test_merge_same_reference_short_circuits() {
            let a: LocatedFeature = feature(1, Rect::new(0.0, 0.0, 10.0, 10.0), "a").into();
            assert_eq!(FeatureMerger::merge(&a, &a), a);
        }

        #[test]
        fn test_merge_equal_values_still_merges() {
            let a: LocatedFeature = feature(1, Rect::new(0.0, 0.0, 10.0, 10.0), "a").into();
            let b = a.clone();
            assert_eq!(FeatureMerger::merge(&a, &b).features().len(), 2);
        }

        #[test]
        fn test_repeated_merges_stay_flat() {
            let items: Vec<LocatedFeature> = (0..5)
                .map(|i| feature(i, Rect::from_xywh(i as f64, 0.0, 1.0, 1.0), "x").into())
                .collect();
            let merged = FeatureMerger::merge_all(items).unwrap();
            assert_eq!(merged.features().len(), 5);
            assert_eq!(merged.rect(), &Rect::new(0.0, 0.0, 5.0, 1.0));
        }

        #[test]
        fn test_merge_all_empty() {
            assert!(FeatureMerger::merge_all(Vec::new()).is_none());
        }
    }

    mod grouping_tests {
        use super::*;

        #[test]
        fn test_merge_by_key_keeps_first_seen_order() {
            let items: Vec<LocatedFeature> = vec![
                feature(1, Rect::new(0.0, 0.0, 1.0, 1.0), "b").into(),
                feature(2, Rect::new(0.0, 0.0, 1.0, 1.0), "a").into(),
                feature(3, Rect::new(5.0, 5.0, 6.0, 6.0), "b").into(),
            ];
            let groups = FeatureMerger::merge_by_key(items, |f| f.property_text("kind"));
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].features().len(), 2);
            assert_eq!(groups[0].rect(), &Rect::new(0.0, 0.0, 6.0, 6.0));
            assert_eq!(groups[1].features()[0].feature_id, Some(FeatureId::Int(2)));
        }

        #[test]
        fn test_missing_key_groups_together() {
            let items: Vec<LocatedFeature> = vec![
                feature(1, Rect::new(0.0, 0.0, 1.0, 1.0), "a").into(),
                feature(2, Rect::new(0.0, 0.0, 1.0, 1.0), "b").into(),
            ];
            let groups = FeatureMerger::merge_by_key(items, |f| f.property_text("missing"));
            assert_eq!(groups.len(), 1);
        }

        #[test]
        fn test_property_text() {
            let mut f = feature(1, Rect::default(), "a");
            f.properties.insert("n".to_string(), json!(4));
            assert_eq!(f.property_text("n").as_deref(), Some("4"));
            assert_eq!(f.property_text("kind").as_deref(), Some("a"));
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_result_feature_json_shape() {
            let json = serde_json::to_value(feature(9, Rect::new(0.0, 0.0, 2.0, 2.0), "a")).unwrap();
            assert_eq!(json["featureId"], 9);
            assert_eq!(json["isVisible"], true);
            assert_eq!(json["interactionPoints"][0]["x"], 1.0);
            assert_eq!(json["rect"]["width"], 2.0);
        }
    }
}
