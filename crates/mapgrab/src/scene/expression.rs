//! Style expression evaluation.
//!
//! Covers the data expressions maps use in filters and data-driven paint
//! properties:
//!
//! - lookup: `get`, `has`, `id`, `properties`, `feature-state`,
//!   `geometry-type`, `literal`
//! - decisions: `==`, `!=`, `<`, `<=`, `>`, `>=`, `!`, `all`, `any`, `in`,
//!   `case`, `match`, `coalesce`
//! - conversion and arithmetic: `to-number`, `to-string`, `to-boolean`,
//!   `+`, `-`, `*`, `/`
//!
//! Filters may also use the legacy syntax (`["==", "class", "park"]`,
//! `["in", "$type", "Point"]`, `["!has", "name"]`); [`evaluate_filter`]
//! tells the two apart the way the engines do.

use crate::engine::RawFeature;
use crate::geometry::Geometry;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::trace;

/// Evaluate an expression against a feature.
///
/// Plain values evaluate to themselves, as do arrays not headed by an
/// operator name. Unknown operators evaluate to `null`.
#[must_use]
pub fn evaluate(expression: &Value, feature: &RawFeature) -> Value {
    let Value::Array(items) = expression else {
        return expression.clone();
    };
    let Some(op) = items.first().and_then(Value::as_str) else {
        return expression.clone();
    };
    let args = &items[1..];
    let arg = |i: usize| args.get(i).map_or(Value::Null, |a| evaluate(a, feature));

    match op {
        "literal" => args.first().cloned().unwrap_or(Value::Null),
        "get" => {
            let key = arg(0);
            let Some(key) = key.as_str() else {
                return Value::Null;
            };
            match args.get(1) {
                Some(object) => evaluate(object, feature)
                    .get(key)
                    .cloned()
                    .unwrap_or(Value::Null),
                None => feature.properties.get(key).cloned().unwrap_or(Value::Null),
            }
        }
        "has" => Value::Bool(
            arg(0)
                .as_str()
                .is_some_and(|key| feature.properties.contains_key(key)),
        ),
        "id" => feature.id.as_ref().map_or(Value::Null, |id| id.to_json()),
        "properties" => Value::Object(feature.properties.clone()),
        "feature-state" => arg(0)
            .as_str()
            .and_then(|key| feature.state.get(key))
            .cloned()
            .unwrap_or(Value::Null),
        "geometry-type" => Value::from(geometry_type(&feature.geometry)),
        "==" => Value::Bool(values_equal(&arg(0), &arg(1))),
        "!=" => Value::Bool(!values_equal(&arg(0), &arg(1))),
        "<" => Value::Bool(compare(&arg(0), &arg(1)) == Some(Ordering::Less)),
        "<=" => Value::Bool(matches!(
            compare(&arg(0), &arg(1)),
            Some(Ordering::Less | Ordering::Equal)
        )),
        ">" => Value::Bool(compare(&arg(0), &arg(1)) == Some(Ordering::Greater)),
        ">=" => Value::Bool(matches!(
            compare(&arg(0), &arg(1)),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        "!" => Value::Bool(!truthy(&arg(0))),
        "all" => Value::Bool(args.iter().all(|a| truthy(&evaluate(a, feature)))),
        "any" => Value::Bool(args.iter().any(|a| truthy(&evaluate(a, feature)))),
        "in" => {
            let needle = arg(0);
            Value::Bool(match arg(1) {
                Value::Array(haystack) => haystack.iter().any(|v| values_equal(&needle, v)),
                Value::String(haystack) => needle.as_str().is_some_and(|n| haystack.contains(n)),
                _ => false,
            })
        }
        "case" => {
            let mut pairs = args.chunks_exact(2);
            for pair in pairs.by_ref() {
                if truthy(&evaluate(&pair[0], feature)) {
                    return evaluate(&pair[1], feature);
                }
            }
            pairs
                .remainder()
                .first()
                .map_or(Value::Null, |fallback| evaluate(fallback, feature))
        }
        "match" => {
            let input = arg(0);
            let branches = args.get(1..).unwrap_or_default();
            let mut pairs = branches.chunks_exact(2);
            for pair in pairs.by_ref() {
                let hit = match &pair[0] {
                    Value::Array(labels) => labels.iter().any(|l| values_equal(&input, l)),
                    label => values_equal(&input, label),
                };
                if hit {
                    return evaluate(&pair[1], feature);
                }
            }
            pairs
                .remainder()
                .first()
                .map_or(Value::Null, |fallback| evaluate(fallback, feature))
        }
        "coalesce" => args
            .iter()
            .map(|a| evaluate(a, feature))
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null),
        "to-number" => args
            .iter()
            .find_map(|a| to_number(&evaluate(a, feature)))
            .map_or(Value::Null, Value::from),
        "to-string" => Value::String(to_text(&arg(0))),
        "to-boolean" => Value::Bool(match arg(0) {
            Value::Null => false,
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }),
        "+" | "*" => {
            let numbers: Option<Vec<f64>> = args.iter().map(|a| evaluate(a, feature).as_f64()).collect();
            numbers.map_or(Value::Null, |n| {
                Value::from(if op == "+" {
                    n.iter().sum::<f64>()
                } else {
                    n.iter().product::<f64>()
                })
            })
        }
        "-" => match (arg(0).as_f64(), args.get(1).map(|a| evaluate(a, feature).as_f64())) {
            (Some(a), None) => Value::from(-a),
            (Some(a), Some(Some(b))) => Value::from(a - b),
            _ => Value::Null,
        },
        "/" => match (arg(0).as_f64(), arg(1).as_f64()) {
            (Some(a), Some(b)) => Value::from(a / b),
            _ => Value::Null,
        },
        _ => {
            trace!(op, "unsupported expression operator");
            Value::Null
        }
    }
}

/// Evaluate a filter, legacy or expression syntax
#[must_use]
pub fn evaluate_filter(filter: &Value, feature: &RawFeature) -> bool {
    if is_expression(filter) {
        truthy(&evaluate(filter, feature))
    } else {
        legacy_filter(filter, feature)
    }
}

/// Check if a filter uses expression syntax rather than the legacy one
#[must_use]
pub fn is_expression(filter: &Value) -> bool {
    let Some(items) = filter.as_array() else {
        return true;
    };
    let Some(op) = items.first().and_then(Value::as_str) else {
        return false;
    };
    match op {
        "has" => items.len() < 2 || !items[1].is_string(),
        "in" => items.len() >= 3 && (!items[1].is_string() || items[2].is_array()),
        "!in" | "!has" | "none" => false,
        "==" | "!=" | ">" | ">=" | "<" | "<=" => {
            items.len() != 3 || !items[1].is_string() || items[2].is_array()
        }
        "any" | "all" => items[1..]
            .iter()
            .all(|child| child.is_boolean() || is_expression(child)),
        _ => true,
    }
}

fn legacy_filter(filter: &Value, feature: &RawFeature) -> bool {
    let Some(items) = filter.as_array() else {
        return filter.as_bool().unwrap_or(false);
    };
    let Some(op) = items.first().and_then(Value::as_str) else {
        return false;
    };
    let key = items.get(1).and_then(Value::as_str).unwrap_or_default();
    let operand = || items.get(2).unwrap_or(&Value::Null);

    match op {
        "==" => values_equal(&legacy_value(key, feature), operand()),
        "!=" => !values_equal(&legacy_value(key, feature), operand()),
        "<" | "<=" | ">" | ">=" => {
            let Some(ordering) = compare(&legacy_value(key, feature), operand()) else {
                return false;
            };
            match op {
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
        "in" | "!in" => {
            let value = legacy_value(key, feature);
            let found = items.get(2..).unwrap_or_default().iter().any(|v| values_equal(&value, v));
            found == (op == "in")
        }
        "has" | "!has" => {
            let present = match key {
                "$id" => feature.id.is_some(),
                "$type" => true,
                _ => feature.properties.contains_key(key),
            };
            present == (op == "has")
        }
        "all" => items[1..].iter().all(|f| evaluate_filter(f, feature)),
        "any" => items[1..].iter().any(|f| evaluate_filter(f, feature)),
        "none" => !items[1..].iter().any(|f| evaluate_filter(f, feature)),
        _ => false,
    }
}

fn legacy_value(key: &str, feature: &RawFeature) -> Value {
    match key {
        "$type" => Value::from(geometry_type(&feature.geometry)),
        "$id" => feature.id.as_ref().map_or(Value::Null, |id| id.to_json()),
        _ => feature.properties.get(key).cloned().unwrap_or(Value::Null),
    }
}

const fn geometry_type(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => "Point",
        Geometry::LineString(_) | Geometry::MultiLineString(_) => "LineString",
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => "Polygon",
    }
}

/// Only `true` is true
fn truthy(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{FeatureId, LayerType, Properties};
    use serde_json::json;

    fn feature() -> RawFeature {
        let mut properties = Properties::new();
        properties.insert("name".to_string(), json!("Egypt"));
        properties.insert("rank".to_string(), json!(3));
        properties.insert("class".to_string(), json!("park"));
        let mut state = Properties::new();
        state.insert("hover".to_string(), json!(true));
        RawFeature {
            id: Some(FeatureId::Int(7)),
            source_id: "countries".to_string(),
            source_layer: None,
            layer_id: "fill".to_string(),
            layer_type: LayerType::Fill,
            properties,
            state,
            geometry: Geometry::Polygon(vec![]),
        }
    }

    fn eval(expression: Value) -> Value {
        evaluate(&expression, &feature())
    }

    fn filter(expression: Value) -> bool {
        evaluate_filter(&expression, &feature())
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_get_and_has() {
            assert_eq!(eval(json!(["get", "name"])), json!("Egypt"));
            assert_eq!(eval(json!(["get", "missing"])), Value::Null);
            assert_eq!(eval(json!(["has", "rank"])), json!(true));
            assert_eq!(eval(json!(["get", "a", ["literal", {"a": 1}]])), json!(1));
        }

        #[test]
        fn test_id_state_and_type() {
            assert_eq!(eval(json!(["id"])), json!(7));
            assert_eq!(eval(json!(["feature-state", "hover"])), json!(true));
            assert_eq!(eval(json!(["geometry-type"])), json!("Polygon"));
        }

        #[test]
        fn test_plain_values_and_vectors() {
            assert_eq!(eval(json!(4)), json!(4));
            assert_eq!(eval(json!([10, -5])), json!([10, -5]));
            assert_eq!(eval(json!(["unknown-op", 1])), Value::Null);
        }
    }

    mod decision_tests {
        use super::*;

        #[test]
        fn test_numeric_equality_ignores_representation() {
            assert!(filter(json!(["==", ["get", "rank"], 3.0])));
            assert!(filter(json!(["==", ["id"], 7])));
            assert!(!filter(json!(["!=", ["id"], 7])));
        }

        #[test]
        fn test_ordering() {
            assert!(filter(json!([">", ["get", "rank"], 2])));
            assert!(filter(json!(["<=", ["get", "name"], "Fiji"])));
            assert!(!filter(json!(["<", ["get", "name"], 2])));
        }

        #[test]
        fn test_boolean_combinators() {
            assert!(filter(json!(["all", ["has", "name"], ["!", ["has", "nope"]]])));
            assert!(filter(json!(["any", false, ["==", ["get", "class"], "park"]])));
            assert!(!filter(json!(["all", true, ["==", ["get", "class"], "forest"]])));
        }

        #[test]
        fn test_in() {
            assert!(filter(json!(["in", ["get", "class"], ["literal", ["park", "wood"]]])));
            assert!(filter(json!(["in", "gyp", ["get", "name"]])));
            assert!(!filter(json!(["in", ["get", "class"], ["literal", ["wood"]]])));
        }

        #[test]
        fn test_case_and_match() {
            assert_eq!(eval(json!(["case", ["==", ["get", "rank"], 1], "a", ["==", ["get", "rank"], 3], "b", "c"])), json!("b"));
            assert_eq!(eval(json!(["case", false, 1, 0])), json!(0));
            assert_eq!(eval(json!(["match", ["get", "class"], ["wood", "park"], 1, "water", 2, 0])), json!(1));
            assert_eq!(eval(json!(["match", ["get", "class"], "water", 2, 0])), json!(0));
        }

        #[test]
        fn test_non_boolean_filter_result_is_false() {
            assert!(!filter(json!(["get", "name"])));
            assert!(!filter(json!(["case", ["get", "name"], true, false])));
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_coalesce_and_conversions() {
            assert_eq!(eval(json!(["coalesce", ["get", "missing"], ["get", "rank"]])), json!(3));
            assert_eq!(eval(json!(["to-number", "4.5"])), json!(4.5));
            assert_eq!(eval(json!(["to-string", ["get", "rank"]])), json!("3"));
            assert_eq!(eval(json!(["to-boolean", ""])), json!(false));
        }

        #[test]
        fn test_arithmetic() {
            assert_eq!(eval(json!(["*", 2, ["get", "rank"]])), json!(6.0));
            assert_eq!(eval(json!(["+", 1, 2, 3])), json!(6.0));
            assert_eq!(eval(json!(["-", 5])), json!(-5.0));
            assert_eq!(eval(json!(["/", 9, 3])), json!(3.0));
            assert_eq!(eval(json!(["*", 2, "x"])), Value::Null);
        }
    }

    mod legacy_tests {
        use super::*;

        #[test]
        fn test_detects_syntax() {
            assert!(!is_expression(&json!(["==", "class", "park"])));
            assert!(is_expression(&json!(["==", ["get", "class"], "park"])));
            assert!(!is_expression(&json!(["in", "class", "park", "wood"])));
            assert!(is_expression(&json!(["in", ["get", "class"], ["literal", []]])));
            assert!(!is_expression(&json!(["all", ["==", "class", "park"]])));
        }

        #[test]
        fn test_legacy_comparisons() {
            assert!(filter(json!(["==", "class", "park"])));
            assert!(filter(json!(["!=", "class", "wood"])));
            assert!(filter(json!([">=", "rank", 3])));
            assert!(filter(json!(["in", "class", "wood", "park"])));
            assert!(filter(json!(["!in", "class", "wood"])));
        }

        #[test]
        fn test_legacy_special_keys() {
            assert!(filter(json!(["==", "$type", "Polygon"])));
            assert!(filter(json!(["==", "$id", 7])));
            assert!(filter(json!(["has", "$id"])));
            assert!(filter(json!(["!has", "missing"])));
        }

        #[test]
        fn test_legacy_combinators() {
            assert!(filter(json!(["all", ["==", "class", "park"], ["has", "name"]])));
            assert!(filter(json!(["none", ["==", "class", "wood"]])));
            assert!(!filter(json!(["any", ["==", "class", "wood"], ["!has", "name"]])));
        }
    }
}
