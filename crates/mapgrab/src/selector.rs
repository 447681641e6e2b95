//! Map feature selectors.
//!
//! A selector addresses rendered features through up to three whitespace
//! separated parts, always in this order:
//!
//! - `map[id=...]`: which registered maps to search
//! - `layer[id=...]`, `layer[type=...]`: which style layers to search
//! - `filter[...]`: a style filter expression over feature properties
//!
//! ```
//! use mapgrab::selector::{Comparator, Selector};
//!
//! let selector: Selector = r#"map[id=123] layer[id=layer1] filter["==", ["get", "id"], 123]"#
//!     .parse()
//!     .unwrap();
//! let map_match = selector.map_match.as_ref().unwrap();
//! assert_eq!(map_match.comparator, Comparator::Exact);
//! assert_eq!(map_match.values, vec!["123"]);
//! ```

use crate::result::{MapGrabError, MapGrabResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// =============================================================================
// PROPERTY MATCHING
// =============================================================================

/// How a property value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `=`: the property equals one of the values
    #[serde(rename = "=")]
    Exact,
    /// `*=`: the property contains one of the values
    #[serde(rename = "*=")]
    Contains,
}

impl Comparator {
    /// Selector syntax of the comparator
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "=",
            Self::Contains => "*=",
        }
    }

    /// Compare a candidate against a single value
    #[must_use]
    pub fn matches(&self, candidate: &str, value: &str) -> bool {
        match self {
            Self::Exact => candidate == value,
            Self::Contains => candidate.contains(value),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparator with a non-empty list of alternative values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMatch {
    /// Comparison applied to every value
    pub comparator: Comparator,
    /// Alternatives, ORed together
    pub values: Vec<String>,
}

impl PropertyMatch {
    /// Create an exact match
    #[must_use]
    pub fn exact<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            comparator: Comparator::Exact,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a substring match
    #[must_use]
    pub fn contains<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            comparator: Comparator::Contains,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if any value matches the candidate
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.values
            .iter()
            .any(|value| self.comparator.matches(candidate, value))
    }

    fn write_property(&self, f: &mut fmt::Formatter<'_>, property: &str) -> fmt::Result {
        write!(f, "[{property}{}", self.comparator)?;
        match self.values.as_slice() {
            [single] if is_bare_value(single) => write!(f, "{single}]"),
            values => write!(f, "[{}]]", values.join(",")),
        }
    }
}

fn is_bare_value(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | ',' | '"'))
}

/// Layer predicate; every present property must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMatch {
    /// Layer id predicate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<PropertyMatch>,
    /// Layer type predicate
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub layer_type: Option<PropertyMatch>,
}

impl LayerMatch {
    /// Check if no property is constrained
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.id.is_none() && self.layer_type.is_none()
    }

    /// Check a layer against every present predicate
    #[must_use]
    pub fn matches(&self, layer_id: &str, layer_type: &str) -> bool {
        self.id.as_ref().map_or(true, |m| m.matches(layer_id))
            && self.layer_type.as_ref().map_or(true, |m| m.matches(layer_type))
    }
}

impl fmt::Display for LayerMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("layer")?;
        if let Some(id) = &self.id {
            id.write_property(f, "id")?;
        }
        if let Some(layer_type) = &self.layer_type {
            layer_type.write_property(f, "type")?;
        }
        Ok(())
    }
}

/// Style filter expression, passed verbatim to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression(serde_json::Value);

impl FilterExpression {
    /// Wrap a JSON expression
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Expression selecting the feature with the given id
    #[must_use]
    pub fn id_equals(id: serde_json::Value) -> Self {
        Self(serde_json::json!(["==", ["id"], id]))
    }

    /// Underlying JSON value
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.to_string();
        let inner = text
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .unwrap_or(&text);
        write!(f, "filter[{inner}]")
    }
}

// =============================================================================
// SELECTOR
// =============================================================================

/// Parsed selector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Map id predicate; `None` targets every registered map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_match: Option<PropertyMatch>,
    /// Layer predicate; `None` queries every layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_match: Option<LayerMatch>,
    /// Feature filter expression
    #[serde(rename = "filterExpression", skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpression>,
}

impl Selector {
    /// Parse selector text
    ///
    /// # Errors
    ///
    /// Returns `InvalidSelector` for blank text and `Parse` for malformed
    /// parts.
    pub fn parse(text: &str) -> MapGrabResult<Self> {
        let tokens = split_tokens(text)?;
        if tokens.is_empty() {
            return Err(MapGrabError::InvalidSelector);
        }

        let mut selector = Self::default();
        let mut last_scope = Scope::Map;
        for token in tokens {
            let scope = Scope::of(token)?;
            if scope < last_scope || (scope == Scope::Filter && selector.filter.is_some()) {
                return Err(MapGrabError::parse(
                    token,
                    "selector parts must appear once each as map, layer, filter",
                ));
            }
            last_scope = scope;
            selector.apply(scope, token)?;
        }
        Ok(selector)
    }

    /// Selector with a map predicate
    #[must_use]
    pub fn with_map(mut self, map_match: PropertyMatch) -> Self {
        self.map_match = Some(map_match);
        self
    }

    /// Selector with a layer id predicate
    #[must_use]
    pub fn with_layer_id(mut self, id: PropertyMatch) -> Self {
        self.layer_match.get_or_insert_with(LayerMatch::default).id = Some(id);
        self
    }

    /// Selector with a layer type predicate
    #[must_use]
    pub fn with_layer_type(mut self, layer_type: PropertyMatch) -> Self {
        self.layer_match
            .get_or_insert_with(LayerMatch::default)
            .layer_type = Some(layer_type);
        self
    }

    /// Selector with a filter expression
    #[must_use]
    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Layer predicate when it constrains something
    #[must_use]
    pub fn layer_predicate(&self) -> Option<&LayerMatch> {
        self.layer_match.as_ref().filter(|m| !m.is_empty())
    }

    fn apply(&mut self, scope: Scope, token: &str) -> MapGrabResult<()> {
        if scope == Scope::Filter {
            self.filter = Some(parse_filter(token)?);
            return Ok(());
        }

        let mut rest = &token[scope.prefix().len()..];
        if rest.is_empty() {
            return Err(MapGrabError::parse(token, "expected a [property=value] group"));
        }

        while !rest.is_empty() {
            let caps = group_pattern()
                .captures(rest)
                .ok_or_else(|| MapGrabError::parse(rest, "malformed [property=value] group"))?;
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let property = caps.get(1).map_or("", |m| m.as_str());
            let comparator = if caps.get(2).map(|m| m.as_str()) == Some("*=") {
                Comparator::Contains
            } else {
                Comparator::Exact
            };
            let values = match (caps.get(3), caps.get(4)) {
                (Some(list), _) => parse_value_list(whole, list.as_str())?,
                (None, Some(bare)) => vec![bare.as_str().to_string()],
                (None, None) => return Err(MapGrabError::parse(whole, "missing value")),
            };
            let property_match = PropertyMatch { comparator, values };

            let slot = match (scope, property) {
                (Scope::Map, "id") => &mut self.map_match,
                (Scope::Layer, "id") => &mut self.layer_match.get_or_insert_with(LayerMatch::default).id,
                (Scope::Layer, "type") => {
                    &mut self
                        .layer_match
                        .get_or_insert_with(LayerMatch::default)
                        .layer_type
                }
                _ => {
                    return Err(MapGrabError::parse(
                        whole,
                        format!("unknown {} property `{property}`", scope.name()),
                    ))
                }
            };
            if slot.is_some() {
                return Err(MapGrabError::parse(
                    whole,
                    format!("{} property `{property}` given twice", scope.name()),
                ));
            }
            *slot = Some(property_match);
            rest = &rest[whole.len()..];
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = MapGrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(map_match) = &self.map_match {
            parts.push(MapPart(map_match).to_string());
        }
        if let Some(layer_match) = self.layer_predicate() {
            parts.push(layer_match.to_string());
        }
        if let Some(filter) = &self.filter {
            parts.push(filter.to_string());
        }
        f.write_str(&parts.join(" "))
    }
}

struct MapPart<'a>(&'a PropertyMatch);

impl fmt::Display for MapPart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("map")?;
        self.0.write_property(f, "id")
    }
}

// =============================================================================
// TOKENIZER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Scope {
    Map,
    Layer,
    Filter,
}

impl Scope {
    fn of(token: &str) -> MapGrabResult<Self> {
        [Self::Map, Self::Layer, Self::Filter]
            .into_iter()
            .find(|scope| token.starts_with(scope.prefix()))
            .ok_or_else(|| {
                MapGrabError::parse(token, "expected map[...], layer[...] or filter[...]")
            })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Layer => "layer",
            Self::Filter => "filter",
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Layer => "layer",
            Self::Filter => "filter[",
        }
    }
}

fn group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^\[\s*([A-Za-z_][A-Za-z0-9_-]*)\s*(\*=|=)\s*(?:\[([^\[\]]*)\]|([^\s\[\],"]+))\s*\]"#,
        )
        .expect("selector group pattern is valid")
    })
}

fn parse_value_list(group: &str, list: &str) -> MapGrabResult<Vec<String>> {
    let values: Vec<String> = list.split(',').map(|v| v.trim().to_string()).collect();
    if values.iter().any(String::is_empty) {
        return Err(MapGrabError::parse(group, "empty value in list"));
    }
    Ok(values)
}

/// Split on whitespace at bracket depth zero, outside string literals
fn split_tokens(text: &str) -> MapGrabResult<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&text[s..i]);
                }
            }
            '"' => {
                in_string = true;
                start.get_or_insert(i);
            }
            '[' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ']' => {
                let s = *start.get_or_insert(i);
                if depth == 0 {
                    return Err(MapGrabError::parse(&text[s..=i], "unbalanced `]`"));
                }
                depth -= 1;
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }

    if let Some(s) = start {
        if in_string {
            return Err(MapGrabError::parse(&text[s..], "unterminated string literal"));
        }
        if depth > 0 {
            return Err(MapGrabError::parse(&text[s..], "unterminated `[`"));
        }
        tokens.push(&text[s..]);
    }
    Ok(tokens)
}

fn parse_filter(token: &str) -> MapGrabResult<FilterExpression> {
    let content = &token[Scope::Filter.prefix().len()..];
    let close = closing_bracket(content)
        .ok_or_else(|| MapGrabError::parse(token, "unterminated filter"))?;
    if close + 1 != content.len() {
        return Err(MapGrabError::parse(
            &content[close + 1..],
            "unexpected text after filter",
        ));
    }

    let inner = &content[..close];
    let value: serde_json::Value = serde_json::from_str(&format!("[{inner}]"))
        .map_err(|e| MapGrabError::parse(token, format!("invalid filter expression: {e}")))?;
    if !value.is_array() {
        return Err(MapGrabError::parse(token, "filter must be an expression array"));
    }
    Ok(FilterExpression(value))
}

/// Byte index of the `]` closing an already opened bracket
fn closing_bracket(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
