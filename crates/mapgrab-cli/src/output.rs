//! Output formatting

use console::style;
use mapgrab::{LocatedFeature, Point, Rect, ResultFeature, Selector};
use std::fmt::Write as _;

/// Writes command results to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Printer {
    /// Create a printer
    #[must_use]
    pub const fn new(use_color: bool, quiet: bool) -> Self {
        Self { use_color, quiet }
    }

    /// Print a result block (suppressed in quiet mode)
    pub fn print(&self, text: &str) {
        if !self.quiet {
            println!("{}", text.trim_end());
        }
    }

    /// Print a JSON document; printed even in quiet mode
    pub fn print_json(&self, text: &str) {
        println!("{text}");
    }

    fn label(&self, text: &str) -> String {
        if self.use_color {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_color {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }

    /// One line per feature
    #[must_use]
    pub fn render_features(&self, features: &[ResultFeature]) -> String {
        if features.is_empty() {
            return self.dim("no features");
        }
        let mut out = String::new();
        for (i, feature) in features.iter().enumerate() {
            let _ = writeln!(out, "{i}: {}", self.feature_line(feature));
        }
        out
    }

    /// One block per element; merged elements list their parts
    #[must_use]
    pub fn render_located(&self, items: &[LocatedFeature]) -> String {
        if items.is_empty() {
            return self.dim("no elements");
        }
        let mut out = String::new();
        for (i, item) in items.iter().enumerate() {
            match item {
                LocatedFeature::Single(feature) => {
                    let _ = writeln!(out, "{i}: {}", self.feature_line(feature));
                }
                LocatedFeature::Merged(merged) => {
                    let _ = writeln!(
                        out,
                        "{i}: {} of {} features rect={} points={}",
                        self.label("merged"),
                        merged.features.len(),
                        rect_text(&merged.rect),
                        points_text(&merged.interaction_points),
                    );
                    for feature in &merged.features {
                        let _ = writeln!(out, "   - {}", self.feature_line(feature));
                    }
                }
            }
        }
        out
    }

    fn feature_line(&self, feature: &ResultFeature) -> String {
        let id = feature
            .feature_id
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let mut line = format!(
            "{} {} rect={} points={}",
            self.label(&format!("{}/{}", feature.layer_id, id)),
            self.dim(&format!("map={}", feature.map_id)),
            rect_text(&feature.rect),
            points_text(&feature.interaction_points),
        );
        if !feature.is_visible {
            line.push_str(" hidden");
        }
        line
    }

    /// Selector structure, one part per line
    #[must_use]
    pub fn render_selector(&self, selector: &Selector) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {selector}", self.label("selector"));
        if let Some(map_match) = &selector.map_match {
            let _ = writeln!(
                out,
                "  map    id {} {}",
                map_match.comparator,
                map_match.values.join(" | ")
            );
        }
        if let Some(layer_match) = selector.layer_predicate() {
            for (name, property) in [("id", &layer_match.id), ("type", &layer_match.layer_type)] {
                if let Some(property) = property {
                    let _ = writeln!(
                        out,
                        "  layer  {name} {} {}",
                        property.comparator,
                        property.values.join(" | ")
                    );
                }
            }
        }
        if let Some(filter) = &selector.filter {
            let _ = writeln!(out, "  filter {}", filter.as_value());
        }
        out
    }
}

fn rect_text(rect: &Rect) -> String {
    format!(
        "[{}, {}, {}x{}]",
        rect.x(),
        rect.y(),
        rect.width(),
        rect.height()
    )
}

fn points_text(points: &[Point]) -> String {
    if points.is_empty() {
        return "none".to_string();
    }
    points
        .iter()
        .map(|p| format!("({}, {})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mapgrab::{FeatureId, FeatureMerger, Properties};

    fn feature(id: i64, x: f64) -> ResultFeature {
        ResultFeature {
            feature_id: Some(FeatureId::Int(id)),
            source_id: "s".to_string(),
            layer_id: "stops".to_string(),
            properties: Properties::new(),
            map_id: "main".to_string(),
            is_visible: true,
            interaction_points: vec![Point::new(x + 5.0, 15.0)],
            rect: Rect::new(x, 10.0, x + 10.0, 20.0),
        }
    }

    #[test]
    fn test_feature_lines() {
        let printer = Printer::new(false, false);
        let mut hidden = feature(2, 40.0);
        hidden.is_visible = false;
        hidden.interaction_points.clear();
        let text = printer.render_features(&[feature(1, 0.0), hidden]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0: stops/1 map=main rect=[0, 10, 10x10] points=(5, 15)");
        assert_eq!(lines[1], "1: stops/2 map=main rect=[40, 10, 10x10] points=none hidden");
    }

    #[test]
    fn test_empty_results() {
        let printer = Printer::new(false, false);
        assert_eq!(printer.render_features(&[]), "no features");
        assert_eq!(printer.render_located(&[]), "no elements");
    }

    #[test]
    fn test_merged_block() {
        let printer = Printer::new(false, false);
        let merged = FeatureMerger::merge_all(vec![
            LocatedFeature::from(feature(1, 0.0)),
            LocatedFeature::from(feature(2, 40.0)),
        ])
        .unwrap();
        let text = printer.render_located(&[merged]);
        assert!(text.starts_with("0: merged of 2 features rect=[0, 10, 50x10]"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_selector_structure() {
        let printer = Printer::new(false, false);
        let selector = Selector::parse(r#"map[id*=[a,b]] layer[type=line] filter["has", "name"]"#).unwrap();
        let text = printer.render_selector(&selector);
        assert!(text.contains("map    id *= a | b"));
        assert!(text.contains("layer  type = line"));
        assert!(text.contains(r#"filter ["has","name"]"#));
    }
}
