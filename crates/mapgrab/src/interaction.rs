//! Interaction point search.
//!
//! A resolved rectangle says where a feature is drawn, not where a click lands
//! on it: another feature may be painted on top, a line may be thinner than
//! its envelope suggests, a label may be placed off its anchor. The finder
//! asks the engine's own hit test which pixels really belong to the feature.

use crate::engine::{MapAdapter, QueryGeometry, QueryOptions, RawFeature};
use crate::geometry::Point;
use tracing::trace;

/// Largest distance (pixels) searched around a candidate
pub const SEARCH_RADIUS: u32 = 5;

/// Search directions: both diagonals, then up, down, right, left
const DIRECTIONS: [(f64, f64); 8] = [
    (-1.0, -1.0),
    (1.0, 1.0),
    (-1.0, 1.0),
    (1.0, -1.0),
    (0.0, -1.0),
    (0.0, 1.0),
    (1.0, 0.0),
    (-1.0, 0.0),
];

/// Finds pixels the engine hit-tests as a given feature
#[derive(Debug, Clone, Copy)]
pub struct InteractionPointFinder<'a> {
    adapter: &'a dyn MapAdapter,
    width: f64,
    height: f64,
}

impl<'a> InteractionPointFinder<'a> {
    /// Create a finder over the adapter's current canvas
    #[must_use]
    pub fn new(adapter: &'a dyn MapAdapter) -> Self {
        let transform = adapter.transform();
        Self {
            adapter,
            width: transform.width,
            height: transform.height,
        }
    }

    /// First candidate (or neighbour of one) confirmed by the hit test.
    ///
    /// Candidates are map-relative and rounded before testing. Each one is
    /// tried as is, then along every direction out to [`SEARCH_RADIUS`].
    #[must_use]
    pub fn find(&self, feature: &RawFeature, candidates: &[Point]) -> Option<Point> {
        for candidate in candidates {
            let origin = candidate.round();
            if self.confirms(feature, origin) {
                return Some(origin);
            }

            for (dx, dy) in DIRECTIONS {
                for i in 1..=SEARCH_RADIUS {
                    let step = f64::from(i);
                    let probe = Point::new(origin.x + dx * step, origin.y + dy * step);
                    if self.confirms(feature, probe) {
                        return Some(probe);
                    }
                }
            }
        }

        trace!(
            layer = %feature.layer_id,
            candidates = candidates.len(),
            "no interaction point confirmed"
        );
        None
    }

    fn confirms(&self, feature: &RawFeature, point: Point) -> bool {
        if point.x < 0.0 || point.y < 0.0 || point.x >= self.width || point.y >= self.height {
            return false;
        }

        let options = QueryOptions::default().with_layers(vec![feature.layer_id.clone()]);
        match self
            .adapter
            .query_rendered_features(Some(&QueryGeometry::Point(point)), &options)
        {
            Ok(hits) => hits
                .iter()
                .any(|hit| hit.id == feature.id && hit.properties == feature.properties),
            Err(err) => {
                trace!(x = point.x, y = point.y, error = %err, "hit test failed");
                false
            }
        }
    }
}
