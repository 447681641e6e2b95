//! Geometry primitives shared by the resolvers and the scene adapter.
//!
//! Two coordinate spaces meet here:
//!
//! - **Geographic** (`LngLat`, `Geometry`): what the engine reports for a
//!   rendered feature, decoded from its tile.
//! - **Screen** (`Point`): CSS pixels relative to the map canvas, y down.
//!
//! Clipping follows the Cohen-Sutherland / Sutherland-Hodgman pair used by
//! vector-tile tooling: polylines may split into several parts, polygon rings
//! are clipped edge by edge and re-closed.

use serde::{Deserialize, Serialize};

/// A point in screen space (CSS pixels, y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scale both components
    #[must_use]
    pub fn mult(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k)
    }

    /// Rotate around the origin by `angle` radians
    #[must_use]
    pub fn rotate(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos * self.x - sin * self.y, sin * self.x + cos * self.y)
    }

    /// Round both components to the nearest pixel
    #[must_use]
    pub fn round(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Vector length
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude
    pub lng: f64,
    /// Latitude
    pub lat: f64,
}

impl LngLat {
    /// Create a new position
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(position: [f64; 2]) -> Self {
        Self::new(position[0], position[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

/// Geographic bounding box (`[west, south, east, north]`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLatBounds {
    /// Minimum longitude
    pub west: f64,
    /// Minimum latitude
    pub south: f64,
    /// Maximum longitude
    pub east: f64,
    /// Maximum latitude
    pub north: f64,
}

impl LngLatBounds {
    /// Create bounds from their edges
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest bounds containing every position, `None` when empty
    #[must_use]
    pub fn from_positions(positions: impl IntoIterator<Item = LngLat>) -> Option<Self> {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self::new(p.lng, p.lat, p.lng, p.lat),
                Some(b) => Self::new(
                    b.west.min(p.lng),
                    b.south.min(p.lat),
                    b.east.max(p.lng),
                    b.north.max(p.lat),
                ),
            })
        })
    }

    /// Check if a position lies inside (edges included)
    #[must_use]
    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.west && p.lng <= self.east && p.lat >= self.south && p.lat <= self.north
    }
}

/// GeoJSON position (`[lng, lat]`)
pub type Position = [f64; 2];

/// Feature geometry in geographic coordinates, GeoJSON shaped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Single position
    Point(Position),
    /// Several positions
    MultiPoint(Vec<Position>),
    /// Polyline
    LineString(Vec<Position>),
    /// Several polylines
    MultiLineString(Vec<Vec<Position>>),
    /// Outer ring followed by holes
    Polygon(Vec<Vec<Position>>),
    /// Several polygons
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Every position of the geometry in document order (rings keep their
    /// closing position)
    #[must_use]
    pub fn coord_all(&self) -> Vec<LngLat> {
        self.parts().into_iter().flatten().collect()
    }

    /// Positions grouped by part: one group per point set, polyline or ring
    #[must_use]
    pub fn parts(&self) -> Vec<Vec<LngLat>> {
        let convert = |ring: &Vec<Position>| ring.iter().copied().map(LngLat::from).collect();
        match self {
            Self::Point(p) => vec![vec![LngLat::from(*p)]],
            Self::MultiPoint(points) | Self::LineString(points) => vec![convert(points)],
            Self::MultiLineString(lines) | Self::Polygon(lines) => lines.iter().map(convert).collect(),
            Self::MultiPolygon(polygons) => polygons.iter().flatten().map(convert).collect(),
        }
    }

    /// Check for a polygonal geometry
    #[must_use]
    pub const fn is_polygonal(&self) -> bool {
        matches!(self, Self::Polygon(_) | Self::MultiPolygon(_))
    }

    /// The same geometry on the world copy nearest to a longitude.
    ///
    /// Engines draw a feature in every visible copy of the world; tile
    /// fragments keep canonical longitudes, so a fragment just past the
    /// antimeridian must move by whole turns to land next to the camera.
    /// The geometry moves as one piece, keyed on the middle of its extent.
    #[must_use]
    pub fn world_copy_near(&self, lng: f64) -> Self {
        let Some(extent) = LngLatBounds::from_positions(self.coord_all()) else {
            return self.clone();
        };
        let turns = ((lng - (extent.west + extent.east) / 2.0) / 360.0).round();
        if turns == 0.0 {
            return self.clone();
        }
        let shift = turns * 360.0;
        self.map_positions(|[x, y]| [x + shift, y])
    }

    fn map_positions(&self, f: impl Fn(Position) -> Position) -> Self {
        let line = |points: &Vec<Position>| points.iter().copied().map(&f).collect::<Vec<_>>();
        let lines = |parts: &Vec<Vec<Position>>| parts.iter().map(line).collect::<Vec<_>>();
        match self {
            Self::Point(p) => Self::Point(f(*p)),
            Self::MultiPoint(points) => Self::MultiPoint(line(points)),
            Self::LineString(points) => Self::LineString(line(points)),
            Self::MultiLineString(parts) => Self::MultiLineString(lines(parts)),
            Self::Polygon(rings) => Self::Polygon(lines(rings)),
            Self::MultiPolygon(polygons) => Self::MultiPolygon(polygons.iter().map(lines).collect()),
        }
    }

    /// Clip the geometry to geographic bounds.
    ///
    /// Polylines that leave and re-enter the bounds come back as several
    /// parts; polygon rings that vanish are dropped; points outside are
    /// removed.
    #[must_use]
    pub fn clip(&self, bounds: &LngLatBounds) -> Self {
        match self {
            Self::Point(p) => {
                if bounds.contains(LngLat::from(*p)) {
                    Self::Point(*p)
                } else {
                    Self::MultiPoint(Vec::new())
                }
            }
            Self::MultiPoint(points) => Self::MultiPoint(
                points
                    .iter()
                    .copied()
                    .filter(|p| bounds.contains(LngLat::from(*p)))
                    .collect(),
            ),
            Self::LineString(line) => {
                let mut lines = clip_polyline(line, bounds);
                if lines.len() == 1 {
                    Self::LineString(lines.remove(0))
                } else {
                    Self::MultiLineString(lines)
                }
            }
            Self::MultiLineString(lines) => Self::MultiLineString(
                lines
                    .iter()
                    .flat_map(|line| clip_polyline(line, bounds))
                    .collect(),
            ),
            Self::Polygon(rings) => Self::Polygon(clip_rings(rings, bounds)),
            Self::MultiPolygon(polygons) => Self::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| clip_rings(rings, bounds))
                    .filter(|rings| !rings.is_empty())
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// CLIPPING
// =============================================================================

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

fn bit_code(p: Position, b: &LngLatBounds) -> u8 {
    let mut code = 0;
    if p[0] < b.west {
        code |= LEFT;
    } else if p[0] > b.east {
        code |= RIGHT;
    }
    if p[1] < b.south {
        code |= BOTTOM;
    } else if p[1] > b.north {
        code |= TOP;
    }
    code
}

fn intersect(a: Position, c: Position, edge: u8, b: &LngLatBounds) -> Position {
    if edge & TOP != 0 {
        [a[0] + (c[0] - a[0]) * (b.north - a[1]) / (c[1] - a[1]), b.north]
    } else if edge & BOTTOM != 0 {
        [a[0] + (c[0] - a[0]) * (b.south - a[1]) / (c[1] - a[1]), b.south]
    } else if edge & RIGHT != 0 {
        [b.east, a[1] + (c[1] - a[1]) * (b.east - a[0]) / (c[0] - a[0])]
    } else {
        [b.west, a[1] + (c[1] - a[1]) * (b.west - a[0]) / (c[0] - a[0])]
    }
}

/// Clip a polyline, returning the parts that remain inside the bounds
#[must_use]
pub fn clip_polyline(points: &[Position], bounds: &LngLatBounds) -> Vec<Vec<Position>> {
    let mut result = Vec::new();
    let Some(first) = points.first() else {
        return result;
    };

    let len = points.len();
    let mut code_a = bit_code(*first, bounds);
    let mut part: Vec<Position> = Vec::new();

    for i in 1..len {
        let mut a = points[i - 1];
        let mut b = points[i];
        let last_code = bit_code(b, bounds);
        let mut code_b = last_code;

        loop {
            if code_a | code_b == 0 {
                part.push(a);
                if code_b != last_code {
                    // segment leaves the bounds
                    part.push(b);
                    if i < len - 1 {
                        result.push(std::mem::take(&mut part));
                    }
                } else if i == len - 1 {
                    part.push(b);
                }
                break;
            } else if code_a & code_b != 0 {
                break;
            } else if code_a != 0 {
                a = intersect(a, b, code_a, bounds);
                code_a = bit_code(a, bounds);
            } else {
                b = intersect(a, b, code_b, bounds);
                code_b = bit_code(b, bounds);
            }
        }

        code_a = last_code;
    }

    if !part.is_empty() {
        result.push(part);
    }
    result
}

/// Clip a closed ring against the bounds (Sutherland-Hodgman)
#[must_use]
pub fn clip_ring(ring: &[Position], bounds: &LngLatBounds) -> Vec<Position> {
    let mut points = ring.to_vec();
    let mut edge = LEFT;

    while edge <= TOP {
        let mut result = Vec::with_capacity(points.len());
        let Some(&last) = points.last() else {
            break;
        };
        let mut prev = last;
        let mut prev_inside = bit_code(prev, bounds) & edge == 0;

        for &p in &points {
            let inside = bit_code(p, bounds) & edge == 0;
            if inside != prev_inside {
                result.push(intersect(prev, p, edge, bounds));
            }
            if inside {
                result.push(p);
            }
            prev = p;
            prev_inside = inside;
        }

        points = result;
        if points.is_empty() {
            break;
        }
        edge <<= 1;
    }

    points
}

fn clip_rings(rings: &[Vec<Position>], bounds: &LngLatBounds) -> Vec<Vec<Position>> {
    rings
        .iter()
        .filter_map(|ring| {
            let mut clipped = clip_ring(ring, bounds);
            let (first, last) = (*clipped.first()?, *clipped.last()?);
            if first != last {
                clipped.push(first);
            }
            (clipped.len() >= 4).then_some(clipped)
        })
        .collect()
}

// =============================================================================
// SCREEN SPACE HELPERS
// =============================================================================

/// Shift points by a paint translate vector.
///
/// `rotation` is applied to the vector first (radians); pass `0.0` for
/// map-anchored translates.
#[must_use]
pub fn translate_points(points: &[Point], translate: Point, rotation: f64) -> Vec<Point> {
    if translate.x == 0.0 && translate.y == 0.0 {
        return points.to_vec();
    }
    let shift = if rotation == 0.0 {
        translate
    } else {
        translate.rotate(rotation)
    };
    points.iter().map(|p| p.add(shift)).collect()
}

/// Miter length cap for polyline offsets (engine default miter limit)
const MITER_LIMIT: f64 = 2.0;

fn unit_normal(a: Point, b: Point) -> Point {
    let d = b.sub(a);
    let len = d.length();
    Point::new(-d.y / len, d.x / len)
}

/// Displace a polyline perpendicular to its direction.
///
/// Positive distances move the line to the right of the travel direction
/// (screen space, y down). Joins use a miter capped at twice the distance.
#[must_use]
pub fn offset_polyline(points: &[Point], distance: f64) -> Vec<Point> {
    if distance == 0.0 {
        return points.to_vec();
    }

    let mut line: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if line.last() != Some(&p) {
            line.push(p);
        }
    }
    if line.len() < 2 {
        return line;
    }

    let normals: Vec<Point> = line.windows(2).map(|w| unit_normal(w[0], w[1])).collect();
    let last = normals.len() - 1;

    line.iter()
        .enumerate()
        .map(|(i, &p)| {
            let normal = if i == 0 {
                normals[0]
            } else if i > last {
                normals[last]
            } else {
                let (n1, n2) = (normals[i - 1], normals[i]);
                let denom = 1.0 + n1.dot(n2);
                if denom < f64::EPSILON {
                    n1
                } else {
                    let miter = n1.add(n2).mult(1.0 / denom);
                    let len = miter.length();
                    if len > MITER_LIMIT {
                        miter.mult(MITER_LIMIT / len)
                    } else {
                        miter
                    }
                }
            };
            p.add(normal.mult(distance))
        })
        .collect()
}

/// Even-odd point in polygon test over a set of rings
#[must_use]
pub fn point_in_rings(point: Point, rings: &[Vec<Point>]) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

/// Shortest distance from a point to a segment
#[must_use]
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.dot(ab);
    if len_sq == 0.0 {
        return point.distance(a);
    }
    let t = (point.sub(a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a.add(ab.mult(t)))
}
