//! Web Mercator camera.

use crate::engine::MapTransform;
use crate::geometry::{LngLat, LngLatBounds, Point};
use crate::placement::{CanonicalTileId, OverscaledTileId};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Size of one world tile in pixels at zoom 0
pub const TILE_SIZE: f64 = 512.0;

/// Largest latitude Web Mercator can represent
pub const MAX_LATITUDE: f64 = 85.051_129;

/// Camera looking at a Web Mercator world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Geographic position at the canvas centre
    pub center: LngLat,
    /// Zoom level
    pub zoom: f64,
    /// Bearing in degrees, clockwise from north
    #[serde(default)]
    pub bearing: f64,
    /// Canvas width in CSS pixels
    pub width: f64,
    /// Canvas height in CSS pixels
    pub height: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, TILE_SIZE, TILE_SIZE)
    }
}

impl Camera {
    /// Create a north-up camera
    #[must_use]
    pub const fn new(lng: f64, lat: f64, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center: LngLat::new(lng, lat),
            zoom,
            bearing: 0.0,
            width,
            height,
        }
    }

    /// Rotate the camera
    #[must_use]
    pub const fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    /// World width in pixels at the current zoom
    #[must_use]
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    fn to_world(&self, position: LngLat) -> Point {
        let size = self.world_size();
        let lat = position.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let x = (180.0 + position.lng) / 360.0;
        let y = (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0;
        Point::new(x * size, y * size)
    }

    fn from_world(&self, point: Point) -> LngLat {
        let size = self.world_size();
        let lng = point.x * 360.0 / size - 180.0;
        let y2 = 180.0 - point.y * 360.0 / size;
        let lat = 360.0 / PI * (y2 * PI / 180.0).exp().atan() - 90.0;
        LngLat::new(lng, lat)
    }

    fn half_canvas(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Geographic position to canvas pixels
    #[must_use]
    pub fn project(&self, position: LngLat) -> Point {
        let delta = self.to_world(position).sub(self.to_world(self.center));
        self.half_canvas().add(delta.rotate(-self.bearing.to_radians()))
    }

    /// Canvas pixels to geographic position
    #[must_use]
    pub fn unproject(&self, point: Point) -> LngLat {
        let delta = point.sub(self.half_canvas()).rotate(self.bearing.to_radians());
        self.from_world(self.to_world(self.center).add(delta))
    }

    /// Bounds of the four unprojected canvas corners
    #[must_use]
    pub fn visible_bounds(&self) -> LngLatBounds {
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(self.width, 0.0),
            Point::new(self.width, self.height),
            Point::new(0.0, self.height),
        ];
        LngLatBounds::from_positions(corners.into_iter().map(|c| self.unproject(c))).unwrap_or(
            LngLatBounds::new(self.center.lng, self.center.lat, self.center.lng, self.center.lat),
        )
    }

    /// Tile under the canvas centre at the integer zoom
    #[must_use]
    pub fn center_tile(&self) -> OverscaledTileId {
        let z = self.zoom.max(0.0).floor().min(24.0) as u8;
        let tiles = 2f64.powi(i32::from(z));
        let world = self.to_world(self.center);
        let column = (world.x / self.world_size() * tiles).floor();
        let row = (world.y / self.world_size() * tiles).floor();
        let wrap = (column / tiles).floor();
        OverscaledTileId {
            overscaled_z: z,
            wrap: wrap as i32,
            canonical: CanonicalTileId {
                z,
                x: (column - wrap * tiles).max(0.0) as u32,
                y: row.clamp(0.0, tiles - 1.0) as u32,
            },
        }
    }

    /// Camera state in engine terms
    #[must_use]
    pub const fn transform(&self) -> MapTransform {
        MapTransform {
            center: self.center,
            bearing: self.bearing,
            zoom: self.zoom,
            width: self.width,
            height: self.height,
        }
    }
}
