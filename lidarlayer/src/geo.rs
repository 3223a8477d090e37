//! Geographic bounding boxes.
//!
//! A [`GeoBounds`] is the anchor of every raster overlay: the south-west and
//! north-east corners of the area the image covers, in decimal degrees.
//! Construction never validates; use [`crate::validation::BoundsValidator`]
//! to decide whether a box is usable.

use serde::{Deserialize, Serialize};

/// Axis-aligned geographic bounding box in degrees.
///
/// West may be greater than east; such a box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Creates bounds from individual edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Creates bounds from `[[south, west], [north, east]]` corner pairs.
    pub fn from_corners(corners: [[f64; 2]; 2]) -> Self {
        let [[south, west], [north, east]] = corners;
        Self::new(south, west, north, east)
    }

    /// Returns the bounds as `[[south, west], [north, east]]`.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }

    /// Returns true if the box crosses the antimeridian (west > east).
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Width in degrees, measured eastward from the west edge.
    pub fn width_deg(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east + 360.0 - self.west
        } else {
            self.east - self.west
        }
    }

    /// Height in degrees.
    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    /// Centre point as `(lat, lon)`, normalised to [-180, 180].
    pub fn center(&self) -> (f64, f64) {
        let lat = (self.south + self.north) / 2.0;
        let mut lon = self.west + self.width_deg() / 2.0;
        if lon > 180.0 {
            lon -= 360.0;
        }
        (lat, lon)
    }
}

impl From<[[f64; 2]; 2]> for GeoBounds {
    fn from(corners: [[f64; 2]; 2]) -> Self {
        Self::from_corners(corners)
    }
}
