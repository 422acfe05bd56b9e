use std::fmt;

use serde::Deserialize;

pub use shared::{
    ApiError, Coordinate, CourseEnvelope, CourseRequest, CourseResponse, MapMarker, MapView,
    MarkerKind, RouteBounds,
};

/// Longitude-first pair, the axis order the directions API speaks.
///
/// Deserializes from a GeoJSON position `[lon, lat]`. Converting to and from
/// [`Coordinate`] is the only place the axes are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl From<[f64; 2]> for LonLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for LonLat {
    fn from(coord: Coordinate) -> Self {
        Self {
            lon: coord.lon,
            lat: coord.lat,
        }
    }
}

impl From<LonLat> for Coordinate {
    fn from(pos: LonLat) -> Self {
        Coordinate {
            lat: pos.lat,
            lon: pos.lon,
        }
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

/// A road way returned by the road-network lookup, nodes in way order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadWay {
    pub nodes: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub instruction: String,
    pub distance_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub steps: Vec<Step>,
}

/// A walking path as returned by the routing service, geometry in (lat, lon).
#[derive(Debug, Clone, PartialEq)]
pub struct PathGeometry {
    pub coordinates: Vec<Coordinate>,
    pub distance_m: f64,
    pub legs: Vec<Leg>,
}

impl PathGeometry {
    pub fn distance_km(&self) -> f64 {
        (self.distance_m / 1000.0 * 100.0).round() / 100.0
    }

    pub fn step_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.steps.len()).sum()
    }
}
