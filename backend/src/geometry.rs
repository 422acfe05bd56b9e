use std::f64::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::models::Coordinate;

/// Residual allowed between the closing candidates and the start, in degrees.
const ENDPOINT_TOLERANCE_DEG: f64 = 1e-9;

/// Converts kilometers into degrees along each axis.
pub trait Projection {
    fn lat_degrees(&self, km: f64) -> f64;
    fn lon_degrees(&self, km: f64) -> f64;
}

/// Flat per-axis scaling around a reference latitude.
///
/// `calibrated()` uses 111 km per degree of latitude and 55 km per degree of
/// longitude, which matches Stockholm (~59.3°N). Away from that latitude the
/// longitude scale drifts with cos(lat): at 45°N the course comes out ~30%
/// narrower east-west than intended, at the equator about half. Use
/// [`LocalProjection::at_latitude`] when courses are planned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    pub km_per_lat_degree: f64,
    pub km_per_lon_degree: f64,
}

impl LocalProjection {
    pub const KM_PER_LAT_DEGREE: f64 = 111.0;

    pub fn calibrated() -> Self {
        Self {
            km_per_lat_degree: Self::KM_PER_LAT_DEGREE,
            km_per_lon_degree: 55.0,
        }
    }

    pub fn at_latitude(lat: f64) -> Self {
        let km_per_lon_degree = (Self::KM_PER_LAT_DEGREE * lat.to_radians().cos()).max(1e-6);
        Self {
            km_per_lat_degree: Self::KM_PER_LAT_DEGREE,
            km_per_lon_degree,
        }
    }
}

impl Default for LocalProjection {
    fn default() -> Self {
        Self::calibrated()
    }
}

impl Projection for LocalProjection {
    fn lat_degrees(&self, km: f64) -> f64 {
        km / self.km_per_lat_degree
    }

    fn lon_degrees(&self, km: f64) -> f64 {
        km / self.km_per_lon_degree
    }
}

/// Source of the course heading, in radians within [0, 2π).
pub trait BearingSource {
    fn next_bearing(&mut self) -> f64;
}

pub struct RandomBearing {
    rng: StdRng,
}

impl RandomBearing {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl BearingSource for RandomBearing {
    fn next_bearing(&mut self) -> f64 {
        self.rng.gen_range(0.0..2.0 * PI)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedBearing(pub f64);

impl BearingSource for FixedBearing {
    fn next_bearing(&mut self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseShape {
    /// Shrinks the circle so the road distance lands near the target.
    pub shrink_factor: f64,
    /// Candidates around the circle, not counting the repeated start. Even.
    pub waypoint_count: usize,
}

impl Default for CourseShape {
    fn default() -> Self {
        Self {
            shrink_factor: 0.7,
            waypoint_count: 6,
        }
    }
}

impl CourseShape {
    fn half_count(&self) -> i64 {
        (self.waypoint_count / 2).max(1) as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseCircle {
    pub center: Coordinate,
    pub radius_km: f64,
    pub bearing: f64,
    /// Closed loop: first and last are the start.
    pub candidates: Vec<Coordinate>,
}

/// Lays a circle through `start` and spreads candidate points around it.
///
/// The circle centre sits `radius` away from the start along a random bearing.
/// Candidate angles run from `bearing - π` to `bearing + π`, so both ends of the
/// sequence fall back on the start.
pub fn plan_circle(
    start: Coordinate,
    distance_km: f64,
    shape: &CourseShape,
    projection: &impl Projection,
    bearings: &mut impl BearingSource,
) -> CourseCircle {
    let radius_km = distance_km / (2.0 * PI) * shape.shrink_factor;
    let bearing = bearings.next_bearing();

    let center = offset(start, radius_km, bearing, projection);

    let half = shape.half_count();
    let mut candidates: Vec<Coordinate> = (-half..=half)
        .map(|k| bearing + PI * k as f64 / half as f64)
        .map(|angle| offset(center, radius_km, angle, projection))
        .collect();

    close_loop(&mut candidates, start);

    tracing::debug!(
        "course circle: centre ({:.5}, {:.5}), radius {:.3} km, bearing {:.0}°, {} candidates",
        center.lat,
        center.lon,
        radius_km,
        bearing.to_degrees(),
        candidates.len()
    );

    CourseCircle {
        center,
        radius_km,
        bearing,
        candidates,
    }
}

fn offset(origin: Coordinate, km: f64, angle: f64, projection: &impl Projection) -> Coordinate {
    Coordinate {
        lat: origin.lat + projection.lat_degrees(km * angle.cos()),
        lon: origin.lon + projection.lon_degrees(km * angle.sin()),
    }
}

/// Pins both ends of the candidate ring onto the start once the residual is checked.
fn close_loop(candidates: &mut [Coordinate], start: Coordinate) {
    let len = candidates.len();
    for idx in [0, len.saturating_sub(1)] {
        let Some(point) = candidates.get_mut(idx) else {
            continue;
        };
        let residual = point.max_axis_delta(start);
        if residual > ENDPOINT_TOLERANCE_DEG {
            tracing::warn!(
                "candidate {} misses the start by {:.3e}° before closing the loop",
                idx,
                residual
            );
        }
        *point = start;
    }
}
