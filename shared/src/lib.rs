use serde::{Deserialize, Deserializer, Serialize, de};

/// A point in decimal degrees, latitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Largest per-axis difference, in degrees.
    pub fn max_axis_delta(self, other: Self) -> f64 {
        (self.lat - other.lat).abs().max((self.lon - other.lon).abs())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRequest {
    pub location: String,
    /// Target course length in kilometers; form posts send it as a string.
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Float(value) => Ok(value),
        Number::Text(text) => text.trim().parse().map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&text), &"a number of kilometers")
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RouteBounds {
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let seed = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(points.iter().fold(seed, |acc, p| Self {
            min_lat: acc.min_lat.min(p.lat),
            max_lat: acc.max_lat.max(p.lat),
            min_lon: acc.min_lon.min(p.lon),
            max_lon: acc.max_lon.max(p.lon),
        }))
    }

    pub fn south_west(&self) -> Coordinate {
        Coordinate::new(self.min_lat, self.min_lon)
    }

    pub fn north_east(&self) -> Coordinate {
        Coordinate::new(self.max_lat, self.max_lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Start,
    Waypoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapMarker {
    pub position: Coordinate,
    pub kind: MarkerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

/// Everything a map widget needs to draw a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
    pub polyline: Vec<Coordinate>,
    pub markers: Vec<MapMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<RouteBounds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResponse {
    pub map: MapView,
    pub location: String,
    pub distance: f64,
    /// Routed length in kilometers, two decimals.
    pub route_distance: f64,
    pub directions: Vec<String>,
    pub waypoints: Vec<Coordinate>,
    #[serde(default)]
    pub dropped_waypoints: usize,
    pub bearing_deg: f64,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEnvelope {
    pub course_data: CourseResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_points() {
        let points = [
            Coordinate::new(59.30, 18.10),
            Coordinate::new(59.35, 18.02),
            Coordinate::new(59.32, 18.07),
        ];
        let bounds = RouteBounds::from_points(&points).unwrap();
        assert_eq!(bounds.south_west(), Coordinate::new(59.30, 18.02));
        assert_eq!(bounds.north_east(), Coordinate::new(59.35, 18.10));
    }

    #[test]
    fn bounds_of_empty_slice() {
        assert!(RouteBounds::from_points(&[]).is_none());
    }
}
