use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::CourseError;
use crate::models::Coordinate;

const CREATOR: &str = "loop-course";

/// GPX 1.1 document with the snapped waypoints as `<wpt>` and the walked path as a track.
pub fn build_course_gpx(name: &str, waypoints: &[Coordinate], path: &[Coordinate]) -> Gpx {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };

    gpx.waypoints = waypoints
        .iter()
        .enumerate()
        .map(|(idx, coord)| {
            let mut waypoint = to_waypoint(coord);
            waypoint.name = Some(if idx == 0 {
                "Start".to_string()
            } else {
                format!("Waypoint {idx}")
            });
            waypoint
        })
        .collect();

    let mut track = Track {
        name: Some(name.into()),
        ..Default::default()
    };
    let mut segment = TrackSegment::new();
    segment.points.extend(path.iter().map(to_waypoint));
    track.segments.push(segment);
    gpx.tracks.push(track);

    gpx
}

pub fn encode_course_as_gpx(
    name: &str,
    waypoints: &[Coordinate],
    path: &[Coordinate],
) -> Result<String, CourseError> {
    let gpx = build_course_gpx(name, waypoints, path);
    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}
