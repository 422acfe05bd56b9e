use crate::{
    config::PlannerSettings,
    directions::extract_directions,
    error::CourseError,
    geocode::Geocoder,
    geometry::{plan_circle, BearingSource, CourseCircle, RandomBearing},
    gpx_export::encode_course_as_gpx,
    mapbox::WalkingRouter,
    models::{
        Coordinate, CourseRequest, CourseResponse, MapMarker, MapView, MarkerKind, RouteBounds,
    },
    snap::{RetryPolicy, RoadLookup, SnapReport, SnapResolver},
};

const MAP_ZOOM: u8 = 12;

/// Runs the course pipeline: geocode, lay out the circle, snap to roads,
/// route through the waypoints and extract directions.
pub struct CoursePlanner<G, R, W> {
    geocoder: G,
    roads: R,
    router: W,
    retry: RetryPolicy,
    settings: PlannerSettings,
}

impl<G, R, W> CoursePlanner<G, R, W>
where
    G: Geocoder,
    R: RoadLookup,
    W: WalkingRouter,
{
    pub fn new(geocoder: G, roads: R, router: W) -> Self {
        Self {
            geocoder,
            roads,
            router,
            retry: RetryPolicy::default(),
            settings: PlannerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PlannerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn plan(&self, req: &CourseRequest) -> Result<CourseResponse, CourseError> {
        validate_distance(req.distance)?;

        let start = self
            .geocoder
            .locate(&req.location)
            .await
            .map_err(|source| CourseError::Geocode {
                location: req.location.clone(),
                source,
            })?;
        tracing::info!(
            "planning {:.1} km course from \"{}\" at ({:.5}, {:.5})",
            req.distance,
            req.location,
            start.lat,
            start.lon
        );

        let mut bearings = match req.seed {
            Some(seed) => RandomBearing::seeded(seed),
            None => RandomBearing::from_entropy(),
        };
        self.plan_from(start, &req.location, req.distance, &mut bearings)
            .await
    }

    /// Plans from an already located start; the bearing comes from `bearings`.
    pub async fn plan_from(
        &self,
        start: Coordinate,
        location: &str,
        distance_km: f64,
        bearings: &mut (impl BearingSource + Send),
    ) -> Result<CourseResponse, CourseError> {
        validate_distance(distance_km)?;

        let projection = self.settings.projection_for(start.lat);
        let circle = plan_circle(start, distance_km, &self.settings.shape, &projection, bearings);

        let report = self.snap(start, &circle).await;
        let waypoints = report.waypoints();

        let path = self.router.walking_route(&waypoints).await?;
        let directions = extract_directions(&path);
        let route_distance = path.distance_km();

        tracing::info!(
            "course ready: {:.2}/{:.1} km, {} waypoints, {} dropped, {} directions",
            route_distance,
            distance_km,
            waypoints.len(),
            report.dropped(),
            directions.len()
        );

        let gpx_base64 = encode_course_as_gpx(
            &format!("{location} {distance_km} km"),
            &waypoints,
            &path.coordinates,
        )?;

        Ok(CourseResponse {
            map: map_view(&circle, &waypoints, &path.coordinates),
            location: location.to_string(),
            distance: distance_km,
            route_distance,
            directions,
            dropped_waypoints: report.dropped(),
            waypoints,
            bearing_deg: circle.bearing.to_degrees(),
            gpx_base64,
        })
    }

    async fn snap(&self, start: Coordinate, circle: &CourseCircle) -> SnapReport {
        let mut resolver = SnapResolver::new(&self.roads, self.retry);
        if !self.settings.snap_budget.is_zero() {
            resolver = resolver.with_budget(self.settings.snap_budget);
        }
        resolver
            .resolve(&circle.candidates)
            .await
            .unwrap_or(SnapReport {
                start,
                outcomes: Vec::new(),
            })
    }
}

fn validate_distance(distance_km: f64) -> Result<(), CourseError> {
    if distance_km.is_finite() && distance_km > 0.0 {
        Ok(())
    } else {
        Err(CourseError::InvalidDistance(distance_km))
    }
}

/// Map description: centred on the circle, start flagged, inner waypoints marked.
pub fn map_view(circle: &CourseCircle, waypoints: &[Coordinate], path: &[Coordinate]) -> MapView {
    let mut markers = Vec::with_capacity(waypoints.len());
    if let Some(&start) = waypoints.first() {
        markers.push(MapMarker {
            position: start,
            kind: MarkerKind::Start,
            tooltip: Some("Starting Location".to_string()),
        });
    }
    if waypoints.len() > 2 {
        markers.extend(waypoints[1..waypoints.len() - 1].iter().map(|&position| MapMarker {
            position,
            kind: MarkerKind::Waypoint,
            tooltip: None,
        }));
    }

    MapView {
        center: circle.center,
        zoom: MAP_ZOOM,
        polyline: path.to_vec(),
        markers,
        bounds: RouteBounds::from_points(path),
    }
}
