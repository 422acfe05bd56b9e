pub mod config;
pub mod course;
pub mod directions;
pub mod error;
pub mod geocode;
pub mod geometry;
pub mod gpx_export;
pub mod mapbox;
pub mod models;
pub mod overpass;
pub mod snap;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::course::CoursePlanner;
use crate::error::CourseError;
use crate::geocode::{Geocoder, GoogleGeocoder};
use crate::mapbox::{MapboxClient, RouteServiceError, WalkingRouter};
use crate::models::{ApiError, CourseEnvelope, CourseRequest};
use crate::overpass::OverpassClient;
use crate::snap::RoadLookup;

pub type LivePlanner = CoursePlanner<GoogleGeocoder, OverpassClient, MapboxClient>;

pub struct AppState<G, R, W> {
    pub planner: Arc<CoursePlanner<G, R, W>>,
}

impl<G, R, W> Clone for AppState<G, R, W> {
    fn clone(&self) -> Self {
        Self {
            planner: Arc::clone(&self.planner),
        }
    }
}

/// Planner wired to the real geocoding, Overpass and Mapbox services.
pub fn live_planner(config: &Config) -> Result<LivePlanner, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    let geocoder = GoogleGeocoder::new(client.clone(), &config.geocode_url, &config.gmaps_api_key);
    let roads = OverpassClient::new(client.clone(), &config.overpass_url);
    let router = MapboxClient::new(client, &config.mapbox_base_url, &config.mapbox_api_key);

    Ok(CoursePlanner::new(geocoder, roads, router).with_settings(config.planner_settings()))
}

pub fn create_router<G, R, W>(state: AppState<G, R, W>) -> Router
where
    G: Geocoder + 'static,
    R: RoadLookup + 'static,
    W: WalkingRouter + 'static,
{
    Router::new()
        .route("/course", post(course_handler::<G, R, W>))
        .route("/api/course", post(course_handler::<G, R, W>))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn course_handler<G, R, W>(
    State(state): State<AppState<G, R, W>>,
    Json(req): Json<CourseRequest>,
) -> Result<Json<CourseEnvelope>, (StatusCode, Json<ApiError>)>
where
    G: Geocoder,
    R: RoadLookup,
    W: WalkingRouter,
{
    tracing::info!("course request: \"{}\", {} km", req.location, req.distance);

    state
        .planner
        .plan(&req)
        .await
        .map(|course_data| Json(CourseEnvelope { course_data }))
        .map_err(api_error)
}

fn status_for(err: &CourseError) -> StatusCode {
    match err {
        CourseError::InvalidDistance(_) => StatusCode::BAD_REQUEST,
        err if err.is_unresolvable_location() => StatusCode::NOT_FOUND,
        CourseError::Route(RouteServiceError::NoRoute | RouteServiceError::TooFewWaypoints(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CourseError::Geocode { .. } | CourseError::Route(_) => StatusCode::BAD_GATEWAY,
        CourseError::Gpx(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: CourseError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!("course generation failed: {}", err);
    } else {
        tracing::warn!("course request rejected: {}", err);
    }
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
