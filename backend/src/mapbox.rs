use std::future::Future;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::models::{Coordinate, Leg, LonLat, PathGeometry, Step};

pub const DEFAULT_MAPBOX_URL: &str = "https://api.mapbox.com";

#[derive(Debug, thiserror::Error)]
pub enum RouteServiceError {
    #[error("a walking route needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("routing request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("routing service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed routing response: {0}")]
    Malformed(String),
    #[error("routing service found no route")]
    NoRoute,
}

/// Walking-profile routing through an ordered list of waypoints.
pub trait WalkingRouter: Send + Sync {
    fn walking_route(
        &self,
        waypoints: &[Coordinate],
    ) -> impl Future<Output = Result<PathGeometry, RouteServiceError>> + Send;
}

/// `lon,lat;lon,lat;…` as the directions API expects in its path.
pub fn waypoint_path(waypoints: &[Coordinate]) -> String {
    waypoints
        .iter()
        .map(|&coord| LonLat::from(coord).to_string())
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Clone)]
pub struct MapboxClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MapboxClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    fn directions_url(&self, waypoints: &[Coordinate]) -> Result<Url, RouteServiceError> {
        let raw = format!(
            "{}/directions/v5/mapbox/walking/{}",
            self.base_url.trim_end_matches('/'),
            waypoint_path(waypoints)
        );
        Url::parse_with_params(
            &raw,
            &[
                ("geometries", "geojson"),
                ("exclude", "ferry"),
                ("continue_straight", "true"),
                ("steps", "true"),
                ("access_token", self.access_token.as_str()),
            ],
        )
        .map_err(|err| RouteServiceError::Malformed(format!("bad directions URL: {err}")))
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
struct RouteDto {
    distance: f64,
    geometry: GeometryDto,
    legs: Vec<LegDto>,
}

#[derive(Debug, Deserialize)]
struct GeometryDto {
    coordinates: Vec<LonLat>,
}

#[derive(Debug, Deserialize)]
struct LegDto {
    steps: Vec<StepDto>,
}

#[derive(Debug, Deserialize)]
struct StepDto {
    distance: f64,
    maneuver: ManeuverDto,
}

#[derive(Debug, Deserialize)]
struct ManeuverDto {
    instruction: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Takes the first route; an empty route list is a failure, not an empty path.
fn first_route(response: DirectionsResponse) -> Result<PathGeometry, RouteServiceError> {
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RouteServiceError::NoRoute)?;

    Ok(PathGeometry {
        coordinates: route
            .geometry
            .coordinates
            .into_iter()
            .map(Coordinate::from)
            .collect(),
        distance_m: route.distance,
        legs: route
            .legs
            .into_iter()
            .map(|leg| Leg {
                steps: leg
                    .steps
                    .into_iter()
                    .map(|step| Step {
                        instruction: step.maneuver.instruction,
                        distance_m: step.distance,
                    })
                    .collect(),
            })
            .collect(),
    })
}

fn parse_directions(text: &str) -> Result<PathGeometry, RouteServiceError> {
    let response: DirectionsResponse = serde_json::from_str(text)
        .map_err(|err| RouteServiceError::Malformed(err.to_string()))?;
    first_route(response)
}

/// Interprets a directions reply: error statuses carry the service's own
/// message when it sent one, the raw body otherwise.
fn read_directions(status: StatusCode, text: String) -> Result<PathGeometry, RouteServiceError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorPayload>(&text)
            .ok()
            .and_then(|payload| payload.message.or(payload.code))
            .unwrap_or(text);
        tracing::error!("directions API returned {}: {}", status, message);
        return Err(RouteServiceError::Status {
            status: status.as_u16(),
            message,
        });
    }

    parse_directions(&text).inspect_err(|err| {
        tracing::error!("unusable directions response: {}", err);
    })
}

impl WalkingRouter for MapboxClient {
    async fn walking_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<PathGeometry, RouteServiceError> {
        if waypoints.len() < 2 {
            return Err(RouteServiceError::TooFewWaypoints(waypoints.len()));
        }
        let url = self.directions_url(waypoints)?;
        tracing::debug!("requesting walking route through {} waypoints", waypoints.len());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        read_directions(status, text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn path_is_longitude_first() {
        let waypoints = [
            Coordinate::new(59.33, 18.07),
            Coordinate::new(59.34, 18.05),
        ];
        assert_eq!(waypoint_path(&waypoints), "18.07,59.33;18.05,59.34");
    }

    #[test]
    fn url_carries_walking_options() {
        let client = MapboxClient::new(Client::new(), "https://api.example.test/", "tok");
        let url = client
            .directions_url(&[Coordinate::new(59.33, 18.07), Coordinate::new(59.34, 18.05)])
            .unwrap();

        assert!(url
            .path()
            .ends_with("/directions/v5/mapbox/walking/18.07,59.33;18.05,59.34"));
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        for (key, value) in [
            ("geometries", "geojson"),
            ("exclude", "ferry"),
            ("continue_straight", "true"),
            ("steps", "true"),
            ("access_token", "tok"),
        ] {
            assert!(query.contains(&(key.to_string(), value.to_string())), "{key}");
        }
    }

    #[test]
    fn first_route_is_converted_to_lat_lon() {
        let body = json!({
            "code": "Ok",
            "routes": [
                {
                    "distance": 5123.4,
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[18.07, 59.33], [18.08, 59.34]]
                    },
                    "legs": [
                        {"steps": [
                            {"distance": 120.4, "maneuver": {"instruction": "Head north"}},
                            {"distance": 0.0, "maneuver": {"instruction": "You have arrived"}}
                        ]}
                    ]
                },
                {
                    "distance": 1.0,
                    "geometry": {"coordinates": []},
                    "legs": []
                }
            ]
        });

        let path = parse_directions(&body.to_string()).unwrap();
        assert_eq!(path.distance_m, 5123.4);
        assert_eq!(path.coordinates[0], Coordinate::new(59.33, 18.07));
        assert_eq!(path.legs.len(), 1);
        assert_eq!(path.legs[0].steps[0].instruction, "Head north");
    }

    #[test]
    fn zero_routes_is_an_error() {
        let body = json!({"code": "NoRoute", "routes": []});
        assert!(matches!(
            parse_directions(&body.to_string()),
            Err(RouteServiceError::NoRoute)
        ));
    }

    #[test]
    fn missing_field_is_malformed() {
        let body = json!({"routes": [{"distance": 10.0, "legs": []}]});
        assert!(matches!(
            parse_directions(&body.to_string()),
            Err(RouteServiceError::Malformed(_))
        ));
    }

    #[test]
    fn error_status_uses_the_service_message() {
        let body = json!({"message": "Not Authorized - Invalid Token"}).to_string();
        assert!(matches!(
            read_directions(StatusCode::UNAUTHORIZED, body),
            Err(RouteServiceError::Status { status: 401, message })
                if message == "Not Authorized - Invalid Token"
        ));
    }

    #[test]
    fn error_status_falls_back_to_the_code() {
        let body = json!({"code": "InvalidInput"}).to_string();
        assert!(matches!(
            read_directions(StatusCode::UNPROCESSABLE_ENTITY, body),
            Err(RouteServiceError::Status { status: 422, message }) if message == "InvalidInput"
        ));
    }

    #[test]
    fn error_status_without_payload_keeps_the_raw_body() {
        assert!(matches!(
            read_directions(StatusCode::BAD_GATEWAY, "upstream timed out".to_string()),
            Err(RouteServiceError::Status { status: 502, message })
                if message == "upstream timed out"
        ));
    }

    #[test]
    fn successful_status_parses_the_route() {
        let body = json!({
            "routes": [{
                "distance": 42.0,
                "geometry": {"coordinates": [[18.07, 59.33]]},
                "legs": []
            }]
        });
        let path = read_directions(StatusCode::OK, body.to_string()).unwrap();
        assert_eq!(path.distance_m, 42.0);
    }

    #[tokio::test]
    async fn single_waypoint_is_rejected_before_any_request() {
        let client = MapboxClient::new(Client::new(), "http://127.0.0.1:9", "tok");
        let result = client.walking_route(&[Coordinate::new(59.33, 18.07)]).await;
        assert!(matches!(result, Err(RouteServiceError::TooFewWaypoints(1))));
    }
}
