use std::future::Future;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::models::Coordinate;

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("no geocoding result for \"{0}\"")]
    NotFound(String),
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoding service rejected the request ({status}): {message}")]
    Rejected { status: String, message: String },
    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

/// Free-text location to coordinate; only the best match is used.
pub trait Geocoder: Send + Sync {
    fn locate(&self, query: &str) -> impl Future<Output = Result<Coordinate, GeocodeError>> + Send;
}

#[derive(Clone)]
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeometryDto,
}

#[derive(Debug, Deserialize)]
struct GeometryDto {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn first_match(query: &str, response: GeocodeResponse) -> Result<Coordinate, GeocodeError> {
    if !matches!(response.status.as_str(), "OK" | "ZERO_RESULTS") {
        return Err(GeocodeError::Rejected {
            message: response.error_message.unwrap_or_default(),
            status: response.status,
        });
    }

    response
        .results
        .into_iter()
        .next()
        .map(|result| Coordinate {
            lat: result.geometry.location.lat,
            lon: result.geometry.location.lng,
        })
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))
}

impl Geocoder for GoogleGeocoder {
    async fn locate(&self, query: &str) -> Result<Coordinate, GeocodeError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[("address", query), ("key", self.api_key.as_str())],
        )
        .map_err(|err| GeocodeError::Malformed(format!("bad geocoding endpoint: {err}")))?;

        tracing::debug!("geocoding \"{}\"", query);
        let text = self.client.get(url).send().await?.text().await?;
        let response: GeocodeResponse = serde_json::from_str(&text).map_err(|err| {
            tracing::error!("failed to parse geocoding response: {}. Body: {}", err, text);
            GeocodeError::Malformed(err.to_string())
        })?;

        first_match(query, response)
    }
}
