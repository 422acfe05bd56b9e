use std::collections::HashMap;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::models::{Coordinate, RoadWay};
use crate::snap::{LookupError, RoadLookup};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Road lookup backed by an Overpass API interpreter.
#[derive(Clone)]
pub struct OverpassClient {
    client: Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// Highways within `radius_m` of `center`, recursed down to their nodes.
pub fn highway_query(center: Coordinate, radius_m: f64) -> String {
    format!(
        "[out:json];way(around:{radius_m},{},{})[\"highway\"];(._;>;);out body;",
        center.lat, center.lon
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node { id: u64, lat: f64, lon: f64 },
    Way { id: u64, nodes: Vec<u64> },
    #[serde(other)]
    Other,
}

/// Rebuilds ways from their node references, keeping the order Overpass returned.
///
/// A way that references a node missing from the response is skipped; the
/// ways around it are still usable.
fn collect_ways(body: OverpassResponse) -> Vec<RoadWay> {
    let mut nodes = HashMap::new();
    let mut way_refs = Vec::new();
    for element in body.elements {
        match element {
            Element::Node { id, lat, lon } => {
                nodes.insert(id, Coordinate { lat, lon });
            }
            Element::Way { id, nodes } => way_refs.push((id, nodes)),
            Element::Other => {}
        }
    }

    way_refs
        .into_iter()
        .filter_map(|(way_id, refs)| {
            let resolved = refs
                .iter()
                .map(|id| nodes.get(id).copied())
                .collect::<Option<Vec<_>>>();
            if resolved.is_none() {
                tracing::debug!("skipping way {} with unresolved node references", way_id);
            }
            resolved.map(|nodes| RoadWay { nodes })
        })
        .collect()
}

/// Turns an interpreter reply into road ways, or the error it stands for.
fn read_ways(status: StatusCode, text: String) -> Result<Vec<RoadWay>, LookupError> {
    if !status.is_success() {
        tracing::error!("Overpass returned {}: {}", status, text);
        return Err(LookupError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    let body: OverpassResponse = serde_json::from_str(&text).map_err(|err| {
        tracing::error!("failed to parse Overpass response: {}. Body: {}", err, text);
        LookupError::Malformed(err.to_string())
    })?;
    Ok(collect_ways(body))
}

impl RoadLookup for OverpassClient {
    async fn roads_near(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<RoadWay>, LookupError> {
        let query = highway_query(center, radius_m);
        let url = Url::parse_with_params(&self.endpoint, &[("data", query.as_str())])
            .map_err(|err| LookupError::Malformed(format!("bad Overpass endpoint: {err}")))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        read_ways(status, text)
    }
}
