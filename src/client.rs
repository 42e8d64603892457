//! Blocking HTTP clients for the two optional external services.
//!
//! - Directions: OSRM-style `GET /route/v1/driving/{coords}` for a
//!   suggested visiting order's distance/duration/geometry.
//! - Image store: `GET /images?bim={key}` returning telemetry documents
//!   with display URLs.
//!
//! Both use `ureq` (no async) and decode JSON through `serde_path_to_error`
//! so a schema drift names the offending field. Neither failure is fatal to
//! a page; callers degrade inline.

use crate::models::api::{ImageDoc, OsrmRouteResponse, RouteSummary};
use crate::services::routing::Point;
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::Agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum ApiClientError {
    Transport(String),
    Http { status: u16, message: String },
    Json(String),
    /// The service answered 200 but rejected the request in-body.
    Service(String),
}

impl core::fmt::Display for ApiClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApiClientError::Transport(s) => write!(f, "transport error: {}", s),
            ApiClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            ApiClientError::Json(s) => write!(f, "json error: {}", s),
            ApiClientError::Service(s) => write!(f, "service error: {}", s),
        }
    }
}

impl std::error::Error for ApiClientError {}

fn new_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .into()
}

fn get_json<T: DeserializeOwned>(agent: &Agent, url: &str, query: &[(&str, &str)]) -> Result<T, ApiClientError> {
    let mut req = agent.get(url).header("Accept", "application/json");
    for (k, v) in query {
        req = req.query(*k, *v);
    }

    let mut resp = req.call().map_err(|e| ApiClientError::Transport(e.to_string()))?;
    let status: StatusCode = resp.status();
    let body = resp
        .body_mut()
        .read_to_string()
        .map_err(|e| ApiClientError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(ApiClientError::Http {
            status: status.as_u16(),
            message: body,
        });
    }

    let mut de = serde_json::Deserializer::from_str(&body);
    serde_path_to_error::deserialize(&mut de).map_err(|e| ApiClientError::Json(e.to_string()))
}

pub struct DirectionsClient {
    agent: Agent,
    base_url: String,
}

impl DirectionsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        DirectionsClient {
            agent: new_agent(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Total distance/duration/geometry for driving the points in the given
    /// order. The caller decides the order; this does no reordering.
    pub fn driving_route(&self, stops: &[Point]) -> Result<RouteSummary, ApiClientError> {
        if stops.len() < 2 {
            return Err(ApiClientError::Service("a route needs at least two stops".to_string()));
        }
        let coords = stops
            .iter()
            .map(|p| format!("{:.6},{:.6}", p.lon, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        let url = format!("{}/route/v1/driving/{}", self.base_url, coords);
        let parsed: OsrmRouteResponse = get_json(&self.agent, &url, &[("overview", "full"), ("alternatives", "false")])?;

        if parsed.code != "Ok" {
            let detail = parsed.message.unwrap_or_else(|| parsed.code.clone());
            return Err(ApiClientError::Service(detail));
        }
        parsed
            .routes
            .into_iter()
            .next()
            .map(RouteSummary::from)
            .ok_or_else(|| ApiClientError::Service("response contained no routes".to_string()))
    }
}

pub struct ImageStoreClient {
    agent: Agent,
    base_url: String,
}

impl ImageStoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ImageStoreClient {
            agent: new_agent(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Most recent image documents for a device, newest first.
    pub fn images_for_bim(&self, bim_key: &str) -> Result<Vec<ImageDoc>, ApiClientError> {
        let url = format!("{}/images", self.base_url);
        let mut docs: Vec<ImageDoc> = get_json(&self.agent, &url, &[("bim", bim_key), ("limit", "20")])?;
        docs.sort_by(|a, b| b.fecha.cmp(&a.fecha));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed from a live OSRM response.
    const ROUTE_FIXTURE: &str = r#"{
        "code": "Ok",
        "routes": [
            {"distance": 18234.7, "duration": 1620.4, "geometry": "_p~iF~ps|U_ulLnnqC"}
        ],
        "waypoints": [{"name": "Ruta 5"}, {"name": "Camino Algarrobito"}]
    }"#;

    #[test]
    fn decodes_route_response() {
        let mut de = serde_json::Deserializer::from_str(ROUTE_FIXTURE);
        let parsed: OsrmRouteResponse = serde_path_to_error::deserialize(&mut de).expect("fixture parses");
        assert_eq!(parsed.code, "Ok");
        let summary = RouteSummary::from(parsed.routes.into_iter().next().unwrap());
        assert_eq!(summary.distance_m, 18234.7);
        assert_eq!(summary.geometry.as_deref(), Some("_p~iF~ps|U_ulLnnqC"));
    }

    #[test]
    fn rejected_code_carries_the_message() {
        let raw = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        let mut de = serde_json::Deserializer::from_str(raw);
        let parsed: OsrmRouteResponse = serde_path_to_error::deserialize(&mut de).expect("fixture parses");
        assert_eq!(parsed.code, "NoRoute");
        assert!(parsed.routes.is_empty());
    }

    #[test]
    fn decodes_image_documents() {
        let raw = r#"[
            {"bim": "7", "filename": "foto_1.jpg", "url": "https://img.example/foto_1.jpg", "fecha": "2025-03-01T12:00:00Z"},
            {"bim": "7", "filename": "foto_2.jpg"}
        ]"#;
        let mut de = serde_json::Deserializer::from_str(raw);
        let docs: Vec<ImageDoc> = serde_path_to_error::deserialize(&mut de).expect("fixture parses");
        assert_eq!(docs.len(), 2);
        assert!(docs[1].url.is_none());
    }

    #[test]
    fn too_few_stops_is_a_service_error() {
        let client = DirectionsClient::new("http://localhost:5000");
        let err = client.driving_route(&[Point { lat: 0.0, lon: 0.0 }]).unwrap_err();
        assert!(matches!(err, ApiClientError::Service(_)));
    }
}
