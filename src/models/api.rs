//! Wire types for the two optional external services.
//!
//! Scope: types only, no client code. The directions types follow the OSRM
//! v1 route response; the image documents follow the ingestion flow's
//! document store (`{bim, filename, url, fecha}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =====================
// Directions API (OSRM v1)
// =====================

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRouteResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    /// Total driving distance in meters.
    pub distance: f64,
    /// Total driving duration in seconds.
    pub duration: f64,
    /// Encoded polyline for the full route.
    #[serde(default)]
    pub geometry: Option<String>,
}

/// What the dashboard keeps from a successful directions call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Option<String>,
}

impl From<OsrmRoute> for RouteSummary {
    fn from(r: OsrmRoute) -> Self {
        RouteSummary {
            distance_m: r.distance,
            duration_s: r.duration,
            geometry: r.geometry,
        }
    }
}

// =====================
// Image/telemetry document store
// =====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDoc {
    #[serde(default)]
    pub bim: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Display URL; documents without one are kept but rendered as captions.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub fecha: Option<DateTime<Utc>>,
}
