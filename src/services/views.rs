//! Request handlers: one per dashboard page, each returning a serializable
//! view model. Computation is split from presentation: assembly functions
//! are pure and the thin handlers around them run the queries, the TTL
//! cache, and the optional external calls.

use crate::cache::TtlCache;
use crate::client::{DirectionsClient, ImageStoreClient};
use crate::db::models::{Diagnostico, FechaBim, Registro};
use crate::models::api::{ImageDoc, RouteSummary};
use crate::services::catalog::{self, CatalogRow, normalize_bim_key};
use crate::services::kpi::{self, KpiSummary};
use crate::services::queries::{self, rows_or_empty};
use crate::services::routing::{self, Point};
use crate::state::Page;
use diesel::PgConnection;
use log::info;
use serde::Serialize;

/// How many recent log rows a detail page shows.
const RECENT_LIMIT: usize = 50;

const SNAPSHOT_KEY: &str = "catalog+kpis";

/// Catalog and KPIs together: both come from the same tables and expire
/// together.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub kpis: KpiSummary,
    pub catalog: Vec<CatalogRow>,
}

pub type SnapshotCache = TtlCache<String, Snapshot>;

fn compute_snapshot(conn: &mut PgConnection) -> Snapshot {
    let attributes = rows_or_empty("biorreactores", queries::load_biorreactores(conn));
    let registros = rows_or_empty("registros", queries::load_registros(conn));
    let eventos = rows_or_empty("fechas_bims", queries::load_fechas_bims(conn));
    let usuarios = rows_or_empty("usuarios", queries::load_usuarios(conn));

    let activity_bims: Vec<Option<String>> = registros.iter().map(|r| r.bim.clone()).collect();
    let event_bims: Vec<Option<String>> = eventos.iter().map(|f| f.bim.clone()).collect();
    let latest_user = catalog::latest_user_by_bim(&registros);
    let user_client = catalog::client_by_user(&usuarios);

    let rows = catalog::build_catalog(&attributes, &activity_bims, &event_bims, &latest_user, &user_client);
    let kpis = kpi::aggregate(conn);
    info!("Snapshot: {} catalog row(s), {} client(s)", rows.len(), kpis.clientes);
    Snapshot { kpis, catalog: rows }
}

pub fn load_snapshot(conn: &mut PgConnection, cache: &SnapshotCache) -> Snapshot {
    cache.get_or_insert_with(SNAPSHOT_KEY.to_string(), || compute_snapshot(conn))
}

// =====================
// Home
// =====================

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub kpis: KpiSummary,
    pub catalog: Vec<CatalogRow>,
    /// Informational only; an empty catalog is a normal state.
    pub aviso: Option<String>,
}

pub fn home_view_from_parts(snapshot: Snapshot) -> HomeView {
    let aviso = if snapshot.catalog.is_empty() {
        Some("no BIMs known yet; waiting on the upstream ingestion flow".to_string())
    } else {
        None
    };
    HomeView {
        kpis: snapshot.kpis,
        catalog: snapshot.catalog,
        aviso,
    }
}

pub fn home_view(conn: &mut PgConnection, cache: &SnapshotCache) -> HomeView {
    home_view_from_parts(load_snapshot(conn, cache))
}

// =====================
// BIM detail
// =====================

#[derive(Debug, Clone, Serialize)]
pub struct BimView {
    pub bim: String,
    /// Attribute card when the device has a row in `biorreactores`.
    pub ficha: Option<CatalogRow>,
    pub registros: Vec<Registro>,
    pub diagnosticos: Vec<Diagnostico>,
    pub eventos: Vec<FechaBim>,
    pub imagenes: Vec<ImageDoc>,
    pub notas: Vec<String>,
}

/// Pure detail-page assembly. Diagnostics carry only a user, so they attach
/// to the device via that user's most recent activity entry.
pub fn bim_view_from_parts(
    raw_key: &str,
    catalog: &[CatalogRow],
    registros: Vec<Registro>,
    diagnosticos: Vec<Diagnostico>,
    eventos: Vec<FechaBim>,
) -> BimView {
    let key = normalize_bim_key(Some(raw_key));
    let ficha = catalog.iter().find(|r| r.bim == key).cloned();

    let device_by_user = catalog::latest_bim_by_user(&registros);

    let mut own_registros: Vec<Registro> = registros
        .into_iter()
        .filter(|r| normalize_bim_key(r.bim.as_deref()) == key)
        .collect();
    own_registros.sort_by(|a, b| b.fecha.cmp(&a.fecha));
    own_registros.truncate(RECENT_LIMIT);

    let mut own_diagnosticos: Vec<Diagnostico> = diagnosticos
        .into_iter()
        .filter(|d| {
            d.usuario
                .as_deref()
                .map(str::trim)
                .and_then(|u| device_by_user.get(u))
                .is_some_and(|bim| *bim == key)
        })
        .collect();
    own_diagnosticos.sort_by(|a, b| b.fecha.cmp(&a.fecha));
    own_diagnosticos.truncate(RECENT_LIMIT);

    let mut own_eventos: Vec<FechaBim> = eventos
        .into_iter()
        .filter(|f| normalize_bim_key(f.bim.as_deref()) == key)
        .collect();
    own_eventos.sort_by(|a, b| b.fecha.cmp(&a.fecha));

    let mut notas = Vec::new();
    match &ficha {
        None => notas.push("no attribute row for this BIM; identity inferred from the logs".to_string()),
        Some(row) if row.lat.is_none() || row.lon.is_none() => {
            notas.push("no coordinates registered for this BIM".to_string());
        }
        Some(_) => {}
    }
    if own_registros.is_empty() {
        notas.push("no activity entries for this BIM yet".to_string());
    }

    BimView {
        bim: key,
        ficha,
        registros: own_registros,
        diagnosticos: own_diagnosticos,
        eventos: own_eventos,
        imagenes: Vec::new(),
        notas,
    }
}

pub fn bim_view(
    conn: &mut PgConnection,
    cache: &SnapshotCache,
    images: Option<&ImageStoreClient>,
    raw_key: &str,
) -> BimView {
    let snapshot = load_snapshot(conn, cache);
    let registros = rows_or_empty("registros", queries::load_registros(conn));
    let diagnosticos = rows_or_empty("diagnosticos", queries::load_diagnosticos(conn));
    let eventos = rows_or_empty("fechas_bims", queries::load_fechas_bims(conn));

    let mut view = bim_view_from_parts(raw_key, &snapshot.catalog, registros, diagnosticos, eventos);

    match images {
        Some(client) => match client.images_for_bim(&view.bim) {
            Ok(docs) => view.imagenes = docs,
            Err(e) => view.notas.push(format!("image store unavailable: {}", e)),
        },
        None => view.notas.push("image store not configured".to_string()),
    }
    view
}

// =====================
// Route plan
// =====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub bim: String,
    pub cliente: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    /// Stops in suggested visiting order (nearest-neighbor from the first
    /// selected device).
    pub paradas: Vec<RouteStop>,
    /// Straight-line (haversine) length of the suggested order, meters.
    pub distancia_haversine_m: f64,
    /// Selected keys that had no usable coordinates in the catalog.
    pub sin_coordenadas: Vec<String>,
    pub directions: Option<RouteSummary>,
    pub directions_error: Option<String>,
}

/// Resolve selected keys against the catalog, keeping selection order.
/// Unknown keys and rows without coordinates go to the second list.
pub fn plan_stops(keys: &[String], catalog: &[CatalogRow]) -> (Vec<RouteStop>, Vec<String>) {
    let mut stops = Vec::new();
    let mut missing = Vec::new();
    for raw in keys {
        let key = normalize_bim_key(Some(raw));
        if key.is_empty() {
            continue;
        }
        let located = catalog.iter().find(|r| r.bim == key).and_then(|r| {
            let lat = r.lat?;
            let lon = r.lon?;
            Some(RouteStop {
                bim: r.bim.clone(),
                cliente: r.cliente.clone(),
                lat,
                lon,
            })
        });
        match located {
            Some(stop) => stops.push(stop),
            None => missing.push(key),
        }
    }
    (stops, missing)
}

/// Suggested visiting order: nearest-neighbor from the first resolved stop.
pub fn order_stops(stops: Vec<RouteStop>) -> Vec<RouteStop> {
    let points: Vec<Point> = stops.iter().map(|s| Point { lat: s.lat, lon: s.lon }).collect();
    routing::nearest_neighbor_order(&points)
        .into_iter()
        .map(|i| stops[i].clone())
        .collect()
}

/// Pure route-page assembly. `paradas` arrive already in visiting order;
/// `directions` is the outcome of the external call, if one was attempted.
pub fn route_view_from_parts(
    paradas: Vec<RouteStop>,
    sin_coordenadas: Vec<String>,
    directions: Option<Result<RouteSummary, String>>,
) -> RouteView {
    let points: Vec<Point> = paradas.iter().map(|s| Point { lat: s.lat, lon: s.lon }).collect();
    let in_order: Vec<usize> = (0..points.len()).collect();
    let distancia = routing::tour_length_m(&points, &in_order);

    let (directions, directions_error) = match directions {
        Some(Ok(summary)) => (Some(summary), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    RouteView {
        paradas,
        distancia_haversine_m: distancia,
        sin_coordenadas,
        directions,
        directions_error,
    }
}

pub fn route_view(
    conn: &mut PgConnection,
    cache: &SnapshotCache,
    directions: Option<&DirectionsClient>,
    keys: &[String],
) -> RouteView {
    let snapshot = load_snapshot(conn, cache);
    let (stops, missing) = plan_stops(keys, &snapshot.catalog);
    let paradas = order_stops(stops);

    let outcome = match directions {
        Some(client) if paradas.len() >= 2 => {
            let points: Vec<Point> = paradas.iter().map(|s| Point { lat: s.lat, lon: s.lon }).collect();
            Some(client.driving_route(&points).map_err(|e| e.to_string()))
        }
        _ => None,
    };

    route_view_from_parts(paradas, missing, outcome)
}

// =====================
// Dispatch
// =====================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum DashboardView {
    Home(HomeView),
    Bim(BimView),
    Route(RouteView),
}

pub fn render(
    conn: &mut PgConnection,
    cache: &SnapshotCache,
    directions: Option<&DirectionsClient>,
    images: Option<&ImageStoreClient>,
    page: &Page,
) -> DashboardView {
    match page {
        Page::Home => DashboardView::Home(home_view(conn, cache)),
        Page::Bim(key) => DashboardView::Bim(bim_view(conn, cache, images, key)),
        Page::Route(keys) => DashboardView::Route(route_view(conn, cache, directions, keys)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(cliente: &str, bim: &str, coords: Option<(f64, f64)>) -> CatalogRow {
        CatalogRow {
            cliente: cliente.to_string(),
            bim: bim.to_string(),
            especie: None,
            aireador: None,
            altura_m: None,
            luz_artificial: None,
            fecha_instalacion: None,
            lat: coords.map(|c| c.0),
            lon: coords.map(|c| c.1),
        }
    }

    fn registro(bim: &str, usuario: &str, hour: u32) -> Registro {
        Registro {
            id: 0,
            bim: Some(bim.to_string()),
            usuario: Some(usuario.to_string()),
            contenido: Some("pH 7.8".to_string()),
            fecha: Some(Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()),
        }
    }

    fn snapshot(catalog: Vec<CatalogRow>) -> Snapshot {
        Snapshot {
            kpis: KpiSummary {
                clientes: 1,
                bims: catalog.len() as u64,
                diagnosticos: 0,
                registros: 0,
                eventos: 0,
            },
            catalog,
        }
    }

    #[test]
    fn home_flags_an_empty_catalog() {
        let view = home_view_from_parts(snapshot(vec![]));
        assert!(view.aviso.is_some());

        let view = home_view_from_parts(snapshot(vec![row("X", "1", None)]));
        assert!(view.aviso.is_none());
    }

    #[test]
    fn bim_detail_filters_by_normalized_key() {
        let catalog = vec![row("X", "1", Some((-29.9, -71.3)))];
        let registros = vec![registro("BIM 1", "ana", 8), registro("2", "beto", 9)];
        let view = bim_view_from_parts("BIM 1", &catalog, registros, vec![], vec![]);
        assert_eq!(view.bim, "1");
        assert!(view.ficha.is_some());
        assert_eq!(view.registros.len(), 1);
    }

    #[test]
    fn diagnostics_attach_through_latest_activity_user() {
        let catalog = vec![row("X", "1", None), row("X", "2", None)];
        // Ana's newest entry is on BIM 2, so her diagnostics belong there.
        let registros = vec![registro("1", "ana", 8), registro("2", "ana", 15)];
        let diags = vec![Diagnostico {
            id: 1,
            usuario: Some("ana".to_string()),
            pregunta: Some("color?".to_string()),
            respuesta: Some("verde intenso".to_string()),
            fecha: Some(Utc.with_ymd_and_hms(2025, 3, 1, 16, 0, 0).unwrap()),
        }];

        let view = bim_view_from_parts("1", &catalog, registros.clone(), diags.clone(), vec![]);
        assert!(view.diagnosticos.is_empty());

        let view = bim_view_from_parts("2", &catalog, registros, diags, vec![]);
        assert_eq!(view.diagnosticos.len(), 1);
    }

    #[test]
    fn unknown_bim_still_renders_with_notes() {
        let view = bim_view_from_parts("99", &[], vec![], vec![], vec![]);
        assert_eq!(view.bim, "99");
        assert!(view.ficha.is_none());
        assert!(!view.notas.is_empty());
    }

    #[test]
    fn plan_stops_splits_unlocated_keys() {
        let catalog = vec![row("X", "1", Some((-29.9, -71.3))), row("X", "2", None)];
        let keys = vec!["BIM 1".to_string(), "2".to_string(), "3".to_string()];
        let (stops, missing) = plan_stops(&keys, &catalog);
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].bim, "1");
        assert_eq!(missing, vec!["2".to_string(), "3".to_string()]);
    }

    #[test]
    fn route_orders_stops_nearest_first() {
        let stops = vec![
            RouteStop { bim: "a".into(), cliente: "X".into(), lat: 0.0, lon: 0.0 },
            RouteStop { bim: "far".into(), cliente: "X".into(), lat: 0.0, lon: 2.0 },
            RouteStop { bim: "near".into(), cliente: "X".into(), lat: 0.0, lon: 0.5 },
        ];
        let view = route_view_from_parts(order_stops(stops), vec![], None);
        let order: Vec<&str> = view.paradas.iter().map(|s| s.bim.as_str()).collect();
        assert_eq!(order, vec!["a", "near", "far"]);
        assert!(view.distancia_haversine_m > 0.0);
        assert!(view.directions.is_none() && view.directions_error.is_none());
    }

    #[test]
    fn directions_failure_is_reported_inline() {
        let stops = vec![
            RouteStop { bim: "a".into(), cliente: "X".into(), lat: 0.0, lon: 0.0 },
            RouteStop { bim: "b".into(), cliente: "X".into(), lat: 0.0, lon: 1.0 },
        ];
        let view = route_view_from_parts(stops, vec![], Some(Err("http 503: down".to_string())));
        assert_eq!(view.directions_error.as_deref(), Some("http 503: down"));
        assert!(view.directions.is_none());
        assert_eq!(view.paradas.len(), 2);
    }
}
