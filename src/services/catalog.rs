//! Catalog reconciliation: which BIMs exist, and which client owns each one.
//!
//! The attribute table (`biorreactores`) is authoritative when it has rows.
//! When it is empty the catalog falls back to the device identifiers seen in
//! the activity log and the scheduled-event log, attributing each one to the
//! client of the user behind its most recent activity entry.
//!
//! Everything here is pure; `services::queries` feeds it from the database.

use crate::db::models::{Biorreactor, Registro, Usuario};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder client shown when no owner can be resolved for a BIM.
pub const SENTINEL_CLIENT: &str = "(none)";

/// Canonical form of a raw BIM identifier.
///
/// Trims whitespace, strips leading case-insensitive `bim` tokens (and the
/// whitespace after each) until none remains, lowercases the rest, and maps
/// the literal "empty" tokens the forms produce to the empty string. Absent
/// input maps to the empty string as well. Idempotent for all inputs.
pub fn normalize_bim_key(raw: Option<&str>) -> String {
    let mut rest = match raw {
        Some(s) => s.trim(),
        None => return String::new(),
    };

    // `get` keeps the prefix check on char boundaries; raw identifiers are
    // free text and may open with multi-byte characters.
    while rest.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("bim")) {
        rest = rest[3..].trim_start();
    }

    let key = rest.to_lowercase();
    match key.as_str() {
        "none" | "null" | "ninguno" => String::new(),
        _ => key,
    }
}

/// One reconciled catalog entry: a known BIM with best-effort attribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRow {
    pub cliente: String,
    pub bim: String,
    pub especie: Option<String>,
    pub aireador: Option<String>,
    pub altura_m: Option<f64>,
    pub luz_artificial: Option<bool>,
    pub fecha_instalacion: Option<NaiveDate>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl CatalogRow {
    fn bare(cliente: String, bim: String) -> Self {
        CatalogRow {
            cliente,
            bim,
            especie: None,
            aireador: None,
            altura_m: None,
            luz_artificial: None,
            fecha_instalacion: None,
            lat: None,
            lon: None,
        }
    }
}

/// Map each BIM key to the user behind its most recent activity entry.
///
/// Ties on equal timestamps keep the first row encountered, i.e. the
/// storage engine's row order. Entries without a user are skipped.
pub fn latest_user_by_bim(registros: &[Registro]) -> BTreeMap<String, String> {
    let mut latest = BTreeMap::new();
    for r in registros {
        let key = normalize_bim_key(r.bim.as_deref());
        if key.is_empty() {
            continue;
        }
        let Some(user) = r.usuario.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        let newer = match latest.get(&key) {
            Some((existing_fecha, _)) => r.fecha > *existing_fecha,
            None => true,
        };
        if newer {
            latest.insert(key, (r.fecha, user.to_string()));
        }
    }
    latest.into_iter().map(|(k, (_, user))| (k, user)).collect()
}

/// Map each user to the BIM key of their most recent activity entry.
/// Diagnostics only carry a user, so this is how they attach to a device.
/// Same tie-break as [`latest_user_by_bim`].
pub fn latest_bim_by_user(registros: &[Registro]) -> BTreeMap<String, String> {
    let mut latest = BTreeMap::new();
    for r in registros {
        let key = normalize_bim_key(r.bim.as_deref());
        if key.is_empty() {
            continue;
        }
        let Some(user) = r.usuario.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        let newer = match latest.get(user) {
            Some((existing_fecha, _)) => r.fecha > *existing_fecha,
            None => true,
        };
        if newer {
            latest.insert(user.to_string(), (r.fecha, key));
        }
    }
    latest.into_iter().map(|(user, (_, key))| (user, key)).collect()
}

/// Map each user to their client name, trimmed. Users without a client are
/// left out so lookups fall through to the sentinel.
pub fn client_by_user(usuarios: &[Usuario]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for u in usuarios {
        let user = u.usuario.trim();
        if user.is_empty() {
            continue;
        }
        if let Some(cliente) = u.cliente.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            map.insert(user.to_string(), cliente.to_string());
        }
    }
    map
}

/// Distinct normalized BIM keys across the attribute table, the activity
/// log, and the scheduled-event log. Also feeds the KPI device count.
pub fn distinct_bim_keys(
    attributes: &[Biorreactor],
    activity_bims: &[Option<String>],
    event_bims: &[Option<String>],
) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for raw in attributes
        .iter()
        .map(|b| Some(b.bim.clone()))
        .chain(activity_bims.iter().cloned())
        .chain(event_bims.iter().cloned())
    {
        let key = normalize_bim_key(raw.as_deref());
        if !key.is_empty() {
            keys.insert(key);
        }
    }
    keys
}

/// Build the reconciled catalog from the three record sources.
///
/// Empty inputs degrade to an empty catalog; callers treat that as "nothing
/// known yet", not an error. Every returned row has a non-empty key and a
/// non-empty client name (possibly [`SENTINEL_CLIENT`]).
pub fn build_catalog(
    attributes: &[Biorreactor],
    activity_bims: &[Option<String>],
    event_bims: &[Option<String>],
    latest_user: &BTreeMap<String, String>,
    user_client: &BTreeMap<String, String>,
) -> Vec<CatalogRow> {
    let mut rows = Vec::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    if !attributes.is_empty() {
        for b in attributes {
            let bim = normalize_bim_key(Some(&b.bim));
            if bim.is_empty() {
                continue;
            }
            let cliente = b
                .cliente
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(SENTINEL_CLIENT)
                .to_string();
            if !seen.insert((cliente.clone(), bim.clone())) {
                continue;
            }
            rows.push(CatalogRow {
                cliente,
                bim,
                especie: b.especie.clone(),
                aireador: b.aireador.clone(),
                altura_m: b.altura_m,
                luz_artificial: b.luz_artificial,
                fecha_instalacion: b.fecha_instalacion,
                lat: b.lat,
                lon: b.lon,
            });
        }
        return rows;
    }

    // Fallback: the attribute table has nothing, so the logs are all we know.
    let mut keys = BTreeSet::new();
    for raw in activity_bims.iter().chain(event_bims.iter()) {
        let key = normalize_bim_key(raw.as_deref());
        if !key.is_empty() {
            keys.insert(key);
        }
    }

    for bim in keys {
        let cliente = latest_user
            .get(&bim)
            .and_then(|user| user_client.get(user))
            .cloned()
            .unwrap_or_else(|| SENTINEL_CLIENT.to_string());
        if seen.insert((cliente.clone(), bim.clone())) {
            rows.push(CatalogRow::bare(cliente, bim));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn attr(bim: &str, cliente: Option<&str>) -> Biorreactor {
        Biorreactor {
            id: 0,
            bim: bim.to_string(),
            cliente: cliente.map(str::to_string),
            especie: Some("Chlorella".to_string()),
            aireador: None,
            altura_m: Some(1.8),
            luz_artificial: Some(false),
            fecha_instalacion: None,
            lat: Some(-29.9),
            lon: Some(-71.26),
        }
    }

    fn registro(bim: &str, usuario: &str, hour: u32) -> Registro {
        Registro {
            id: 0,
            bim: Some(bim.to_string()),
            usuario: Some(usuario.to_string()),
            contenido: None,
            fecha: Some(Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()),
        }
    }

    #[test]
    fn normalizer_canonical_forms() {
        assert_eq!(normalize_bim_key(Some("BIM 007")), "007");
        assert_eq!(normalize_bim_key(Some("  Bim12 ")), "12");
        assert_eq!(normalize_bim_key(Some("bim\t42")), "42");
        assert_eq!(normalize_bim_key(None), "");
        assert_eq!(normalize_bim_key(Some("")), "");
        assert_eq!(normalize_bim_key(Some("  ")), "");
    }

    #[test]
    fn normalizer_empty_tokens() {
        assert_eq!(normalize_bim_key(Some("none")), "");
        assert_eq!(normalize_bim_key(Some("NULL")), "");
        assert_eq!(normalize_bim_key(Some("Ninguno")), "");
    }

    #[test]
    fn normalizer_handles_multibyte_input() {
        // Byte 3 falls inside 'á'; a byte slice here would panic.
        assert_eq!(normalize_bim_key(Some("ñá7")), "ñá7");
        assert_eq!(normalize_bim_key(Some("  Ñandú ")), "ñandú");
        assert_eq!(normalize_bim_key(Some("BIM ñ2")), "ñ2");
    }

    #[test]
    fn normalizer_strips_repeated_prefixes() {
        assert_eq!(normalize_bim_key(Some("bim bim 3")), "3");
        assert_eq!(normalize_bim_key(Some("BIMbim7")), "7");
    }

    #[test]
    fn normalizer_is_idempotent() {
        for raw in ["BIM 007", "  Bim12 ", "7", "ninguno", "Estanque A", "", "bim bim 3", "ñá7"] {
            let once = normalize_bim_key(Some(raw));
            assert_eq!(normalize_bim_key(Some(&once)), once, "input {:?}", raw);
        }
    }

    #[test]
    fn attribute_rows_are_authoritative() {
        let attrs = vec![attr("BIM 1", Some("Tierras Nobles")), attr("bim 2", Some(" Tecnolab Demo "))];
        // Activity mentions a third device, but the attribute table wins.
        let activity = vec![Some("bim 3".to_string())];
        let rows = build_catalog(&attrs, &activity, &[], &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bim, "1");
        assert_eq!(rows[0].cliente, "Tierras Nobles");
        assert_eq!(rows[1].cliente, "Tecnolab Demo");
        assert_eq!(rows[0].especie.as_deref(), Some("Chlorella"));
    }

    #[test]
    fn attribute_duplicates_collapse() {
        let attrs = vec![attr("BIM 5", Some("X")), attr(" bim5", Some("X")), attr("5", Some("X"))];
        let rows = build_catalog(&attrs, &[], &[], &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bim, "5");
    }

    #[test]
    fn missing_client_gets_sentinel() {
        let attrs = vec![attr("1", None), attr("2", Some("   "))];
        let rows = build_catalog(&attrs, &[], &[], &BTreeMap::new(), &BTreeMap::new());
        assert!(rows.iter().all(|r| r.cliente == SENTINEL_CLIENT));
    }

    #[test]
    fn empty_sources_give_empty_catalog() {
        let rows = build_catalog(&[], &[], &[], &BTreeMap::new(), &BTreeMap::new());
        assert!(rows.is_empty());
    }

    #[test]
    fn fallback_unions_logs_and_resolves_client() {
        let registros = vec![registro("BIM 1", "diego", 10), registro("bim1", "diego", 12)];
        let usuarios = vec![Usuario {
            id: 1,
            usuario: "diego".to_string(),
            cliente: Some("Tierras Nobles".to_string()),
        }];
        let latest = latest_user_by_bim(&registros);
        let clients = client_by_user(&usuarios);

        let activity: Vec<Option<String>> = registros.iter().map(|r| r.bim.clone()).collect();
        let events = vec![Some("BIM 2".to_string())];
        let rows = build_catalog(&[], &activity, &events, &latest, &clients);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bim, "1");
        assert_eq!(rows[0].cliente, "Tierras Nobles");
        // No activity for BIM 2, so no attribution.
        assert_eq!(rows[1].bim, "2");
        assert_eq!(rows[1].cliente, SENTINEL_CLIENT);
        assert!(rows.iter().all(|r| r.especie.is_none() && r.lat.is_none()));
    }

    #[test]
    fn fallback_spelling_variants_collapse_to_one_row() {
        // Same device written three ways by the same user.
        let activity = vec![
            Some("BIM 1".to_string()),
            Some("bim1".to_string()),
            Some(" 1 ".to_string()),
        ];
        let rows = build_catalog(&[], &activity, &[], &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bim, "1");
    }

    #[test]
    fn latest_activity_prefers_newest_and_keeps_row_order_on_ties() {
        let mut rows = vec![registro("1", "ana", 8), registro("1", "beto", 14)];
        let latest = latest_user_by_bim(&rows);
        assert_eq!(latest.get("1").map(String::as_str), Some("beto"));

        // Equal timestamps: first row wins.
        rows = vec![registro("2", "carla", 9), registro("2", "dani", 9)];
        let latest = latest_user_by_bim(&rows);
        assert_eq!(latest.get("2").map(String::as_str), Some("carla"));
    }

    #[test]
    fn latest_bim_per_user_follows_newest_entry() {
        let rows = vec![registro("1", "ana", 8), registro("2", "ana", 15), registro("3", "beto", 9)];
        let latest = latest_bim_by_user(&rows);
        assert_eq!(latest.get("ana").map(String::as_str), Some("2"));
        assert_eq!(latest.get("beto").map(String::as_str), Some("3"));
    }

    #[test]
    fn distinct_keys_union_all_three_sources() {
        let attrs = vec![attr("BIM 1", Some("X"))];
        let activity = vec![Some("bim1".to_string()), Some("2".to_string()), None];
        let events = vec![Some("BIM 3".to_string()), Some("ninguno".to_string())];
        let keys = distinct_bim_keys(&attrs, &activity, &events);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }
}
