//! The five dashboard summary counts.
//!
//! Device count takes the maximum of two estimates: the per-client
//! self-reported installed totals, and the distinct identifier union across
//! the three tables. The self-reported figure may include devices not yet in
//! any log; the union may include devices with a stale client link. The
//! maximum avoids under-reporting but can over-count when the two estimates
//! diverge for unrelated reasons (see the divergence test below).

use crate::services::catalog::distinct_bim_keys;
use crate::services::queries::{self, rows_or_empty};
use diesel::PgConnection;
use log::warn;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KpiSummary {
    pub clientes: u64,
    pub bims: u64,
    pub diagnosticos: u64,
    pub registros: u64,
    pub eventos: u64,
}

/// `max(sum of self-reported counts, distinct normalized key union)`.
/// Missing or negative self-reported values count as zero.
pub fn device_count(reported_counts: &[Option<i32>], distinct_bims: usize) -> u64 {
    let reported: u64 = reported_counts.iter().map(|c| c.unwrap_or(0).max(0) as u64).sum();
    reported.max(distinct_bims as u64)
}

/// Per-metric failure isolation: a failed count query shows as zero instead
/// of taking the whole summary down.
pub fn count_or_zero(metric: &str, result: Result<i64, String>) -> u64 {
    match result {
        Ok(n) => n.max(0) as u64,
        Err(e) => {
            warn!("KPI: {} unavailable, showing 0 ({})", metric, e);
            0
        }
    }
}

/// Compute all five counts. Never fails: each metric degrades on its own.
pub fn aggregate(conn: &mut PgConnection) -> KpiSummary {
    let reported = rows_or_empty("clientes.bims_instalados", queries::reported_installed_counts(conn));
    let attributes = rows_or_empty("biorreactores", queries::load_biorreactores(conn));
    let activity = rows_or_empty("registros.bim", queries::activity_bim_columns(conn));
    let events = rows_or_empty("fechas_bims.bim", queries::event_bim_columns(conn));
    let distinct = distinct_bim_keys(&attributes, &activity, &events).len();

    KpiSummary {
        clientes: count_or_zero("clientes", queries::count_clientes(conn)),
        bims: device_count(&reported, distinct),
        diagnosticos: count_or_zero("diagnosticos", queries::count_diagnosticos(conn)),
        registros: count_or_zero("registros", queries::count_registros(conn)),
        eventos: count_or_zero("fechas_bims", queries::count_fechas_bims(conn)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_count_takes_the_larger_estimate() {
        // Clients report 3 + 2 installed, logs only mention 4 distinct keys.
        assert_eq!(device_count(&[Some(3), Some(2)], 4), 5);
        // Logs ahead of the self-reported totals.
        assert_eq!(device_count(&[Some(1)], 3), 3);
    }

    #[test]
    fn device_count_nulls_and_negatives_are_zero() {
        assert_eq!(device_count(&[None, Some(-2), Some(1)], 0), 1);
        assert_eq!(device_count(&[], 0), 0);
    }

    #[test]
    fn device_count_divergence_over_counts() {
        // One client reports 6 devices; the logs know 4 distinct keys, only
        // 2 of which belong to that client. The heuristic still shows 6,
        // over-counting relative to either source alone. Documented, not
        // corrected.
        assert_eq!(device_count(&[Some(6)], 4), 6);
    }

    #[test]
    fn failed_metric_degrades_to_zero() {
        assert_eq!(count_or_zero("clientes", Err("table missing".to_string())), 0);
        assert_eq!(count_or_zero("clientes", Ok(7)), 7);
        assert_eq!(count_or_zero("clientes", Ok(-1)), 0);
    }
}
