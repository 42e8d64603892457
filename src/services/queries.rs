//! Read-only query layer over the reporting tables.
//!
//! Every function maps a single SELECT; reconciliation and aggregation stay
//! in the pure modules so they can be tested without a database.

use crate::db::models::{Biorreactor, Cliente, Diagnostico, FechaBim, Registro, Usuario};
use crate::schema;
use diesel::prelude::*;
use diesel::PgConnection;
use log::warn;

/// Failure isolation for degradable reads: a failed SELECT becomes an empty
/// result plus a logged warning, and the page keeps rendering.
pub fn rows_or_empty<T>(source: &str, result: Result<Vec<T>, String>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Query: {} unavailable, treating as empty ({})", source, e);
            Vec::new()
        }
    }
}

pub fn load_clientes(conn: &mut PgConnection) -> Result<Vec<Cliente>, String> {
    use schema::clientes::dsl as C;
    C::clientes
        .select(Cliente::as_select())
        .order(C::nombre.asc())
        .load(conn)
        .map_err(|e| format!("load clientes failed: {}", e))
}

pub fn load_usuarios(conn: &mut PgConnection) -> Result<Vec<Usuario>, String> {
    use schema::usuarios::dsl as U;
    U::usuarios
        .select(Usuario::as_select())
        .load(conn)
        .map_err(|e| format!("load usuarios failed: {}", e))
}

pub fn load_biorreactores(conn: &mut PgConnection) -> Result<Vec<Biorreactor>, String> {
    use schema::biorreactores::dsl as B;
    B::biorreactores
        .select(Biorreactor::as_select())
        .order(B::bim.asc())
        .load(conn)
        .map_err(|e| format!("load biorreactores failed: {}", e))
}

/// Full activity log, newest first. Row order matters: ties in the
/// latest-activity reconciliation fall back to it.
pub fn load_registros(conn: &mut PgConnection) -> Result<Vec<Registro>, String> {
    use schema::registros::dsl as R;
    R::registros
        .select(Registro::as_select())
        .order(R::fecha.desc())
        .load(conn)
        .map_err(|e| format!("load registros failed: {}", e))
}

pub fn load_diagnosticos(conn: &mut PgConnection) -> Result<Vec<Diagnostico>, String> {
    use schema::diagnosticos::dsl as D;
    D::diagnosticos
        .select(Diagnostico::as_select())
        .order(D::fecha.desc())
        .load(conn)
        .map_err(|e| format!("load diagnosticos failed: {}", e))
}

pub fn load_fechas_bims(conn: &mut PgConnection) -> Result<Vec<FechaBim>, String> {
    use schema::fechas_bims::dsl as F;
    F::fechas_bims
        .select(FechaBim::as_select())
        .order(F::fecha.desc())
        .load(conn)
        .map_err(|e| format!("load fechas_bims failed: {}", e))
}

pub fn count_clientes(conn: &mut PgConnection) -> Result<i64, String> {
    use schema::clientes::dsl as C;
    C::clientes
        .count()
        .get_result(conn)
        .map_err(|e| format!("count clientes failed: {}", e))
}

pub fn count_registros(conn: &mut PgConnection) -> Result<i64, String> {
    use schema::registros::dsl as R;
    R::registros
        .count()
        .get_result(conn)
        .map_err(|e| format!("count registros failed: {}", e))
}

pub fn count_diagnosticos(conn: &mut PgConnection) -> Result<i64, String> {
    use schema::diagnosticos::dsl as D;
    D::diagnosticos
        .count()
        .get_result(conn)
        .map_err(|e| format!("count diagnosticos failed: {}", e))
}

pub fn count_fechas_bims(conn: &mut PgConnection) -> Result<i64, String> {
    use schema::fechas_bims::dsl as F;
    F::fechas_bims
        .count()
        .get_result(conn)
        .map_err(|e| format!("count fechas_bims failed: {}", e))
}

/// Per-client self-reported installed-device counts (nulls included; the
/// aggregator treats them as zero).
pub fn reported_installed_counts(conn: &mut PgConnection) -> Result<Vec<Option<i32>>, String> {
    use schema::clientes::dsl as C;
    C::clientes
        .select(C::bims_instalados)
        .load(conn)
        .map_err(|e| format!("load bims_instalados failed: {}", e))
}

/// Raw device identifiers mentioned in the activity log.
pub fn activity_bim_columns(conn: &mut PgConnection) -> Result<Vec<Option<String>>, String> {
    use schema::registros::dsl as R;
    R::registros
        .select(R::bim)
        .load(conn)
        .map_err(|e| format!("load registros.bim failed: {}", e))
}

/// Raw device identifiers mentioned in the scheduled-event log.
pub fn event_bim_columns(conn: &mut PgConnection) -> Result<Vec<Option<String>>, String> {
    use schema::fechas_bims::dsl as F;
    F::fechas_bims
        .select(F::bim)
        .load(conn)
        .map_err(|e| format!("load fechas_bims.bim failed: {}", e))
}
