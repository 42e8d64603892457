//! Diesel model structs for the reporting tables.
//!
//! All of these are read-only from the dashboard's perspective; the `New*`
//! variants exist only for the demo seed.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::clientes)]
pub struct Cliente {
    pub id: i64,
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    /// Self-reported number of installed BIMs; may lag the logs.
    pub bims_instalados: Option<i32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::clientes)]
pub struct NewCliente {
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub bims_instalados: Option<i32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::usuarios)]
pub struct Usuario {
    pub id: i64,
    pub usuario: String,
    pub cliente: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::usuarios)]
pub struct NewUsuario {
    pub usuario: String,
    pub cliente: Option<String>,
}

/// Attribute row for a physical bioreactor unit.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::biorreactores)]
pub struct Biorreactor {
    pub id: i64,
    pub bim: String,
    pub cliente: Option<String>,
    pub especie: Option<String>,
    pub aireador: Option<String>,
    pub altura_m: Option<f64>,
    pub luz_artificial: Option<bool>,
    pub fecha_instalacion: Option<NaiveDate>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::biorreactores)]
pub struct NewBiorreactor {
    pub bim: String,
    pub cliente: Option<String>,
    pub especie: Option<String>,
    pub aireador: Option<String>,
    pub altura_m: Option<f64>,
    pub luz_artificial: Option<bool>,
    pub fecha_instalacion: Option<NaiveDate>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Free-text activity entry pushed by the ingestion flow.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::registros)]
pub struct Registro {
    pub id: i64,
    pub bim: Option<String>,
    pub usuario: Option<String>,
    pub contenido: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::registros)]
pub struct NewRegistro {
    pub bim: Option<String>,
    pub usuario: Option<String>,
    pub contenido: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::diagnosticos)]
pub struct Diagnostico {
    pub id: i64,
    pub usuario: Option<String>,
    pub pregunta: Option<String>,
    pub respuesta: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::diagnosticos)]
pub struct NewDiagnostico {
    pub usuario: Option<String>,
    pub pregunta: Option<String>,
    pub respuesta: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
}

/// Scheduled event (visit, maintenance, harvest) for a BIM.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::fechas_bims)]
pub struct FechaBim {
    pub id: i64,
    pub bim: Option<String>,
    pub evento: Option<String>,
    pub comentario: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::fechas_bims)]
pub struct NewFechaBim {
    pub bim: Option<String>,
    pub evento: Option<String>,
    pub comentario: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
}
