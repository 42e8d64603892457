//! Deterministic demo seed for empty databases.
//!
//! Mirrors the sample data the early dashboard revisions shipped: a couple
//! of clients around La Serena, three BIMs with coordinates, ten days of
//! hourly sensor-flavored activity entries, daily diagnostics, and a few
//! scheduled visits. Skips entirely when real rows exist.

use crate::db::models::{NewBiorreactor, NewCliente, NewDiagnostico, NewFechaBim, NewRegistro, NewUsuario};
use crate::schema;
use chrono::{Duration, NaiveDate, Timelike, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

const SEED_DAYS: i64 = 10;
const RNG_SEED: u64 = 0x0B13_B10C_7EC4_0A1Bu64;

struct DemoBim {
    bim: &'static str,
    cliente: &'static str,
    usuario: &'static str,
    especie: &'static str,
    aireador: &'static str,
    altura_m: f64,
    luz_artificial: bool,
    lat: f64,
    lon: f64,
}

const DEMO_BIMS: [DemoBim; 3] = [
    DemoBim {
        bim: "1",
        cliente: "Tecnolab Demo",
        usuario: "diego",
        especie: "Chlorella",
        aireador: "difusor",
        altura_m: 1.8,
        luz_artificial: false,
        lat: -29.90,
        lon: -71.26,
    },
    DemoBim {
        bim: "2",
        cliente: "Tecnolab Demo",
        usuario: "diego",
        especie: "Nannochloropsis",
        aireador: "paleta",
        altura_m: 1.2,
        luz_artificial: true,
        lat: -29.92,
        lon: -71.28,
    },
    DemoBim {
        bim: "3",
        cliente: "Tierras Nobles",
        usuario: "marcela",
        especie: "Spirulina",
        aireador: "difusor",
        altura_m: 2.1,
        luz_artificial: false,
        lat: -29.95,
        lon: -71.30,
    },
];

/// Seed demo rows when every table is empty. Returns whether anything was
/// inserted.
pub fn seed_if_empty(conn: &mut PgConnection) -> Result<bool, String> {
    use schema::clientes::dsl as C;

    let existing: i64 = C::clientes
        .count()
        .get_result(conn)
        .map_err(|e| format!("count clientes failed: {}", e))?;
    if existing > 0 {
        info!("Demo seed: skipped, {} client(s) already present", existing);
        return Ok(false);
    }

    insert_clientes(conn)?;
    insert_usuarios(conn)?;
    insert_biorreactores(conn)?;
    let registros = insert_registros(conn)?;
    let diagnosticos = insert_diagnosticos(conn)?;
    let eventos = insert_fechas(conn)?;

    info!(
        "Demo seed: complete (bims={}, registros={}, diagnosticos={}, eventos={})",
        DEMO_BIMS.len(),
        registros,
        diagnosticos,
        eventos
    );
    Ok(true)
}

fn insert_clientes(conn: &mut PgConnection) -> Result<(), String> {
    use schema::clientes::dsl as C;

    let rows = vec![
        NewCliente {
            nombre: "Tecnolab Demo".to_string(),
            telefono: Some("+56 9 1111 1111".to_string()),
            direccion: Some("Parque Industrial, La Serena".to_string()),
            bims_instalados: Some(2),
            lat: Some(-29.91),
            lon: Some(-71.25),
        },
        NewCliente {
            nombre: "Tierras Nobles".to_string(),
            telefono: Some("+56 9 2222 2222".to_string()),
            direccion: Some("Camino Algarrobito km 4".to_string()),
            bims_instalados: Some(1),
            lat: Some(-29.96),
            lon: Some(-71.31),
        },
    ];
    diesel::insert_into(C::clientes)
        .values(&rows)
        .execute(conn)
        .map_err(|e| format!("seed clientes failed: {}", e))?;
    Ok(())
}

fn insert_usuarios(conn: &mut PgConnection) -> Result<(), String> {
    use schema::usuarios::dsl as U;

    let rows = vec![
        NewUsuario {
            usuario: "diego".to_string(),
            cliente: Some("Tecnolab Demo".to_string()),
        },
        NewUsuario {
            usuario: "marcela".to_string(),
            cliente: Some("Tierras Nobles".to_string()),
        },
    ];
    diesel::insert_into(U::usuarios)
        .values(&rows)
        .execute(conn)
        .map_err(|e| format!("seed usuarios failed: {}", e))?;
    Ok(())
}

fn insert_biorreactores(conn: &mut PgConnection) -> Result<(), String> {
    use schema::biorreactores::dsl as B;

    let install = NaiveDate::from_ymd_opt(2024, 11, 15).expect("valid date");
    let rows: Vec<NewBiorreactor> = DEMO_BIMS
        .iter()
        .map(|d| NewBiorreactor {
            bim: d.bim.to_string(),
            cliente: Some(d.cliente.to_string()),
            especie: Some(d.especie.to_string()),
            aireador: Some(d.aireador.to_string()),
            altura_m: Some(d.altura_m),
            luz_artificial: Some(d.luz_artificial),
            fecha_instalacion: Some(install),
            lat: Some(d.lat),
            lon: Some(d.lon),
        })
        .collect();
    diesel::insert_into(B::biorreactores)
        .values(&rows)
        .execute(conn)
        .map_err(|e| format!("seed biorreactores failed: {}", e))?;
    Ok(())
}

fn insert_registros(conn: &mut PgConnection) -> Result<usize, String> {
    use schema::registros::dsl as R;

    let mut rng = SmallRng::seed_from_u64(RNG_SEED);
    let end = Utc::now();
    let start = end - Duration::days(SEED_DAYS);

    let mut rows = Vec::new();
    for d in DEMO_BIMS.iter() {
        let base_ph = rng.random_range(7.2..=8.3);
        let base_temp = rng.random_range(17.0..=23.0);
        let base_o2 = rng.random_range(6.5..=9.5);
        let base_lux = rng.random_range(1200.0..=4500.0);

        let mut ts = start;
        while ts < end {
            // Simple day-night curve on top of each base level.
            let day_fraction = ts.time().num_seconds_from_midnight() as f64 / 86_400.0;
            let diurnal = (day_fraction * 2.0 * PI).sin();

            let ph = base_ph + if diurnal > 0.0 { 0.1 } else { -0.05 } + rng.random_range(-0.03..=0.03);
            let temp = base_temp + diurnal * 3.0 + rng.random_range(-0.4..=0.4);
            let o2 = base_o2 + diurnal * 2.0 + rng.random_range(-0.2..=0.2);
            let lux = (base_lux * (diurnal + 1.0)).max(0.0) + rng.random_range(-80.0..=80.0);

            rows.push(NewRegistro {
                bim: Some(format!("BIM {}", d.bim)),
                usuario: Some(d.usuario.to_string()),
                contenido: Some(format!(
                    "pH {:.2} | temp {:.1} °C | O2 {:.2} mg/L | lux {:.0}",
                    ph,
                    temp,
                    o2,
                    lux.max(0.0)
                )),
                fecha: Some(ts),
            });
            ts += Duration::hours(1);
        }
    }

    diesel::insert_into(R::registros)
        .values(&rows)
        .execute(conn)
        .map_err(|e| format!("seed registros failed: {}", e))
}

fn insert_diagnosticos(conn: &mut PgConnection) -> Result<usize, String> {
    use schema::diagnosticos::dsl as D;

    let mut rng = SmallRng::seed_from_u64(RNG_SEED.rotate_left(17));
    let end = Utc::now();

    let mut rows = Vec::new();
    for d in DEMO_BIMS.iter() {
        for day in 0..SEED_DAYS {
            let fecha = end - Duration::days(day) - Duration::hours(6);
            let respuesta = if rng.random_bool(0.75) {
                "OK".to_string()
            } else {
                "Oxígeno bajo; revisar aireador".to_string()
            };
            rows.push(NewDiagnostico {
                usuario: Some(d.usuario.to_string()),
                pregunta: Some("¿Estado general del cultivo?".to_string()),
                respuesta: Some(respuesta),
                fecha: Some(fecha),
            });
        }
    }

    diesel::insert_into(D::diagnosticos)
        .values(&rows)
        .execute(conn)
        .map_err(|e| format!("seed diagnosticos failed: {}", e))
}

fn insert_fechas(conn: &mut PgConnection) -> Result<usize, String> {
    use schema::fechas_bims::dsl as F;

    let now = Utc::now();
    let rows = vec![
        NewFechaBim {
            bim: Some("1".to_string()),
            evento: Some("cosecha".to_string()),
            comentario: Some("Cosecha parcial programada".to_string()),
            fecha: Some(now + Duration::days(3)),
        },
        NewFechaBim {
            bim: Some("2".to_string()),
            evento: Some("mantencion".to_string()),
            comentario: Some("Cambio de difusor".to_string()),
            fecha: Some(now + Duration::days(7)),
        },
        NewFechaBim {
            bim: Some("3".to_string()),
            evento: Some("visita".to_string()),
            comentario: Some("Visita técnica mensual".to_string()),
            fecha: Some(now + Duration::days(10)),
        },
    ];

    diesel::insert_into(F::fechas_bims)
        .values(&rows)
        .execute(conn)
        .map_err(|e| format!("seed fechas_bims failed: {}", e))
}
