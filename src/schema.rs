//! Handwritten Diesel schema declarations used by model structs.
//!
//! Migrations define the actual tables and constraints. This module only
//! provides `diesel::table!` declarations so we can derive Insertable/Queryable
//! in a type-safe way without running `diesel print-schema`.

diesel::table! {
    clientes (id) {
        id -> Int8,
        nombre -> Text,
        telefono -> Nullable<Text>,
        direccion -> Nullable<Text>,
        bims_instalados -> Nullable<Int4>,
        lat -> Nullable<Float8>,
        lon -> Nullable<Float8>,
    }
}

diesel::table! {
    usuarios (id) {
        id -> Int8,
        usuario -> Text,
        cliente -> Nullable<Text>,
    }
}

diesel::table! {
    biorreactores (id) {
        id -> Int8,
        bim -> Text,
        cliente -> Nullable<Text>,
        especie -> Nullable<Text>,
        aireador -> Nullable<Text>,
        altura_m -> Nullable<Float8>,
        luz_artificial -> Nullable<Bool>,
        fecha_instalacion -> Nullable<Date>,
        lat -> Nullable<Float8>,
        lon -> Nullable<Float8>,
    }
}

diesel::table! {
    registros (id) {
        id -> Int8,
        bim -> Nullable<Text>,
        usuario -> Nullable<Text>,
        contenido -> Nullable<Text>,
        fecha -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    diagnosticos (id) {
        id -> Int8,
        usuario -> Nullable<Text>,
        pregunta -> Nullable<Text>,
        respuesta -> Nullable<Text>,
        fecha -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    fechas_bims (id) {
        id -> Int8,
        bim -> Nullable<Text>,
        evento -> Nullable<Text>,
        comentario -> Nullable<Text>,
        fecha -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    clientes,
    usuarios,
    biorreactores,
    registros,
    diagnosticos,
    fechas_bims,
);
