//! Contrato entre Map y Reduce: función de partición y formato de registro
//! `clave<TAB>valor`.

use std::collections::BTreeMap;
use std::hash::Hasher;

pub const FIELD_SEPARATOR: char = '\t';

/// Hash FNV-1a de la clave, estable entre procesos y ejecuciones.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// `partition(key) = ihash(key) mod num_reducers`, siempre en `[0, num_reducers)`.
///
/// Con `num_reducers == 0` todo cae en la partición 0.
pub fn partition(key: &str, num_reducers: u32) -> u32 {
    if num_reducers == 0 {
        return 0;
    }
    ihash(key) % num_reducers
}

pub fn format_record(key: &str, value: &str) -> String {
    format!("{key}{FIELD_SEPARATOR}{value}")
}

/// Parsea una línea `clave<TAB>valor`. Las líneas que no tienen exactamente
/// dos campos se descartan (devuelve `None`), sin error.
pub fn parse_record(line: &str) -> Option<(String, String)> {
    let mut fields = line.split(FIELD_SEPARATOR);
    let key = fields.next()?;
    let value = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Parsea el contenido completo de un archivo intermedio.
pub fn parse_records(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(parse_record)
        .collect()
}

/// Agrupa por clave; el `BTreeMap` deja las claves en orden lexicográfico.
pub fn group_by_key<I>(pairs: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in pairs {
        groups.entry(k).or_default().push(v);
    }
    groups
}
