use gdal::vector::{Layer, LayerAccess};
use log::warn;
use regex::Regex;
use std::collections::HashSet;

use crate::error::{EliminateError, Result};
use crate::node::Fid;

/// Drivers whose attribute-filter dialect is handed to an SQL engine rather
/// than the generic OGR evaluator. These do not know the OGR_GEOM_AREA
/// special field.
const SQL_DRIVERS: &[&str] = &["SQLite", "GPKG"];

/// Substitute the `OGR_GEOM_AREA` special field with `ST_Area(<geom-col>)`
/// for SQL-backed drivers. The rewrite is bounded to the exact token; other
/// drivers get the predicate verbatim.
pub fn rewrite_area_token(predicate: &str, driver_name: &str, geom_column: &str) -> String {
    if !SQL_DRIVERS.contains(&driver_name) {
        return predicate.to_string();
    }
    let column = if geom_column.is_empty() { "geom" } else { geom_column };
    let token = Regex::new(r"\bOGR_GEOM_AREA\b").expect("valid pattern");
    token
        .replace_all(predicate, format!("ST_Area({column})").as_str())
        .into_owned()
}

/// Install `predicate` as the layer's attribute filter, collect the matching
/// FIDs in iteration order, and clear the filter again. A predicate the
/// layer rejects is fatal.
pub fn select_by_filter(
    layer: &mut Layer,
    predicate: &str,
    driver_name: &str,
) -> Result<Vec<Fid>> {
    let geom_column = layer
        .defn()
        .geom_fields()
        .next()
        .map(|field| field.name())
        .unwrap_or_default();
    let predicate = rewrite_area_token(predicate, driver_name, &geom_column);

    layer
        .set_attribute_filter(&predicate)
        .map_err(EliminateError::InvalidFilter)?;
    let mut fids = Vec::new();
    for feature in layer.features() {
        match feature.fid() {
            Some(fid) => fids.push(fid),
            None => warn!("filter matched a feature without a valid id, ignoring it"),
        }
    }
    layer.clear_attribute_filter();
    Ok(fids)
}

/// Parse caller-supplied feature ids with strict decimal semantics. Empty
/// strings, signs, trailing garbage, and overflow are warned and skipped.
/// Duplicates keep their first-seen position.
pub fn parse_fid_list<S: AsRef<str>>(raw: &[S]) -> Vec<Fid> {
    let mut seen: HashSet<Fid> = HashSet::new();
    let mut fids = Vec::new();
    for token in raw {
        let token = token.as_ref();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            warn!("ignoring invalid feature id {token:?}");
            continue;
        }
        match token.parse::<Fid>() {
            Ok(fid) => {
                if seen.insert(fid) {
                    fids.push(fid);
                }
            }
            Err(_) => warn!("ignoring out-of-range feature id {token:?}"),
        }
    }
    fids
}
