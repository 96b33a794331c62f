//! GeoJSON feature collections built from a geo field of the export.
//!
//! Geo values are `lat lon [altitude [accuracy]]` points; traces and shapes
//! join points with `;`. Positions are written `[lon, lat]` (with altitude
//! when present).

use std::io::Write;

use formpack_export::{CellValue, ColumnSource, FieldKind, FieldPart, Table, TableSet};
use formpack_model::GeoKind;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::error::{OutputError, Result};

/// Which geo field to map, and whether traces and shapes are reduced to
/// their first point.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonOptions {
    /// Field name; the first geo field of the export when unset.
    pub field: Option<String>,
    pub flatten: bool,
}

struct GeoColumn<'t> {
    table: &'t Table,
    name: &'t str,
    kind: GeoKind,
    index: usize,
}

fn find_geo_column<'t>(tables: &'t TableSet, field: Option<&str>) -> Result<GeoColumn<'t>> {
    for table in tables {
        for (index, column) in table.columns.iter().enumerate() {
            if let ColumnSource::Field {
                name,
                kind: FieldKind::Geo(kind),
                part: FieldPart::Value,
            } = &column.source
                && field.is_none_or(|wanted| wanted == name)
            {
                return Ok(GeoColumn {
                    table,
                    name,
                    kind: *kind,
                    index,
                });
            }
        }
    }
    match field {
        Some(name) => Err(OutputError::UnknownGeoField {
            name: name.to_string(),
        }),
        None => Err(OutputError::NoGeoField),
    }
}

fn position(point: &str) -> Option<Vec<f64>> {
    let numbers = point
        .split_whitespace()
        .map(|part| part.parse::<f64>().ok().filter(|n| n.is_finite()))
        .collect::<Option<Vec<_>>>()?;
    match numbers.as_slice() {
        [lat, lon] => Some(vec![*lon, *lat]),
        [lat, lon, alt, ..] => Some(vec![*lon, *lat, *alt]),
        _ => None,
    }
}

/// GeoJSON geometry for one geo value, or `None` when it does not parse.
pub fn geometry(kind: GeoKind, value: &str, flatten: bool) -> Option<Value> {
    let positions = value
        .split(';')
        .filter(|point| !point.trim().is_empty())
        .map(position)
        .collect::<Option<Vec<_>>>()?;
    let first = positions.first()?.clone();
    let geometry = match kind {
        GeoKind::Point => json!({"type": "Point", "coordinates": first}),
        _ if flatten => json!({"type": "Point", "coordinates": first}),
        GeoKind::Trace => json!({"type": "LineString", "coordinates": positions}),
        GeoKind::Shape => json!({"type": "Polygon", "coordinates": [positions]}),
    };
    Some(geometry)
}

fn property(cell: &CellValue) -> Value {
    match cell {
        CellValue::Text(text) => Value::String(text.clone()),
        CellValue::Integer(value) => Value::from(*value),
        CellValue::Empty => Value::Null,
    }
}

/// Feature collection with one feature per row holding a parseable value
/// of the geo field. Other columns of the row become properties.
pub fn geojson(tables: &TableSet, options: &GeoJsonOptions) -> Result<Value> {
    let geo = find_geo_column(tables, options.field.as_deref())?;
    let mut features = Vec::new();

    for (row_number, row) in geo.table.rows.iter().enumerate() {
        let value = row[geo.index].as_text();
        let Some(geometry) = geometry(geo.kind, &value, options.flatten) else {
            debug!(table = %geo.table.name, row = row_number, field = geo.name, "no geometry");
            continue;
        };
        let properties: Map<String, Value> = geo
            .table
            .columns
            .iter()
            .zip(row)
            .filter(|(column, _)| column.field_name() != Some(geo.name))
            .map(|(column, cell)| (column.label.clone(), property(cell)))
            .collect();
        features.push(json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": properties,
        }));
    }

    info!(table = %geo.table.name, field = geo.name, features = features.len(), "built GeoJSON");
    Ok(json!({
        "type": "FeatureCollection",
        "name": geo.table.name,
        "features": features,
    }))
}

pub fn write_geojson<W: Write>(tables: &TableSet, options: &GeoJsonOptions, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &geojson(tables, options)?)?;
    Ok(())
}
