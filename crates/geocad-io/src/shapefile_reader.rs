//! ESRI Shapefile reader built on the `shapefile` crate.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::Shape;

use geocad_types::{Attributes, Feature, FeatureCollection, Result};

use crate::source::{read_error, ReadOptions};

const FORMAT: &str = "shapefile";

/// Read a `.shp` file and its `.dbf` attribute table. Null shapes are skipped.
pub fn read_shapefile(path: &Path, options: &ReadOptions) -> Result<FeatureCollection> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| read_error(path, FORMAT, e))?;

    let mut out = FeatureCollection::new();
    let mut skipped = 0usize;
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item.map_err(|e| read_error(path, FORMAT, e))?;
        if matches!(shape, Shape::NullShape) {
            skipped += 1;
            continue;
        }
        let geometry = geo_types::Geometry::<f64>::try_from(shape)
            .map_err(|e| read_error(path, FORMAT, format!("unsupported geometry: {e}")))?;
        let fields: HashMap<String, FieldValue> = record.into();
        let attributes: Attributes = fields
            .into_iter()
            .map(|(name, value)| (name, field_to_json(value)))
            .collect();
        out.push(Feature::with_attributes(geometry, options.select(attributes)));
    }
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "Skipped null shapes");
    }
    Ok(out)
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s.map(|s| Value::String(s.trim_end().to_string())).unwrap_or(Value::Null),
        FieldValue::Numeric(n) => n.map(Value::from).unwrap_or(Value::Null),
        FieldValue::Float(f) => f.map(|f| Value::from(f as f64)).unwrap_or(Value::Null),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Double(d) => Value::from(d),
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_map_to_json() {
        assert_eq!(field_to_json(FieldValue::Character(Some("Main St  ".into()))), Value::from("Main St"));
        assert_eq!(field_to_json(FieldValue::Character(None)), Value::Null);
        assert_eq!(field_to_json(FieldValue::Numeric(Some(2.5))), Value::from(2.5));
        assert_eq!(field_to_json(FieldValue::Logical(Some(true))), Value::Bool(true));
        assert_eq!(field_to_json(FieldValue::Integer(7)), Value::from(7));
    }

    #[test]
    fn missing_file_is_source_read() {
        let err = read_shapefile(Path::new("/no/such/parcels.shp"), &ReadOptions::default()).unwrap_err();
        match err {
            geocad_types::GeocadError::SourceRead { format, .. } => assert_eq!(format, "shapefile"),
            other => panic!("Expected SourceRead, got: {other:?}"),
        }
    }
}
