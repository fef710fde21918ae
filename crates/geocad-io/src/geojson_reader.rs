//! GeoJSON reader built on the `geojson` crate.

use std::path::Path;

use geojson::GeoJson;

use geocad_types::{Feature, FeatureCollection, Result};

use crate::source::{read_error, ReadOptions};

const FORMAT: &str = "geojson";

/// Read a GeoJSON file: a FeatureCollection, a single Feature or a bare
/// Geometry. Features without geometry are skipped.
pub fn read_geojson(path: &Path, options: &ReadOptions) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path).map_err(|e| read_error(path, FORMAT, e))?;
    parse_geojson(&text, options).map_err(|e| read_error(path, FORMAT, e))
}

/// Parse GeoJSON text into a feature collection.
pub fn parse_geojson(
    text: &str,
    options: &ReadOptions,
) -> std::result::Result<FeatureCollection, geojson::Error> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => {
            let geometry = geo_types::Geometry::<f64>::try_from(g)?;
            return Ok(FeatureCollection::from_features(vec![Feature::new(geometry)]));
        }
    };

    let mut out = FeatureCollection::new();
    let mut skipped = 0usize;
    for feature in features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry = geo_types::Geometry::<f64>::try_from(geometry)?;
        let attributes = options.select(feature.properties.unwrap_or_default());
        out.push(Feature::with_attributes(geometry, attributes));
    }
    if skipped > 0 {
        tracing::warn!(skipped, "Skipped GeoJSON features without geometry");
    }
    Ok(out)
}
