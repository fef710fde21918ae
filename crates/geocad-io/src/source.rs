//! File-backed source adapter dispatching on the declared or inferred format.

use std::fmt::Display;
use std::path::Path;

use serde::Deserialize;

use geocad_config::{SourceConfig, SourceFormat};
use geocad_pipeline::SourceAdapter;
use geocad_types::{Attributes, FeatureCollection, GeocadError, Result};

use crate::geojson_reader::read_geojson;
use crate::shapefile_reader::read_shapefile;

/// Per-source read options (the `options` map of a layer's `source`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadOptions {
    /// Attribute whitelist. `None` keeps every attribute.
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
    /// Text encoding of attribute data. Only UTF-8 (and its ASCII subset) is
    /// decoded.
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ReadOptions {
    pub fn from_source(source: &SourceConfig) -> Result<Self> {
        let options: Self = serde_json::from_value(serde_json::Value::Object(source.options.clone()))
            .map_err(|e| {
                read_error(&source.path, source.format_label(), format!("invalid options: {e}"))
            })?;
        if let Some(ref encoding) = options.encoding {
            let normalized = encoding.to_ascii_lowercase().replace(['-', '_'], "");
            if !matches!(normalized.as_str(), "utf8" | "ascii" | "usascii") {
                return Err(read_error(
                    &source.path,
                    source.format_label(),
                    format!("unsupported encoding '{encoding}'"),
                ));
            }
        }
        Ok(options)
    }

    /// Apply the attribute whitelist.
    pub fn select(&self, mut attributes: Attributes) -> Attributes {
        if let Some(ref keep) = self.attributes {
            attributes.retain(|k, _| keep.iter().any(|a| a == k));
        }
        attributes
    }
}

pub(crate) fn read_error(path: &Path, format: &str, message: impl Display) -> GeocadError {
    GeocadError::SourceRead {
        path: path.display().to_string(),
        format: format.to_string(),
        message: message.to_string(),
    }
}

/// Reads GeoJSON and ESRI Shapefile sources from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSourceAdapter;

impl FileSourceAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SourceAdapter for FileSourceAdapter {
    fn read(&self, layer: &str, source: &SourceConfig) -> Result<FeatureCollection> {
        let options = ReadOptions::from_source(source)?;
        let collection = match source.resolved_format() {
            Some(SourceFormat::Geojson) => read_geojson(&source.path, &options)?,
            Some(SourceFormat::Shapefile) => read_shapefile(&source.path, &options)?,
            None => {
                return Err(read_error(
                    &source.path,
                    source.format_label(),
                    "cannot infer format from the file extension; set 'format'",
                ))
            }
        };
        tracing::info!(
            layer = %layer,
            path = %source.path.display(),
            format = source.format_label(),
            features = collection.len(),
            "Source read"
        );
        Ok(collection)
    }
}
