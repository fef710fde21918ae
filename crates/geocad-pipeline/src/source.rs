//! Source adapter seam: how a layer's `source` becomes its initial stream.

use std::collections::HashMap;
use std::path::PathBuf;

use geocad_config::SourceConfig;
use geocad_types::{FeatureCollection, GeocadError, Result};

/// Reads the features a layer's `source` declares.
///
/// Implementations report failures as `SourceRead` carrying the path, format
/// and cause.
pub trait SourceAdapter: Send + Sync {
    fn read(&self, layer: &str, source: &SourceConfig) -> Result<FeatureCollection>;
}

/// In-memory adapter keyed by source path. Used by tests and by embedders that
/// already hold their data.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceAdapter {
    collections: HashMap<PathBuf, FeatureCollection>,
}

impl MemorySourceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, collection: FeatureCollection) {
        self.collections.insert(path.into(), collection);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, collection: FeatureCollection) -> Self {
        self.insert(path, collection);
        self
    }
}

impl SourceAdapter for MemorySourceAdapter {
    fn read(&self, _layer: &str, source: &SourceConfig) -> Result<FeatureCollection> {
        self.collections
            .get(&source.path)
            .cloned()
            .ok_or_else(|| GeocadError::SourceRead {
                path: source.path.display().to_string(),
                format: source.format_label().to_string(),
                message: "no such source".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use geocad_types::Feature;

    #[test]
    fn memory_adapter_reads_by_path() {
        let adapter = MemorySourceAdapter::new().with(
            "a.geojson",
            FeatureCollection::from_features(vec![Feature::new(point!(x: 0.0, y: 0.0))]),
        );
        let fc = adapter.read("a", &SourceConfig::new("a.geojson")).unwrap();
        assert_eq!(fc.len(), 1);
    }

    #[test]
    fn memory_adapter_missing_is_source_read() {
        let adapter = MemorySourceAdapter::new();
        let err = adapter.read("a", &SourceConfig::new("gone.shp")).unwrap_err();
        match err {
            GeocadError::SourceRead { path, format, .. } => {
                assert_eq!(path, "gone.shp");
                assert_eq!(format, "shapefile");
            }
            other => panic!("Expected SourceRead, got: {other:?}"),
        }
    }
}
