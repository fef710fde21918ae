use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::style::StyleConfig;

/// Free-form operation parameters (every key of an operation entry other than
/// `type`, `source_layer`, `output_name` and `overwrite`).
pub type Parameters = serde_json::Map<String, serde_json::Value>;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    #[serde(default)]
    pub styles: IndexMap<String, StyleConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub reports: Vec<ReportConfig>,
}

impl ProjectConfig {
    /// First layer declared with `name`.
    pub fn layer(&self, name: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn enabled_layers(&self) -> impl Iterator<Item = &LayerConfig> {
        self.layers.iter().filter(|l| l.enabled)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    /// Layer-level input taken from another layer or named result.
    #[serde(default)]
    pub source_layer: Option<String>,
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub style: Option<StyleConfig>,
    #[serde(default)]
    pub viewport: Option<serde_json::Value>,
    #[serde(default)]
    pub labeling: Option<LabelingConfig>,
    /// Whether the layer is written to the DXF document.
    #[serde(default = "default_true")]
    pub sync: bool,
}

impl LayerConfig {
    /// A bare enabled layer with no input and no operations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            source_layer: None,
            operations: Vec::new(),
            enabled: true,
            style: None,
            viewport: None,
            labeling: None,
            sync: true,
        }
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    pub fn with_operation(mut self, operation: OperationConfig) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `true` when the layer has an initial stream before its first operation.
    pub fn has_input(&self) -> bool {
        self.source.is_some() || self.source_layer.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Geojson,
    Shapefile,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Geojson => "geojson",
            SourceFormat::Shapefile => "shapefile",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(SourceFormat::Geojson),
            "shp" => Some(SourceFormat::Shapefile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default)]
    pub options: Parameters,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            options: Parameters::new(),
        }
    }

    /// Declared format, falling back to the file extension.
    pub fn resolved_format(&self) -> Option<SourceFormat> {
        self.format.or_else(|| SourceFormat::from_path(&self.path))
    }

    /// Human-readable format tag for diagnostics.
    pub fn format_label(&self) -> &'static str {
        self.resolved_format()
            .map(|f| f.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationConfig {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub source_layer: Option<String>,
    #[serde(default)]
    pub output_name: Option<String>,
    /// Explicit request to replace a key already written by this layer's chain.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(flatten)]
    pub parameters: Parameters,
}

impl OperationConfig {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            source_layer: None,
            output_name: None,
            overwrite: false,
            parameters: Parameters::new(),
        }
    }

    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = Some(output_name.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub dxf: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelingConfig {
    /// Attribute whose value becomes the label text.
    pub attribute: String,
    #[serde(default)]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calculation {
    Area,
    Perimeter,
    Count,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub name: String,
    /// Layer or named result the report is computed over.
    pub layer: String,
    pub path: PathBuf,
    #[serde(default)]
    pub calculations: Vec<Calculation>,
    /// Layers whose overlap area with `layer` is reported.
    #[serde(default)]
    pub compare: Vec<String>,
}
