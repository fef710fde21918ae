//! Declarative layer configuration for geocad projects.
//!
//! Parses a YAML project description into a typed model: [`ProjectConfig`],
//! [`LayerConfig`], [`OperationConfig`], [`SourceConfig`], [`ReportConfig`].
//!
//! # Example
//! ```
//! let yaml = r#"
//! layers:
//!   - name: parcels
//!     source: { path: parcels.geojson }
//!   - name: setback
//!     operations:
//!       - type: buffer
//!         layers: [parcels]
//!         distance: 5
//! "#;
//! let config = geocad_config::parse(yaml).unwrap();
//! assert_eq!(config.layers.len(), 2);
//! assert_eq!(config.layers[1].operations[0].op_type, "buffer");
//! ```

pub mod ast;
pub mod style;
pub mod transforms;

pub use ast::*;
pub use style::{resolve_style, ColorValue, ResolvedStyle, StyleConfig};
pub use transforms::{apply_transforms, expand_variables};

use std::path::Path;

use geocad_types::{GeocadError, Result};

/// Parse a YAML project configuration and expand its variables.
///
/// Relative paths are kept relative; use [`load`] to anchor them to the
/// configuration file's directory.
pub fn parse(input: &str) -> Result<ProjectConfig> {
    let mut config: ProjectConfig = serde_yaml::from_str(input).map_err(yaml_error)?;
    apply_transforms(&mut config, None);
    Ok(config)
}

/// Read and parse a configuration file. Relative paths inside it are resolved
/// against the file's directory.
pub fn load(path: &Path) -> Result<ProjectConfig> {
    let source = std::fs::read_to_string(path)?;
    let mut config: ProjectConfig = serde_yaml::from_str(&source).map_err(yaml_error)?;
    if config.name.is_empty() {
        config.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    let base = path.parent().filter(|p| !p.as_os_str().is_empty());
    apply_transforms(&mut config, base);
    tracing::debug!(
        path = %path.display(),
        layers = config.layers.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn yaml_error(err: serde_yaml::Error) -> GeocadError {
    let (line, col) = err
        .location()
        .map(|loc| (loc.line(), loc.column()))
        .unwrap_or((0, 0));
    GeocadError::ConfigParse {
        line,
        col,
        message: err.to_string(),
    }
}
