//! Source adapters and export consumers for the geocad pipeline.
//!
//! - `FileSourceAdapter` reads GeoJSON and ESRI Shapefile sources.
//! - `DxfWriter` renders published layers into an ASCII DXF R12 drawing.
//! - `ReportWriter` computes and writes JSON layer reports.
//!
//! Every output file is written to a temporary file next to its destination
//! and persisted in one rename.

pub mod dxf;
pub mod export;
pub mod geojson_reader;
pub mod report;
pub mod shapefile_reader;
pub mod source;

pub use dxf::{DxfLayer, DxfWriter};
pub use export::{write_outputs, ExportOptions, ExportSummary};
pub use geojson_reader::{parse_geojson, read_geojson};
pub use report::{build_report, LayerOverlap, Report, ReportWriter};
pub use shapefile_reader::read_shapefile;
pub use source::{FileSourceAdapter, ReadOptions};

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use geocad_types::{GeocadError, Result};

pub(crate) fn export_error(path: &Path, message: impl Display) -> GeocadError {
    GeocadError::ExportWrite {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Write `contents` to `path` via a sibling temporary file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| export_error(path, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| export_error(path, e))?;
    tmp.write_all(contents).map_err(|e| export_error(path, e))?;
    tmp.flush().map_err(|e| export_error(path, e))?;
    tmp.persist(path).map_err(|e| export_error(path, e.error))?;
    Ok(())
}
