//! Hand a finished run's published layers to the DXF and report writers.

use std::path::{Path, PathBuf};

use geocad_config::{resolve_style, ProjectConfig};
use geocad_pipeline::PipelineResult;
use geocad_types::Result;

use crate::dxf::{DxfLayer, DxfWriter};
use crate::report::{build_report, ReportWriter};

/// Overrides applied on top of the project's `output` section.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// DXF destination replacing `output.dxf`.
    pub dxf: Option<PathBuf>,
    pub skip_reports: bool,
}

/// What was written.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub dxf: Option<PathBuf>,
    pub dxf_layers: Vec<String>,
    pub reports: Vec<PathBuf>,
}

/// Write the DXF drawing (layers with `sync: true`, in plan order) and every
/// configured report.
pub fn write_outputs(
    config: &ProjectConfig,
    result: &PipelineResult,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();

    // Reports are built before the first file is written.
    let reports = if options.skip_reports {
        if !config.reports.is_empty() {
            tracing::info!(count = config.reports.len(), "Skipping reports");
        }
        Vec::new()
    } else {
        config
            .reports
            .iter()
            .map(|r| build_report(r, &result.store).map(|report| (report, r.path.clone())))
            .collect::<Result<Vec<_>>>()?
    };

    let dxf_path: Option<&Path> = options.dxf.as_deref().or(config.output.dxf.as_deref());
    match dxf_path {
        Some(path) => {
            let mut writer = DxfWriter::new();
            for name in &result.order {
                let Some(layer) = config.layer(name) else {
                    continue;
                };
                if !layer.sync {
                    tracing::debug!(layer = %name, "Layer not synced to DXF");
                    continue;
                }
                writer.add_layer(DxfLayer {
                    name,
                    style: resolve_style(&config.styles, layer.style.as_ref())?,
                    labeling: layer.labeling.as_ref(),
                    features: result.store.get(name)?,
                });
                summary.dxf_layers.push(name.clone());
            }
            writer.write(path)?;
            summary.dxf = Some(path.to_path_buf());
        }
        None => tracing::debug!("No DXF output configured"),
    }

    let writer = ReportWriter::new();
    for (report, path) in reports {
        writer.write_report(&report, &path)?;
        summary.reports.push(path);
    }

    Ok(summary)
}
