//! JSON layer reports.
//!
//! A report summarises one published layer (or named result): the requested
//! calculations over its features and the overlap area with each compared layer.

use std::path::Path;

use geo::{Area, BooleanOps};
use serde::{Deserialize, Serialize};

use geocad_config::{Calculation, ReportConfig};
use geocad_pipeline::geometry::{area, footprint, perimeter};
use geocad_pipeline::ResultStore;
use geocad_types::Result;

use crate::write_atomic;

/// Overlap between the report layer and one compared layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOverlap {
    pub layer: String,
    pub area: f64,
    /// Overlap as a fraction of the report layer's footprint area.
    pub share: f64,
}

/// Serialized report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub layer: String,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perimeter: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlaps: Vec<LayerOverlap>,
}

/// Compute the report described by `config` from a finished run's results.
pub fn build_report(config: &ReportConfig, store: &ResultStore) -> Result<Report> {
    let features = store.get(&config.layer)?;

    let mut report = Report {
        name: config.name.clone(),
        layer: config.layer.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        count: None,
        area: None,
        perimeter: None,
        overlaps: Vec::new(),
    };
    for calculation in &config.calculations {
        match calculation {
            Calculation::Count => report.count = Some(features.len()),
            Calculation::Area => {
                report.area = Some(features.iter().map(|f| area(&f.geometry)).sum())
            }
            Calculation::Perimeter => {
                report.perimeter = Some(features.iter().map(|f| perimeter(&f.geometry)).sum())
            }
        }
    }

    if !config.compare.is_empty() {
        let base = footprint([features]);
        let base_area = base.unsigned_area();
        for other in &config.compare {
            let other_area = footprint([store.get(other)?]);
            let overlap = base.intersection(&other_area).unsigned_area();
            let share = if base_area > 0.0 { overlap / base_area } else { 0.0 };
            report.overlaps.push(LayerOverlap {
                layer: other.clone(),
                area: overlap,
                share,
            });
        }
    }
    Ok(report)
}

/// Writes report documents as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// Build the report and write it to its configured path.
    pub fn write(&self, config: &ReportConfig, store: &ResultStore) -> Result<Report> {
        let report = build_report(config, store)?;
        self.write_report(&report, &config.path)?;
        Ok(report)
    }

    pub fn write_report(&self, report: &Report, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        write_atomic(path, json.as_bytes())?;
        tracing::info!(report = %report.name, path = %path.display(), "Report written");
        Ok(())
    }
}
