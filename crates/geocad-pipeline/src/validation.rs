//! Configuration validation: lint rules and diagnostics.
//!
//! Built-in rules check the structural and semantic correctness of a
//! [`ProjectConfig`] against an [`OperationRegistry`]. Call [`validate`] for
//! advisory diagnostics or [`validate_or_raise`] to fail with the typed error
//! of the first `Error`-severity finding.

use std::collections::{HashMap, HashSet};

use geocad_config::{resolve_style, ProjectConfig};
use geocad_types::{GeocadError, Result};

use crate::keys;
use crate::registry::OperationRegistry;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub layer: Option<String>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        }
    }
}

/// A diagnostic together with the typed error it stands for.
#[derive(Debug)]
pub struct Finding {
    pub diagnostic: Diagnostic,
    pub error: Option<GeocadError>,
}

impl Finding {
    fn error(rule: &str, layer: Option<&str>, error: GeocadError, fix: Option<&str>) -> Self {
        Self {
            diagnostic: Diagnostic {
                rule: rule.into(),
                severity: Severity::Error,
                message: error.to_string(),
                layer: layer.map(str::to_string),
                fix: fix.map(str::to_string),
            },
            error: Some(error),
        }
    }

    fn advisory(rule: &str, severity: Severity, layer: Option<&str>, message: String) -> Self {
        Self {
            diagnostic: Diagnostic {
                rule: rule.into(),
                severity,
                message,
                layer: layer.map(str::to_string),
                fix: None,
            },
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, config: &ProjectConfig, registry: &OperationRegistry) -> Vec<Finding>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct UniqueLayerNamesRule;
impl LintRule for UniqueLayerNamesRule {
    fn name(&self) -> &str { "unique_layer_names" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        config
            .layers
            .iter()
            .filter(|l| !seen.insert(l.name.as_str()) && reported.insert(l.name.as_str()))
            .map(|l| {
                Finding::error(
                    self.name(),
                    Some(l.name.as_str()),
                    GeocadError::DuplicateLayer { layer: l.name.clone() },
                    Some("Rename one of the layers"),
                )
            })
            .collect()
    }
}

struct LayerInputRule;
impl LintRule for LayerInputRule {
    fn name(&self) -> &str { "exclusive_input" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        config
            .layers
            .iter()
            .filter(|l| l.source.is_some() && l.source_layer.is_some())
            .map(|l| {
                Finding::error(
                    self.name(),
                    Some(l.name.as_str()),
                    GeocadError::InvalidLayer {
                        layer: l.name.clone(),
                        message: "declares both 'source' and 'source_layer'".into(),
                    },
                    Some("Keep either the file source or the layer reference"),
                )
            })
            .collect()
    }
}

struct EmptyLayerRule;
impl LintRule for EmptyLayerRule {
    fn name(&self) -> &str { "empty_layer" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        config
            .enabled_layers()
            .filter(|l| !l.has_input() && l.operations.is_empty())
            .map(|l| {
                Finding::error(
                    self.name(),
                    Some(l.name.as_str()),
                    GeocadError::EmptyLayer { layer: l.name.clone() },
                    Some("Add a 'source', a 'source_layer' or at least one operation"),
                )
            })
            .collect()
    }
}

struct KnownOperationRule;
impl LintRule for KnownOperationRule {
    fn name(&self) -> &str { "known_operation" }
    fn apply(&self, config: &ProjectConfig, registry: &OperationRegistry) -> Vec<Finding> {
        let mut findings = Vec::new();
        for layer in config.enabled_layers() {
            for (i, op) in layer.operations.iter().enumerate() {
                if let Err(e) = registry.resolve(&op.op_type, &layer.name, i) {
                    findings.push(Finding::error(self.name(), Some(layer.name.as_str()), e, None));
                }
            }
        }
        findings
    }
}

struct OperationParametersRule;
impl LintRule for OperationParametersRule {
    fn name(&self) -> &str { "operation_parameters" }
    fn apply(&self, config: &ProjectConfig, registry: &OperationRegistry) -> Vec<Finding> {
        let mut findings = Vec::new();
        for layer in config.enabled_layers() {
            for op in &layer.operations {
                let Some(operation) = registry.get(&op.op_type) else {
                    continue;
                };
                if let Err(e) = operation.validate_params(&op.parameters) {
                    findings.push(Finding::error(self.name(), Some(layer.name.as_str()), e, None));
                }
            }
        }
        findings
    }
}

struct OperationInputRule;
impl LintRule for OperationInputRule {
    fn name(&self) -> &str { "operation_input" }
    fn apply(&self, config: &ProjectConfig, registry: &OperationRegistry) -> Vec<Finding> {
        let mut findings = Vec::new();
        for layer in config.enabled_layers() {
            for (i, op) in layer.operations.iter().enumerate() {
                let has_upstream = i > 0 || layer.has_input() || op.source_layer.is_some();
                let Some(operation) = registry.get(&op.op_type) else {
                    continue;
                };
                if !has_upstream && operation.requires_input(&op.parameters) {
                    findings.push(Finding::error(
                        self.name(),
                        Some(layer.name.as_str()),
                        GeocadError::MissingInput {
                            op_type: op.op_type.clone(),
                            layer: layer.name.clone(),
                            step: i,
                        },
                        Some("Give the layer a source or set 'source_layer' on the step"),
                    ));
                }
            }
        }
        findings
    }
}

struct DuplicateOutputRule;
impl LintRule for DuplicateOutputRule {
    fn name(&self) -> &str { "duplicate_output_name" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut claimed: HashMap<String, &str> = HashMap::new();

        for layer in config.enabled_layers() {
            let output = keys::output_keys(layer);
            let mut written = HashSet::new();
            for (key, op) in output.iter().zip(&layer.operations) {
                if !written.insert(key.as_str()) && !op.overwrite {
                    findings.push(Finding::error(
                        self.name(),
                        Some(layer.name.as_str()),
                        GeocadError::DuplicateResult {
                            key: key.clone(),
                            layer: layer.name.clone(),
                        },
                        Some("Set 'overwrite: true' on the later step or pick another output_name"),
                    ));
                }
            }

            for key in keys::published_keys(layer) {
                match claimed.get(key.as_str()).copied() {
                    Some(owner) if owner != layer.name => {
                        findings.push(Finding::advisory(
                            self.name(),
                            Severity::Warning,
                            Some(layer.name.as_str()),
                            format!(
                                "Result '{key}' is also produced by layer '{owner}'; the layer processed last wins"
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        claimed.insert(key, layer.name.as_str());
                    }
                }
            }
        }
        findings
    }
}

struct StyleResolvesRule;
impl LintRule for StyleResolvesRule {
    fn name(&self) -> &str { "style_resolves" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        config
            .enabled_layers()
            .filter(|l| l.sync)
            .filter_map(|l| {
                resolve_style(&config.styles, l.style.as_ref())
                    .err()
                    .map(|e| Finding::error(self.name(), Some(l.name.as_str()), e, None))
            })
            .collect()
    }
}

struct ReportLayerRule;
impl LintRule for ReportLayerRule {
    fn name(&self) -> &str { "report_layer_exists" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        let produced: HashSet<String> = config
            .enabled_layers()
            .flat_map(keys::published_keys)
            .collect();
        let mut findings = Vec::new();
        for report in &config.reports {
            for name in std::iter::once(&report.layer).chain(&report.compare) {
                if !produced.contains(name) {
                    findings.push(Finding::error(
                        self.name(),
                        None,
                        GeocadError::UnresolvedReference {
                            reference: name.clone(),
                            referrer: format!("report {}", report.name),
                        },
                        None,
                    ));
                }
            }
        }
        findings
    }
}

struct LabelingExportRule;
impl LintRule for LabelingExportRule {
    fn name(&self) -> &str { "labeling_export" }
    fn apply(&self, config: &ProjectConfig, _registry: &OperationRegistry) -> Vec<Finding> {
        config
            .enabled_layers()
            .filter(|l| l.labeling.is_some() && (!l.sync || config.output.dxf.is_none()))
            .map(|l| {
                Finding::advisory(
                    self.name(),
                    Severity::Info,
                    Some(l.name.as_str()),
                    format!("Layer '{}' has labeling but is not exported to DXF", l.name),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all built-in lint rules and return the findings with their typed errors.
pub fn lint(config: &ProjectConfig, registry: &OperationRegistry) -> Vec<Finding> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(UniqueLayerNamesRule),
        Box::new(LayerInputRule),
        Box::new(EmptyLayerRule),
        Box::new(KnownOperationRule),
        Box::new(OperationParametersRule),
        Box::new(OperationInputRule),
        Box::new(DuplicateOutputRule),
        Box::new(StyleResolvesRule),
        Box::new(ReportLayerRule),
        Box::new(LabelingExportRule),
    ];

    let mut findings = Vec::new();
    for rule in &rules {
        findings.extend(rule.apply(config, registry));
    }
    findings
}

/// Run all built-in lint rules and return collected diagnostics.
pub fn validate(config: &ProjectConfig, registry: &OperationRegistry) -> Vec<Diagnostic> {
    lint(config, registry).into_iter().map(|f| f.diagnostic).collect()
}

/// Run all lint rules; return the first `Error`-severity finding's error, or
/// the remaining diagnostics when there is none.
pub fn validate_or_raise(
    config: &ProjectConfig,
    registry: &OperationRegistry,
) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    for finding in lint(config, registry) {
        if finding.diagnostic.severity == Severity::Error {
            return Err(finding
                .error
                .unwrap_or(GeocadError::Validation(finding.diagnostic.message)));
        }
        diagnostics.push(finding.diagnostic);
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;

    fn check(yaml: &str) -> Vec<Diagnostic> {
        let config = geocad_config::parse(yaml).unwrap();
        validate(&config, &default_registry())
    }

    fn raise(yaml: &str) -> Result<Vec<Diagnostic>> {
        let config = geocad_config::parse(yaml).unwrap();
        validate_or_raise(&config, &default_registry())
    }

    fn errors(diags: &[Diagnostic]) -> Vec<&Diagnostic> {
        diags.iter().filter(|d| d.severity == Severity::Error).collect()
    }

    #[test]
    fn valid_config_passes() {
        let diags = check(
            r#"
layers:
  - name: parcels
    source: { path: parcels.geojson }
  - name: setback
    operations:
      - type: buffer
        layers: [parcels]
        distance: 5
"#,
        );
        assert!(errors(&diags).is_empty(), "Expected no errors, got: {diags:?}");
    }

    #[test]
    fn duplicate_layer_name() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
  - name: a
    source: { path: b.geojson }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeocadError::DuplicateLayer { ref layer } if layer == "a"));
    }

    #[test]
    fn empty_layer_is_error() {
        let err = raise("layers:\n  - name: nothing\n").unwrap_err();
        assert!(matches!(err, GeocadError::EmptyLayer { .. }));
    }

    #[test]
    fn disabled_empty_layer_is_fine() {
        let diags = check(
            "layers:\n  - name: nothing\n    enabled: false\n  - name: a\n    source: { path: a.shp }\n",
        );
        assert!(errors(&diags).is_empty());
    }

    #[test]
    fn source_and_source_layer_conflict() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
  - name: b
    source: { path: b.geojson }
    source_layer: a
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeocadError::InvalidLayer { .. }));
    }

    #[test]
    fn unknown_operation_reports_layer_and_step() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
    operations:
      - type: filter
      - type: smooth
"#,
        )
        .unwrap_err();
        match err {
            GeocadError::UnknownOperation { op_type, layer, step } => {
                assert_eq!(op_type, "smooth");
                assert_eq!(layer, "a");
                assert_eq!(step, 1);
            }
            other => panic!("Expected UnknownOperation, got: {other:?}"),
        }
    }

    #[test]
    fn bad_parameters() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
    operations:
      - type: buffer
        radius: 3
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeocadError::InvalidParameter { ref op_type, .. } if op_type == "buffer"));
    }

    #[test]
    fn missing_input_for_non_generative_first_step() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
  - name: b
    operations:
      - type: difference
        subtract: [a]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeocadError::MissingInput { step: 0, .. }));
    }

    #[test]
    fn generative_first_step_needs_no_input() {
        let diags = check(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
  - name: b
    operations:
      - type: copy
        layers: a
"#,
        );
        assert!(errors(&diags).is_empty(), "{diags:?}");
    }

    #[test]
    fn duplicate_output_in_chain_requires_overwrite() {
        let yaml = |overwrite: bool| {
            format!(
                r#"
layers:
  - name: a
    source: {{ path: a.geojson }}
    operations:
      - type: filter
        output_name: tmp
      - type: filter
        output_name: tmp
        overwrite: {overwrite}
"#
            )
        };
        let err = raise(&yaml(false)).unwrap_err();
        assert!(matches!(err, GeocadError::DuplicateResult { ref key, .. } if key == "tmp"));
        assert!(raise(&yaml(true)).is_ok());
    }

    #[test]
    fn cross_layer_output_collision_is_warning() {
        let diags = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
    operations:
      - type: filter
        output_name: shared
  - name: b
    source: { path: b.geojson }
    operations:
      - type: filter
        output_name: shared
"#,
        )
        .unwrap();
        assert!(diags
            .iter()
            .any(|d| d.rule == "duplicate_output_name" && d.severity == Severity::Warning));
    }

    #[test]
    fn unknown_style_preset() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
    style: { preset: nope }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeocadError::Config(_)));
    }

    #[test]
    fn report_on_unknown_layer() {
        let err = raise(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
reports:
  - name: areas
    layer: a
    path: out.json
    compare: [ghost]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeocadError::UnresolvedReference { ref reference, .. } if reference == "ghost"));
    }

    #[test]
    fn labeling_without_export_is_info() {
        let diags = check(
            r#"
layers:
  - name: a
    source: { path: a.geojson }
    labeling: { attribute: name }
"#,
        );
        assert!(diags
            .iter()
            .any(|d| d.rule == "labeling_export" && d.severity == Severity::Info));
    }
}
