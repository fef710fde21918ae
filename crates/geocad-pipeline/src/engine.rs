//! Pipeline execution engine: plan, then process layers in resolved order.
//!
//! Implements the run lifecycle: validate, resolve, process, finalize. Nothing
//! is read from disk before the plan is complete.

use std::time::Instant;

use indexmap::IndexMap;

use geocad_config::ProjectConfig;
use geocad_types::{FeatureCollection, GeocadError, LayerOutcome, Result};

use crate::events::{EventEmitter, PipelineEvent};
use crate::processor::LayerProcessor;
use crate::registry::{default_registry, OperationRegistry};
use crate::resolver::{DependencyResolver, ExecutionPlan};
use crate::source::SourceAdapter;
use crate::store::ResultStore;
use crate::validation::{validate_or_raise, Severity};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The core pipeline executor. Owns the operation registry, the source
/// adapter, and the event channel.
pub struct PipelineExecutor {
    registry: OperationRegistry,
    sources: Box<dyn SourceAdapter>,
    events: EventEmitter,
}

/// The result of a completed run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Enabled layers in the order they were processed.
    pub order: Vec<String>,
    pub outcomes: IndexMap<String, LayerOutcome>,
    pub store: ResultStore,
    /// Disabled layers, in declaration order.
    pub skipped: Vec<String>,
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Final collection published under a layer name or result key.
    pub fn published(&self, key: &str) -> Option<&FeatureCollection> {
        self.store.get(key).ok()
    }

    pub fn layer(&self, name: &str) -> Option<&LayerOutcome> {
        self.outcomes.get(name)
    }
}

// ---------------------------------------------------------------------------
// PipelineExecutor
// ---------------------------------------------------------------------------

impl PipelineExecutor {
    /// Create an executor with the given registry and source adapter.
    pub fn new(registry: OperationRegistry, sources: impl SourceAdapter + 'static) -> Self {
        Self {
            registry,
            sources: Box::new(sources),
            events: EventEmitter::default(),
        }
    }

    /// Create an executor pre-loaded with the built-in operations.
    pub fn with_default_registry(sources: impl SourceAdapter + 'static) -> Self {
        Self::new(default_registry(), sources)
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Validate `config` and resolve its processing order without touching any
    /// data.
    pub fn plan(&self, config: &ProjectConfig) -> Result<ExecutionPlan> {
        let diagnostics = validate_or_raise(config, &self.registry)?;
        for d in diagnostics.iter().filter(|d| d.severity == Severity::Warning) {
            tracing::warn!(rule = %d.rule, layer = ?d.layer, "{}", d.message);
        }
        DependencyResolver::new(&self.registry).resolve(config)
    }

    /// Run every enabled layer of `config` in dependency order.
    ///
    /// Configuration errors are reported before any source is read; the first
    /// failure aborts the run.
    pub fn run(&self, config: &ProjectConfig) -> Result<PipelineResult> {
        let started = Instant::now();
        self.events.emit(PipelineEvent::RunStarted {
            project: config.name.clone(),
            layer_count: config.layers.len(),
        });
        tracing::info!(project = %config.name, layers = config.layers.len(), "Pipeline run started");

        match self.execute(config, started) {
            Ok(result) => {
                tracing::info!(
                    project = %config.name,
                    processed = result.order.len(),
                    skipped = result.skipped.len(),
                    duration_ms = result.duration_ms,
                    "Pipeline run completed"
                );
                self.events.emit(PipelineEvent::RunCompleted {
                    project: config.name.clone(),
                    processed_layers: result.order.clone(),
                    duration_ms: result.duration_ms,
                });
                Ok(result)
            }
            Err(e) => {
                tracing::error!(project = %config.name, error = %e, "Pipeline run failed");
                self.events.emit(PipelineEvent::RunFailed {
                    project: config.name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn execute(&self, config: &ProjectConfig, started: Instant) -> Result<PipelineResult> {
        let plan = self.plan(config)?;
        let processor = LayerProcessor::new(&self.registry, self.sources.as_ref(), &self.events);
        let mut store = ResultStore::new();
        let mut outcomes = IndexMap::new();

        for name in &plan.order {
            let layer = config
                .layer(name)
                .ok_or_else(|| GeocadError::Other(format!("planned layer '{name}' is not declared")))?;
            let outcome = processor.process(layer, &mut store)?;
            outcomes.insert(name.clone(), outcome);
        }
        for layer in config.layers.iter().filter(|l| !l.enabled) {
            let outcome = processor.process(layer, &mut store)?;
            outcomes.insert(layer.name.clone(), outcome);
        }

        Ok(PipelineResult {
            order: plan.order,
            outcomes,
            store,
            skipped: plan.disabled,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySourceAdapter;
    use geo::point;
    use geocad_types::{Feature, LayerStatus};

    fn adapter() -> MemorySourceAdapter {
        MemorySourceAdapter::new().with(
            "wells.geojson",
            FeatureCollection::from_features(vec![
                Feature::new(point!(x: 0.0, y: 0.0)).with_attribute("depth", 40),
                Feature::new(point!(x: 100.0, y: 0.0)).with_attribute("depth", 120),
            ]),
        )
    }

    #[test]
    fn run_processes_in_dependency_order() {
        let config = geocad_config::parse(
            r#"
name: wells
layers:
  - name: protection
    operations:
      - type: buffer
        layers: [deep]
        distance: 10
  - name: deep
    source_layer: wells
    operations:
      - type: filter
        where: "depth>100"
  - name: wells
    source: { path: wells.geojson }
  - name: archive
    enabled: false
    source: { path: old.geojson }
"#,
        )
        .unwrap();
        let executor = PipelineExecutor::with_default_registry(adapter());
        let mut rx = executor.events().subscribe();
        let result = executor.run(&config).unwrap();

        assert_eq!(result.order, vec!["wells", "deep", "protection"]);
        assert_eq!(result.skipped, vec!["archive"]);
        assert_eq!(result.published("deep").unwrap().len(), 1);
        assert_eq!(result.published("protection").unwrap().len(), 1);
        assert!(result.published("archive").is_none());
        assert_eq!(result.layer("archive").unwrap().status, LayerStatus::Skipped);
        assert_eq!(result.layer("wells").unwrap().status, LayerStatus::Done);

        assert!(matches!(rx.try_recv().unwrap(), PipelineEvent::RunStarted { .. }));
        let mut completed = false;
        while let Ok(event) = rx.try_recv() {
            completed |= matches!(event, PipelineEvent::RunCompleted { .. });
        }
        assert!(completed);
    }

    #[test]
    fn plan_errors_before_any_read() {
        let config = geocad_config::parse(
            r#"
layers:
  - name: a
    source: { path: missing.geojson }
  - name: b
    operations:
      - type: merge
        layers: [ghost]
"#,
        )
        .unwrap();
        let executor = PipelineExecutor::with_default_registry(MemorySourceAdapter::new());
        let err = executor.run(&config).unwrap_err();
        assert!(matches!(err, GeocadError::UnresolvedReference { .. }), "got {err:?}");
    }

    #[test]
    fn run_failure_emits_event() {
        let config = geocad_config::parse("layers:\n  - name: a\n    source: { path: gone.shp }\n").unwrap();
        let executor = PipelineExecutor::with_default_registry(MemorySourceAdapter::new());
        let mut rx = executor.events().subscribe();
        let err = executor.run(&config).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let mut failed = false;
        while let Ok(event) = rx.try_recv() {
            failed |= matches!(event, PipelineEvent::RunFailed { .. });
        }
        assert!(failed);
    }
}
