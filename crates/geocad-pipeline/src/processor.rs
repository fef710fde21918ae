//! Layer processor: runs one layer from source load through its operation
//! chain to publication in the Result Store.

use std::time::Instant;

use geocad_config::LayerConfig;
use geocad_types::{FeatureCollection, GeocadError, LayerOutcome, LayerStatus, Result};

use crate::events::{EventEmitter, PipelineEvent};
use crate::keys;
use crate::registry::{OperationContext, OperationRegistry};
use crate::source::SourceAdapter;
use crate::store::ResultStore;

pub struct LayerProcessor<'a> {
    registry: &'a OperationRegistry,
    sources: &'a dyn SourceAdapter,
    events: &'a EventEmitter,
}

impl<'a> LayerProcessor<'a> {
    pub fn new(
        registry: &'a OperationRegistry,
        sources: &'a dyn SourceAdapter,
        events: &'a EventEmitter,
    ) -> Self {
        Self {
            registry,
            sources,
            events,
        }
    }

    /// Process `layer`, writing every step's result into `store`.
    ///
    /// Every layer `layer` references must already be published.
    pub fn process(&self, layer: &LayerConfig, store: &mut ResultStore) -> Result<LayerOutcome> {
        if !layer.enabled {
            tracing::info!(layer = %layer.name, status = LayerStatus::Skipped.as_str(), "Layer disabled");
            self.events.emit(PipelineEvent::LayerSkipped {
                layer: layer.name.clone(),
            });
            return Ok(LayerOutcome::skipped(&layer.name));
        }

        self.events.emit(PipelineEvent::LayerStarted {
            layer: layer.name.clone(),
        });
        tracing::debug!(layer = %layer.name, status = LayerStatus::Pending.as_str(), "Layer started");

        match self.run_layer(layer, store) {
            Ok(outcome) => {
                tracing::info!(
                    layer = %layer.name,
                    features = outcome.feature_count,
                    status = LayerStatus::Done.as_str(),
                    "Layer processed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(layer = %layer.name, status = LayerStatus::Failed.as_str(), error = %e, "Layer failed");
                self.events.emit(PipelineEvent::LayerFailed {
                    layer: layer.name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn run_layer(&self, layer: &LayerConfig, store: &mut ResultStore) -> Result<LayerOutcome> {
        let initial = self.load_initial(layer, store)?;

        if layer.operations.is_empty() {
            let collection = initial.ok_or_else(|| GeocadError::EmptyLayer {
                layer: layer.name.clone(),
            })?;
            let count = collection.len();
            self.store_result(layer, store, layer.name.clone(), collection, false)?;
            self.published(layer, count);
            return Ok(LayerOutcome::done(&layer.name, count, vec![layer.name.clone()]));
        }

        tracing::debug!(layer = %layer.name, status = LayerStatus::Chaining.as_str(), "Running operation chain");
        let output_keys = keys::output_keys(layer);
        let mut result_keys = Vec::with_capacity(output_keys.len() + 1);
        let mut current = initial;

        for (i, (op, key)) in layer.operations.iter().zip(&output_keys).enumerate() {
            let operation = self.registry.resolve(&op.op_type, &layer.name, i)?;
            self.events.emit(PipelineEvent::OperationStarted {
                layer: layer.name.clone(),
                step: i,
                op_type: op.op_type.clone(),
            });
            let started = Instant::now();

            let output = {
                let input = match op.source_layer {
                    Some(ref name) => Some(store.get(name)?),
                    None => current.as_ref(),
                };
                if input.is_none() && operation.requires_input(&op.parameters) {
                    return Err(GeocadError::MissingInput {
                        op_type: op.op_type.clone(),
                        layer: layer.name.clone(),
                        step: i,
                    });
                }

                let span = tracing::debug_span!(
                    "operation",
                    layer = %layer.name,
                    step = i,
                    op_type = %op.op_type
                );
                let _entered = span.enter();
                let context = OperationContext::new(&layer.name, i, store).with_span(span.clone());
                operation
                    .execute(input, &op.parameters, &context)
                    .map_err(|e| wrap_error(e, &layer.name, i, &op.op_type))?
            };

            let count = output.len();
            self.store_result(layer, store, key.clone(), output.clone(), op.overwrite)?;
            result_keys.push(key.clone());
            tracing::debug!(
                layer = %layer.name,
                step = i,
                op_type = %op.op_type,
                output_key = %key,
                features = count,
                "Operation completed"
            );
            self.events.emit(PipelineEvent::OperationCompleted {
                layer: layer.name.clone(),
                step: i,
                output_key: key.clone(),
                feature_count: count,
                duration_ms: started.elapsed().as_millis() as u64,
            });
            current = Some(output);
        }

        let last = current.unwrap_or_default();
        let count = last.len();
        if result_keys.last() != Some(&layer.name) {
            let replace = store.owner(&layer.name) == Some(layer.name.as_str());
            self.store_result(layer, store, layer.name.clone(), last, replace)?;
            result_keys.push(layer.name.clone());
        }
        self.published(layer, count);
        Ok(LayerOutcome::done(&layer.name, count, result_keys))
    }

    fn load_initial(&self, layer: &LayerConfig, store: &ResultStore) -> Result<Option<FeatureCollection>> {
        if let Some(ref source) = layer.source {
            let collection = self.sources.read(&layer.name, source)?;
            tracing::debug!(
                layer = %layer.name,
                path = %source.path.display(),
                features = collection.len(),
                status = LayerStatus::SourceLoaded.as_str(),
                "Source loaded"
            );
            self.events.emit(PipelineEvent::SourceLoaded {
                layer: layer.name.clone(),
                path: source.path.display().to_string(),
                feature_count: collection.len(),
            });
            return Ok(Some(collection));
        }
        if let Some(ref name) = layer.source_layer {
            return Ok(Some(store.get(name)?.clone()));
        }
        Ok(None)
    }

    fn store_result(
        &self,
        layer: &LayerConfig,
        store: &mut ResultStore,
        key: String,
        collection: FeatureCollection,
        overwrite: bool,
    ) -> Result<()> {
        let previous = if overwrite {
            store.put_overwrite(&layer.name, key.clone(), collection)
        } else {
            store.put(&layer.name, key.clone(), collection)?
        };
        if let Some(previous) = previous {
            if previous != layer.name && key != layer.name {
                tracing::warn!(
                    layer = %layer.name,
                    key = %key,
                    previous_owner = %previous,
                    "Replacing result written by another layer"
                );
                self.events.emit(PipelineEvent::ResultOverwritten {
                    key,
                    previous_owner: previous,
                    layer: layer.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn published(&self, layer: &LayerConfig, feature_count: usize) {
        tracing::debug!(layer = %layer.name, status = LayerStatus::Published.as_str(), "Layer published");
        self.events.emit(PipelineEvent::LayerPublished {
            layer: layer.name.clone(),
            feature_count,
        });
    }
}

/// Attach layer, step and tag to an operation failure. Internal errors pass
/// through untouched.
fn wrap_error(err: GeocadError, layer: &str, step: usize, op_type: &str) -> GeocadError {
    match err {
        e if e.is_internal() => e,
        e @ GeocadError::OperationExecution { .. } => e,
        e => GeocadError::OperationExecution {
            layer: layer.to_string(),
            step,
            op_type: op_type.to_string(),
            message: e.to_string(),
        },
    }
}
