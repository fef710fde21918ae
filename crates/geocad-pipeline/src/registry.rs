//! Operation trait, dynamic dispatch wrapper, and operation registry.

use std::collections::HashMap;

use geocad_config::Parameters;
use geocad_types::{FeatureCollection, GeocadError, Result};

use crate::operations;
use crate::store::ResultStore;

// ---------------------------------------------------------------------------
// Operation trait
// ---------------------------------------------------------------------------

pub trait Operation: Send + Sync {
    /// The operation type tag (e.g. "buffer", "difference").
    fn op_type(&self) -> &str;

    /// Whether the step needs an upstream stream. Generative operations that
    /// build their output from named layers return `false`.
    fn requires_input(&self, _params: &Parameters) -> bool {
        true
    }

    /// Names this step reads through the Result Store. Consulted by the
    /// dependency resolver before anything runs.
    fn referenced_layers(&self, params: &Parameters) -> Vec<String> {
        operations::layer_list(params, "layers")
    }

    /// Check parameters at planning time.
    fn validate_params(&self, _params: &Parameters) -> Result<()> {
        Ok(())
    }

    /// Execute this operation for one step of a layer's chain.
    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection>;
}

// ---------------------------------------------------------------------------
// OperationContext — what a running operation may see
// ---------------------------------------------------------------------------

/// Read-only view handed to an executing operation: which layer and step it
/// runs for, the Result Store, and the tracing span of the step.
pub struct OperationContext<'a> {
    layer: &'a str,
    step: usize,
    store: &'a ResultStore,
    span: tracing::Span,
}

impl<'a> OperationContext<'a> {
    pub fn new(layer: &'a str, step: usize, store: &'a ResultStore) -> Self {
        Self {
            layer,
            step,
            store,
            span: tracing::Span::none(),
        }
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn layer(&self) -> &str {
        self.layer
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Fetch a published layer or named intermediate result.
    pub fn resolve_named(&self, key: &str) -> Result<&'a FeatureCollection> {
        self.store.get(key)
    }

    /// Fetch several named results, preserving the requested order.
    pub fn resolve_all(&self, keys: &[String]) -> Result<Vec<&'a FeatureCollection>> {
        keys.iter().map(|k| self.store.get(k)).collect()
    }
}

// ---------------------------------------------------------------------------
// DynOperation — object-safe wrapper
// ---------------------------------------------------------------------------

pub struct DynOperation(Box<dyn Operation>);

impl DynOperation {
    pub fn new(operation: impl Operation + 'static) -> Self {
        Self(Box::new(operation))
    }

    pub fn op_type(&self) -> &str {
        self.0.op_type()
    }

    pub fn requires_input(&self, params: &Parameters) -> bool {
        self.0.requires_input(params)
    }

    pub fn referenced_layers(&self, params: &Parameters) -> Vec<String> {
        self.0.referenced_layers(params)
    }

    pub fn validate_params(&self, params: &Parameters) -> Result<()> {
        self.0.validate_params(params)
    }

    pub fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        self.0.execute(input, params, context)
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

pub struct OperationRegistry {
    operations: HashMap<String, DynOperation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Register under the operation's own tag. Last registration wins.
    pub fn register(&mut self, operation: impl Operation + 'static) {
        let t = operation.op_type().to_string();
        self.register_as(t, operation);
    }

    /// Register under an explicit tag, e.g. an alias or a test override.
    pub fn register_as(&mut self, op_type: impl Into<String>, operation: impl Operation + 'static) {
        let op_type = op_type.into();
        if self.operations.contains_key(&op_type) {
            tracing::debug!(op_type = %op_type, "Replacing registered operation");
        }
        self.operations.insert(op_type, DynOperation::new(operation));
    }

    /// Look up the operation for a step, failing with `UnknownOperation`.
    pub fn resolve(&self, op_type: &str, layer: &str, step: usize) -> Result<&DynOperation> {
        self.operations
            .get(op_type)
            .ok_or_else(|| GeocadError::UnknownOperation {
                op_type: op_type.to_string(),
                layer: layer.to_string(),
                step,
            })
    }

    pub fn get(&self, op_type: &str) -> Option<&DynOperation> {
        self.operations.get(op_type)
    }

    pub fn has(&self, op_type: &str) -> bool {
        self.operations.contains_key(op_type)
    }

    /// Registered tags, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Default registry factory
// ---------------------------------------------------------------------------

pub fn default_registry() -> OperationRegistry {
    let mut reg = OperationRegistry::new();
    reg.register(operations::BufferOperation);
    reg.register(operations::IntersectionOperation);
    reg.register(operations::DifferenceOperation);
    reg.register(operations::DissolveOperation);
    reg.register(operations::MergeOperation);
    reg.register_as("copy", operations::MergeOperation);
    reg.register(operations::FilterOperation);
    reg.register(operations::CalculateOperation);
    reg.register(operations::LabelOperation);
    reg
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
