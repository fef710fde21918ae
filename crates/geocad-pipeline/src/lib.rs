//! Layer processing pipeline: operation registry, dependency resolution, and
//! chain execution.
//!
//! This crate implements the geocad core: string-tagged operations dispatched
//! through a registry, a named Result Store shared by all layers of a run, the
//! dependency resolver that orders layers, and the per-layer processor that
//! walks each operation chain. Validation lint rules run before anything is
//! read.

pub mod condition;
pub mod engine;
pub mod events;
pub mod geometry;
pub mod keys;
pub mod operations;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod store;
pub mod validation;

pub use condition::{evaluate_filter, parse_filter, Clause, FilterExpr, Operator};
pub use engine::{PipelineExecutor, PipelineResult};
pub use events::{EventEmitter, PipelineEvent};
pub use keys::{intermediate_key, output_keys, published_keys};
pub use operations::LayerList;
pub use processor::LayerProcessor;
pub use registry::{default_registry, DynOperation, Operation, OperationContext, OperationRegistry};
pub use resolver::{DependencyResolver, ExecutionPlan};
pub use source::{MemorySourceAdapter, SourceAdapter};
pub use store::ResultStore;
pub use validation::{lint, validate, validate_or_raise, Diagnostic, Finding, LintRule, Severity};
