//! Shared types, errors, and feature collections for the geocad layer pipeline.
//!
//! This crate provides the foundational types used across all other geocad crates:
//! - `GeocadError` — unified error taxonomy
//! - `Feature` / `FeatureCollection` — the unit of data flowing between operations
//! - `LayerStatus` / `LayerOutcome` — per-layer lifecycle state and result summary

pub mod feature;

pub use feature::{Attributes, Feature, FeatureCollection};

use serde::{Deserialize, Serialize};

/// Unified error type for all geocad subsystems.
#[derive(Debug, thiserror::Error)]
pub enum GeocadError {
    // === Configuration Errors ===
    #[error("Configuration parse error at line {line}, col {col}: {message}")]
    ConfigParse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layer name '{layer}' is declared more than once")]
    DuplicateLayer { layer: String },

    #[error("Layer '{layer}' is invalid: {message}")]
    InvalidLayer { layer: String, message: String },

    #[error("Layer '{layer}' has no source and no operations")]
    EmptyLayer { layer: String },

    #[error("Unknown operation type '{op_type}' in layer '{layer}' (step {step})")]
    UnknownOperation {
        op_type: String,
        layer: String,
        step: usize,
    },

    #[error("Invalid parameters for operation '{op_type}': {message}")]
    InvalidParameter { op_type: String, message: String },

    #[error("Operation '{op_type}' in layer '{layer}' (step {step}) has no input stream")]
    MissingInput {
        op_type: String,
        layer: String,
        step: usize,
    },

    #[error("'{referrer}' references unknown layer or result '{reference}'")]
    UnresolvedReference { reference: String, referrer: String },

    #[error("Cyclic layer dependency: {}", .layers.join(" -> "))]
    CyclicDependency { layers: Vec<String> },

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    // === I/O Errors ===
    #[error("Failed to read {format} source '{path}': {message}")]
    SourceRead {
        path: String,
        format: String,
        message: String,
    },

    #[error("Failed to write '{path}': {message}")]
    ExportWrite { path: String, message: String },

    // === Execution Errors ===
    #[error("Operation '{op_type}' failed in layer '{layer}' (step {step}): {message}")]
    OperationExecution {
        layer: String,
        step: usize,
        op_type: String,
        message: String,
    },

    #[error("Result '{key}' was already written by layer '{layer}'")]
    DuplicateResult { key: String, layer: String },

    #[error("Internal error: result '{key}' requested before it was produced")]
    MissingResult { key: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl GeocadError {
    /// Returns `true` for errors detected while planning, before any geometry work.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GeocadError::ConfigParse { .. }
                | GeocadError::Config(_)
                | GeocadError::DuplicateLayer { .. }
                | GeocadError::InvalidLayer { .. }
                | GeocadError::EmptyLayer { .. }
                | GeocadError::UnknownOperation { .. }
                | GeocadError::InvalidParameter { .. }
                | GeocadError::MissingInput { .. }
                | GeocadError::UnresolvedReference { .. }
                | GeocadError::CyclicDependency { .. }
                | GeocadError::Validation(_)
        )
    }

    /// Returns `true` if the error indicates a bug in the resolver or processor
    /// rather than a problem with the user's configuration or data.
    pub fn is_internal(&self) -> bool {
        matches!(self, GeocadError::MissingResult { .. })
    }

    /// Maps the error to a process exit status for the CLI.
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            return 2;
        }
        match self {
            GeocadError::SourceRead { .. }
            | GeocadError::ExportWrite { .. }
            | GeocadError::Io(_)
            | GeocadError::Json(_) => 3,
            GeocadError::OperationExecution { .. } | GeocadError::DuplicateResult { .. } => 4,
            GeocadError::MissingResult { .. } => 70,
            _ => 1,
        }
    }
}

/// A convenience alias for `Result<T, GeocadError>`.
pub type Result<T> = std::result::Result<T, GeocadError>;

// ---------------------------------------------------------------------------
// LayerStatus — lifecycle state of a layer during a run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    Pending,
    SourceLoaded,
    Skipped,
    Chaining,
    Published,
    Done,
    Failed,
}

impl LayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerStatus::Pending => "pending",
            LayerStatus::SourceLoaded => "source_loaded",
            LayerStatus::Skipped => "skipped",
            LayerStatus::Chaining => "chaining",
            LayerStatus::Published => "published",
            LayerStatus::Done => "done",
            LayerStatus::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// LayerOutcome — summary of processing one layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerOutcome {
    pub layer: String,
    pub status: LayerStatus,
    pub feature_count: usize,
    /// Every Result Store key this layer wrote, in write order.
    pub result_keys: Vec<String>,
}

impl LayerOutcome {
    /// Outcome of a layer that finished its chain and published a result.
    pub fn done(layer: impl Into<String>, feature_count: usize, result_keys: Vec<String>) -> Self {
        Self {
            layer: layer.into(),
            status: LayerStatus::Done,
            feature_count,
            result_keys,
        }
    }

    /// Outcome of a disabled layer.
    pub fn skipped(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            status: LayerStatus::Skipped,
            feature_count: 0,
            result_keys: Vec::new(),
        }
    }
}
