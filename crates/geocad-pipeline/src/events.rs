//! Run event system for observability.
//!
//! Emits [`PipelineEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! observers (the CLI, loggers, progress displays) can follow layer processing
//! without coupling to executor internals. Sending never blocks and needs no
//! async runtime.

use serde::{Deserialize, Serialize};

/// Events emitted while a configuration is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    RunStarted {
        project: String,
        layer_count: usize,
    },
    RunCompleted {
        project: String,
        processed_layers: Vec<String>,
        duration_ms: u64,
    },
    RunFailed {
        project: String,
        error: String,
    },
    LayerStarted {
        layer: String,
    },
    LayerSkipped {
        layer: String,
    },
    SourceLoaded {
        layer: String,
        path: String,
        feature_count: usize,
    },
    OperationStarted {
        layer: String,
        step: usize,
        op_type: String,
    },
    OperationCompleted {
        layer: String,
        step: usize,
        output_key: String,
        feature_count: usize,
        duration_ms: u64,
    },
    ResultOverwritten {
        key: String,
        previous_owner: String,
        layer: String,
    },
    LayerPublished {
        layer: String,
        feature_count: usize,
    },
    LayerFailed {
        layer: String,
        error: String,
    },
}

impl PipelineEvent {
    /// Layer the event concerns, if any.
    pub fn layer(&self) -> Option<&str> {
        match self {
            PipelineEvent::RunStarted { .. }
            | PipelineEvent::RunCompleted { .. }
            | PipelineEvent::RunFailed { .. } => None,
            PipelineEvent::LayerStarted { layer }
            | PipelineEvent::LayerSkipped { layer }
            | PipelineEvent::SourceLoaded { layer, .. }
            | PipelineEvent::OperationStarted { layer, .. }
            | PipelineEvent::OperationCompleted { layer, .. }
            | PipelineEvent::ResultOverwritten { layer, .. }
            | PipelineEvent::LayerPublished { layer, .. }
            | PipelineEvent::LayerFailed { layer, .. } => Some(layer),
        }
    }
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_sends_and_receives() {
        let emitter = EventEmitter::new(16);
        let mut rx = emitter.subscribe();

        emitter.emit(PipelineEvent::RunStarted {
            project: "site".into(),
            layer_count: 3,
        });

        match rx.try_recv().unwrap() {
            PipelineEvent::RunStarted {
                project,
                layer_count,
            } => {
                assert_eq!(project, "site");
                assert_eq!(layer_count, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn multiple_subscribers_receive_same_event() {
        let emitter = EventEmitter::new(16);
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();

        emitter.emit(PipelineEvent::LayerPublished {
            layer: "parcels".into(),
            feature_count: 4,
        });

        let json1 = serde_json::to_string(&rx1.try_recv().unwrap()).unwrap();
        let json2 = serde_json::to_string(&rx2.try_recv().unwrap()).unwrap();
        assert_eq!(json1, json2);
    }

    #[test]
    fn emit_with_no_subscribers_does_not_panic() {
        let emitter = EventEmitter::new(16);
        emitter.emit(PipelineEvent::RunFailed {
            project: "oops".into(),
            error: "something went wrong".into(),
        });
    }

    #[test]
    fn event_layer_accessor() {
        let started = PipelineEvent::OperationStarted {
            layer: "roads".into(),
            step: 0,
            op_type: "buffer".into(),
        };
        assert_eq!(started.layer(), Some("roads"));
        let run = PipelineEvent::RunStarted {
            project: "p".into(),
            layer_count: 0,
        };
        assert_eq!(run.layer(), None);
    }

    #[test]
    fn event_serialization_round_trip() {
        let event = PipelineEvent::OperationCompleted {
            layer: "zone".into(),
            step: 1,
            output_key: "zone".into(),
            feature_count: 7,
            duration_ms: 12,
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: PipelineEvent = serde_json::from_str(&json).unwrap();

        match deserialized {
            PipelineEvent::OperationCompleted {
                layer,
                step,
                output_key,
                feature_count,
                ..
            } => {
                assert_eq!(layer, "zone");
                assert_eq!(step, 1);
                assert_eq!(output_key, "zone");
                assert_eq!(feature_count, 7);
            }
            other => panic!("unexpected variant after round-trip: {:?}", other),
        }
    }
}
