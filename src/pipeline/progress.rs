//! Progress Events
//!
//! Coarse progress notifications emitted per stage to an optional
//! caller-supplied sink. This is the pipeline's only externally observable
//! side channel besides the return value.

use serde::Serialize;
use std::sync::Arc;

use crate::types::Stage;

/// Event kind within a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Start,
    Chunk,
    Complete,
}

/// One progress notification
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub kind: ProgressKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accumulated: Option<String>,
}

impl ProgressEvent {
    pub fn start(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind: ProgressKind::Start,
            message: Some(message.into()),
            chunk: None,
            accumulated: None,
        }
    }

    pub fn chunk(stage: Stage, chunk: impl Into<String>, accumulated: impl Into<String>) -> Self {
        Self {
            stage,
            kind: ProgressKind::Chunk,
            message: None,
            chunk: Some(chunk.into()),
            accumulated: Some(accumulated.into()),
        }
    }

    pub fn complete(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind: ProgressKind::Complete,
            message: Some(message.into()),
            chunk: None,
            accumulated: None,
        }
    }
}

/// Caller-supplied progress sink
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// No-op-capable wrapper held by the orchestrator
#[derive(Clone, Default)]
pub struct Progress {
    sink: Option<ProgressSink>,
}

impl Progress {
    pub fn new(sink: Option<ProgressSink>) -> Self {
        Self { sink }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.sink {
            sink(event);
        }
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_events_reach_sink_in_order() {
        let seen: Arc<Mutex<Vec<(Stage, ProgressKind)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let progress = Progress::new(Some(Arc::new(move |event: ProgressEvent| {
            sink_seen.lock().unwrap().push((event.stage, event.kind));
        })));

        progress.emit(ProgressEvent::start(Stage::Intent, "analyzing"));
        progress.emit(ProgressEvent::complete(Stage::Intent, "done"));

        let events = seen.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                (Stage::Intent, ProgressKind::Start),
                (Stage::Intent, ProgressKind::Complete)
            ]
        );
    }

    #[test]
    fn test_no_sink_is_noop() {
        let progress = Progress::default();
        assert!(!progress.is_active());
        progress.emit(ProgressEvent::start(Stage::Code, "generating"));
    }
}
