//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a stack is generated
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { project: String, components: usize },

    PhaseStarted { phase: String },

    PhaseComplete { phase: String, duration: Duration },

    /// Stack compatibility checked
    ValidationComplete { warnings: usize, errors: usize },

    /// A component wrote its files
    ComponentGenerated { component: String, files: usize },

    /// A component's generate hook failed; the run continues
    ComponentFailed { component: String, error: String },

    /// Run completed, possibly with component failures
    Completed { files: usize, duration: Duration },

    /// Run aborted before generation
    Failed { errors: Vec<String> },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {
        // Intentionally empty
    }
}
