//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                project,
                components,
            } => {
                info!(project = %project, components, "Starting generation");
            }
            ProgressEvent::PhaseStarted { phase } => {
                debug!(phase = %phase, "Starting phase");
            }
            ProgressEvent::PhaseComplete { phase, duration } => {
                info!(
                    phase = %phase,
                    duration_ms = duration.as_millis(),
                    "Phase complete"
                );
            }
            ProgressEvent::ValidationComplete { warnings, errors } => {
                if *errors > 0 {
                    warn!(warnings, errors, "Validation complete with errors");
                } else if *warnings > 0 {
                    info!(warnings, "Validation complete with warnings");
                } else {
                    debug!("Validation complete");
                }
            }
            ProgressEvent::ComponentGenerated { component, files } => {
                debug!(component = %component, files, "Component generated");
            }
            ProgressEvent::ComponentFailed { component, error } => {
                warn!(component = %component, error = %error, "Component generation failed");
            }
            ProgressEvent::Completed { files, duration } => {
                info!(
                    files,
                    total_time_ms = duration.as_millis(),
                    "Generation complete"
                );
            }
            ProgressEvent::Failed { errors } => {
                error!(errors = errors.len(), "Generation failed");
                for message in errors {
                    error!("  {}", message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_handler_accepts_every_event() {
        let handler = LoggingHandler;
        let events = vec![
            ProgressEvent::Started {
                project: "acme".to_string(),
                components: 1,
            },
            ProgressEvent::PhaseStarted {
                phase: "RegisterServices".to_string(),
            },
            ProgressEvent::PhaseComplete {
                phase: "RegisterServices".to_string(),
                duration: Duration::from_millis(1),
            },
            ProgressEvent::ValidationComplete {
                warnings: 1,
                errors: 0,
            },
            ProgressEvent::ComponentFailed {
                component: "storage:PostgreSQL".to_string(),
                error: "disk full".to_string(),
            },
            ProgressEvent::Failed {
                errors: vec!["Storage is required".to_string()],
            },
        ];
        for event in &events {
            handler.on_progress(event);
        }
    }
}
