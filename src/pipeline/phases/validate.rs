use crate::pipeline::context::RunContext;
use crate::pipeline::phase_trait::{GenerationPhase, RunState};
use crate::pipeline::report::FatalError;
use crate::pipeline::resolver::{self, ResolveError};
use crate::progress::ProgressEvent;
use crate::stack::ComponentId;
use crate::validation::validate_stack;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Stack compatibility, component self-checks and dependency resolution.
pub struct ValidatePhase;

impl GenerationPhase for ValidatePhase {
    fn name(&self) -> &'static str {
        "ValidatePhase"
    }

    fn reaches(&self) -> RunState {
        RunState::Validated
    }

    fn execute(&self, run: &mut RunContext<'_>) -> Result<(), Vec<FatalError>> {
        let mut errors: Vec<FatalError> = Vec::new();

        let report = validate_stack(run.project.stack());
        run.emit(ProgressEvent::ValidationComplete {
            warnings: report.warnings.len(),
            errors: report.errors.len(),
        });
        errors.extend(report.errors.into_iter().map(FatalError::from));
        run.warnings.extend(report.warnings);

        let mut failed: BTreeSet<ComponentId> = BTreeSet::new();
        for (id, provider) in &run.components {
            match provider.validate_configuration(&run.project) {
                Ok(()) => debug!(component = %id, "Configuration valid"),
                Err(message) => {
                    warn!(component = %id, "{}", message);
                    failed.insert(id.clone());
                    errors.push(FatalError::InvalidConfiguration {
                        component: id.clone(),
                        message,
                    });
                }
            }
        }

        let connection_warnings = run.project.validate_connections();
        run.warnings.extend(connection_warnings);

        let components: Vec<ComponentId> = run.components.keys().cloned().collect();
        let resolution = resolver::resolve(&components, &run.dependencies, &run.project);
        for error in resolution.errors {
            match &error {
                ResolveError::UnresolvedDependency { component, .. } if !failed.contains(component) => {
                    run.warnings.push(error.to_string());
                }
                _ => errors.push(FatalError::from(error)),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let order: Vec<String> = resolution.order.iter().map(ToString::to_string).collect();
        info!(order = %order.join(" -> "), "Resolved generation order");
        run.order = resolution.order;
        run.edges = resolution.edges;
        Ok(())
    }
}
