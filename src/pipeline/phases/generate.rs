use crate::output::OutputContainer;
use crate::pipeline::context::RunContext;
use crate::pipeline::phase_trait::{GenerationPhase, RunState};
use crate::pipeline::report::{ComponentError, FatalError};
use crate::pipeline::wiring::Wiring;
use crate::progress::ProgressEvent;
use crate::stack::GenerationContext;
use tracing::{debug, warn};

/// Runs each component's generate hook in resolved order.
///
/// A failing component is recorded and skipped: its files and compose
/// services are dropped, the remaining components still run.
pub struct GeneratePhase;

impl GenerationPhase for GeneratePhase {
    fn name(&self) -> &'static str {
        "GeneratePhase"
    }

    fn reaches(&self) -> RunState {
        RunState::Generated
    }

    fn execute(&self, run: &mut RunContext<'_>) -> Result<(), Vec<FatalError>> {
        let unwired = Wiring::None;
        run.env.extend(run.project.env_vars());

        for id in run.order.clone() {
            let Some(provider) = run.components.get(&id) else {
                continue;
            };
            let ctx = GenerationContext {
                project: &run.project,
                wiring: run.wiring.get(&id).unwrap_or(&unwired),
                component: &id,
            };

            let mut staged = OutputContainer::new();
            match provider.generate(&ctx, &mut staged) {
                Ok(()) => {
                    let files = staged.len();
                    let replaced = run
                        .compose
                        .add_services(&id, provider.compose_services(&run.project));
                    run.compose.add_volumes(provider.compose_volumes());
                    run.env.extend(provider.env_vars(&run.project));
                    run.output.merge(staged);

                    for name in replaced {
                        run.warnings.push(format!(
                            "Compose service '{}' from {} replaced a service from another component",
                            name, id
                        ));
                    }
                    debug!(component = %id, files, "Generated component");
                    run.emit(ProgressEvent::ComponentGenerated {
                        component: id.to_string(),
                        files,
                    });
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!(component = %id, error = %message, "Component generation failed, continuing");
                    run.emit(ProgressEvent::ComponentFailed {
                        component: id.to_string(),
                        error: message.clone(),
                    });
                    run.component_errors.push(ComponentError {
                        component: id.clone(),
                        message,
                    });
                }
            }
        }
        Ok(())
    }
}
