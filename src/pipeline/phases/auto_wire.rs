use crate::pipeline::context::RunContext;
use crate::pipeline::phase_trait::{GenerationPhase, RunState};
use crate::pipeline::report::FatalError;
use crate::pipeline::wiring::Wiring;
use tracing::debug;

/// Derives per-component wiring from the registered connections.
pub struct AutoWirePhase;

impl GenerationPhase for AutoWirePhase {
    fn name(&self) -> &'static str {
        "AutoWirePhase"
    }

    fn reaches(&self) -> RunState {
        RunState::AutoWired
    }

    fn execute(&self, run: &mut RunContext<'_>) -> Result<(), Vec<FatalError>> {
        for id in &run.order {
            let wiring = Wiring::for_category(id.category, &run.project);
            if !wiring.is_none() {
                debug!(component = %id, "Auto-wired");
            }
            run.wiring.insert(id.clone(), wiring);
        }
        Ok(())
    }
}
