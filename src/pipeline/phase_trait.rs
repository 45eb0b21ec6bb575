use super::context::RunContext;
use super::report::FatalError;
use std::fmt;

/// Where a run currently stands. `Failed` is reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ServicesRegistered,
    Validated,
    AutoWired,
    Generated,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::ServicesRegistered => "services_registered",
            RunState::Validated => "validated",
            RunState::AutoWired => "auto_wired",
            RunState::Generated => "generated",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub trait GenerationPhase {
    fn name(&self) -> &'static str;

    /// State the run is in once this phase succeeds.
    fn reaches(&self) -> RunState;

    /// Every fatal error found, so callers see them as one batch.
    fn execute(&self, run: &mut RunContext<'_>) -> Result<(), Vec<FatalError>>;
}
