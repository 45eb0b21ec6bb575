//! Generation engine: phases, dependency resolution and auto-wiring.
//!
//! A run moves through `Init -> ServicesRegistered -> Validated -> AutoWired
//! -> Generated -> Done`, or to `Failed` from any setup phase.

pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod report;
pub mod resolver;
pub mod wiring;

pub use context::RunContext;
pub use orchestrator::{GenerationOrchestrator, GenerationRequest};
pub use phase_trait::{GenerationPhase, RunState};
pub use report::{ComponentError, FatalError, GenerationFailure, GenerationOutcome};
pub use resolver::{resolve, Resolution, ResolveError};
pub use wiring::{storage_adapter, AdapterTool, ConnectionSummary, StorageTarget, Wiring};
