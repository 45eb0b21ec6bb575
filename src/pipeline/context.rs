//! Mutable state threaded through the phases of one run

use super::phase_trait::RunState;
use super::report::{ComponentError, GenerationOutcome};
use super::wiring::Wiring;
use crate::output::{ComposeFile, OutputContainer, RunMetadata};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::stack::{ComponentId, DependencySpec, ProjectContext, Provider, ProviderRegistry};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct RunContext<'r> {
    pub registry: &'r ProviderRegistry,
    pub project: ProjectContext,
    pub state: RunState,

    /// Instantiated providers in stack order.
    pub components: IndexMap<ComponentId, Box<dyn Provider>>,
    pub dependencies: IndexMap<ComponentId, Vec<DependencySpec>>,

    // Resolution
    pub order: Vec<ComponentId>,
    pub edges: Vec<(ComponentId, ComponentId)>,
    pub wiring: IndexMap<ComponentId, Wiring>,

    // Generation
    pub output: OutputContainer,
    pub compose: ComposeFile,
    pub env: BTreeMap<String, String>,
    pub component_errors: Vec<ComponentError>,
    pub warnings: Vec<String>,

    /// Metadata of the project being updated, if any.
    pub previous: Option<RunMetadata>,

    progress: Option<Arc<dyn ProgressHandler>>,
}

impl<'r> RunContext<'r> {
    pub fn new(
        registry: &'r ProviderRegistry,
        project: ProjectContext,
        network: &str,
        progress: Option<Arc<dyn ProgressHandler>>,
    ) -> Self {
        Self {
            registry,
            project,
            state: RunState::Init,
            components: IndexMap::new(),
            dependencies: IndexMap::new(),
            order: Vec::new(),
            edges: Vec::new(),
            wiring: IndexMap::new(),
            output: OutputContainer::new(),
            compose: ComposeFile::new(network),
            env: BTreeMap::new(),
            component_errors: Vec::new(),
            warnings: Vec::new(),
            previous: None,
            progress,
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress {
            handler.on_progress(&event);
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn into_outcome(self) -> GenerationOutcome {
        GenerationOutcome {
            output: self.output,
            warnings: self.warnings,
            component_errors: self.component_errors,
            order: self.order,
        }
    }
}
