use super::context::RunContext;
use super::phase_trait::{GenerationPhase, RunState};
use super::phases::{
    AssemblePhase, AutoWirePhase, GeneratePhase, RegisterServicesPhase, ValidatePhase,
};
use super::report::{FatalError, GenerationFailure, GenerationOutcome};
use crate::config::DEFAULT_NETWORK;
use crate::output::RunMetadata;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::secrets::{RngSecretSource, SecretRegistry, SecretSource};
use crate::stack::{DataSource, ProjectContext, ProviderRegistry, Stack};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Inputs of one run.
pub struct GenerationRequest {
    pub project_name: String,
    pub stack: Stack,
    pub data_sources: Vec<DataSource>,
    pub secret_source: Option<Box<dyn SecretSource>>,
    pub previous: Option<RunMetadata>,
}

impl GenerationRequest {
    pub fn new(project_name: impl Into<String>, stack: Stack) -> Self {
        Self {
            project_name: project_name.into(),
            stack,
            data_sources: Vec::new(),
            secret_source: None,
            previous: None,
        }
    }

    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_sources.push(source);
        self
    }

    /// Fixes where secret values come from, e.g. a seeded source in tests.
    pub fn with_secret_source(mut self, source: Box<dyn SecretSource>) -> Self {
        self.secret_source = Some(source);
        self
    }

    /// Regenerates a project previously described by `previous`.
    pub fn updating(mut self, previous: RunMetadata) -> Self {
        self.previous = Some(previous);
        self
    }
}

/// Drives a run through registration, validation, wiring, generation and
/// assembly. Setup phases fail as a batch; generation tolerates failing
/// components.
pub struct GenerationOrchestrator<'r> {
    registry: &'r ProviderRegistry,
    secrets: SecretRegistry,
    network: String,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl<'r> GenerationOrchestrator<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            secrets: SecretRegistry::new(),
            network: DEFAULT_NETWORK.to_string(),
            progress_handler: None,
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_secrets(mut self, secrets: SecretRegistry) -> Self {
        self.secrets = secrets;
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    fn fail(&self, errors: Vec<FatalError>, warnings: Vec<String>) -> GenerationFailure {
        self.emit(ProgressEvent::Failed {
            errors: errors.iter().map(ToString::to_string).collect(),
        });
        GenerationFailure { errors, warnings }
    }

    /// Fresh context with the stack's secrets already in place.
    fn project_context(
        &self,
        request: GenerationRequest,
    ) -> Result<(ProjectContext, Option<RunMetadata>), Vec<FatalError>> {
        let GenerationRequest {
            project_name,
            stack,
            data_sources,
            secret_source,
            previous,
        } = request;

        let mut source = secret_source
            .unwrap_or_else(|| Box::new(RngSecretSource::from_entropy()) as Box<dyn SecretSource>);
        let secrets = self
            .secrets
            .secrets_for_stack(&stack, &project_name, source.as_mut());
        let mut project = ProjectContext::with_secret_source(project_name, stack, source);
        project.extend_secrets(secrets);

        let mut errors = Vec::new();
        for data_source in data_sources {
            if let Err(e) = project.add_data_source(data_source) {
                errors.push(FatalError::from(e));
            }
        }
        if errors.is_empty() {
            Ok((project, previous))
        } else {
            Err(errors)
        }
    }

    pub fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationFailure> {
        let start = Instant::now();
        info!(
            "Starting generation for project: {} ({})",
            request.project_name, request.stack
        );
        self.emit(ProgressEvent::Started {
            project: request.project_name.clone(),
            components: request.stack.selected().count(),
        });

        let (project, previous) = self
            .project_context(request)
            .map_err(|errors| self.fail(errors, Vec::new()))?;
        let mut run = RunContext::new(
            self.registry,
            project,
            &self.network,
            self.progress_handler.clone(),
        );
        run.previous = previous;

        let phases: Vec<Box<dyn GenerationPhase>> = vec![
            Box::new(RegisterServicesPhase),
            Box::new(ValidatePhase),
            Box::new(AutoWirePhase),
            Box::new(GeneratePhase),
            Box::new(AssemblePhase),
        ];

        for phase in phases {
            let phase_name = phase.name();
            info!("Phase: {}", phase_name);
            self.emit(ProgressEvent::PhaseStarted {
                phase: phase_name.to_string(),
            });

            let phase_start = Instant::now();
            if let Err(errors) = phase.execute(&mut run) {
                run.state = RunState::Failed;
                info!(phase = phase_name, errors = errors.len(), "Run failed");
                return Err(self.fail(errors, run.warnings));
            }
            run.state = phase.reaches();

            self.emit(ProgressEvent::PhaseComplete {
                phase: phase_name.to_string(),
                duration: phase_start.elapsed(),
            });
            debug!("Phase {} complete, state {}", phase_name, run.state);
        }

        info!(
            "Generation complete: {} file(s), {} component failure(s)",
            run.output.len(),
            run.component_errors.len()
        );
        self.emit(ProgressEvent::Completed {
            files: run.output.len(),
            duration: start.elapsed(),
        });

        Ok(run.into_outcome())
    }
}
