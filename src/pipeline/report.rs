//! What a run hands back to its caller

use super::resolver::ResolveError;
use crate::output::OutputContainer;
use crate::stack::{ComponentId, ContextError};
use crate::validation::StackError;
use serde::Serialize;
use thiserror::Error;

/// An error that stops a run before anything is generated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("{component}: {message}")]
    InvalidConfiguration {
        component: ComponentId,
        message: String,
    },

    #[error("Failed to assemble project: {0}")]
    Assembly(String),
}

impl FatalError {
    pub fn kind(&self) -> &'static str {
        match self {
            FatalError::Stack(StackError::MissingRequiredCategory { .. }) => "missing_required_category",
            FatalError::Stack(StackError::IncompatibleStack { .. }) => "incompatible_stack",
            FatalError::Resolve(ResolveError::CyclicDependency { .. }) => "cyclic_dependency",
            FatalError::Resolve(ResolveError::UnresolvedDependency { .. }) => "unresolved_dependency",
            FatalError::Context(_) => "invalid_context",
            FatalError::InvalidConfiguration { .. } => "invalid_configuration",
            FatalError::Assembly(_) => "assembly",
        }
    }
}

/// A component whose generate hook failed. The rest of the run went on.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("Failed to generate {component}: {message}")]
pub struct ComponentError {
    pub component: ComponentId,
    pub message: String,
}

/// A finished run. `component_errors` is non-empty for a partial project.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub output: OutputContainer,
    pub warnings: Vec<String>,
    pub component_errors: Vec<ComponentError>,
    pub order: Vec<ComponentId>,
}

impl GenerationOutcome {
    pub fn is_partial(&self) -> bool {
        !self.component_errors.is_empty()
    }
}

/// A run that stopped during setup. No files were produced.
#[derive(Debug, Error, Clone)]
#[error("Generation failed with {} error(s)", .errors.len())]
pub struct GenerationFailure {
    pub errors: Vec<FatalError>,
    pub warnings: Vec<String>,
}

impl GenerationFailure {
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}
