//! The provider plugin contract

use super::context::{ContextError, ProjectContext, ServiceConnection};
use super::ids::{Category, ComponentId, DependencySpec};
use crate::output::{ComposeService, OutputContainer};
use crate::pipeline::Wiring;
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// One technology choice within a category.
///
/// Every hook has a no-op default, so a provider only implements what it
/// contributes. Hooks receive the run context explicitly; providers keep no
/// per-run state.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> Category;

    fn id(&self) -> ComponentId {
        ComponentId::new(self.category(), self.name())
    }

    /// Registers the service connections this provider exposes.
    fn register_services(&self, _scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        Ok(())
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        Vec::new()
    }

    /// Checks that the peers this provider needs are present and usable.
    fn validate_configuration(&self, _context: &ProjectContext) -> Result<(), String> {
        Ok(())
    }

    /// Writes the provider's files. Only the given container is written.
    fn generate(&self, _ctx: &GenerationContext<'_>, _output: &mut OutputContainer) -> Result<()> {
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        IndexMap::new()
    }

    fn compose_volumes(&self) -> Vec<String> {
        Vec::new()
    }

    fn env_vars(&self, _context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Provider that contributes nothing. Useful as a placeholder and in tests.
#[derive(Debug, Clone)]
pub struct NoOpProvider {
    category: Category,
    name: String,
}

impl NoOpProvider {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl Provider for NoOpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }
}

/// Registration view of the context for one component. Connections
/// registered through it are stamped with the component's id.
pub struct ServiceScope<'a> {
    owner: ComponentId,
    context: &'a mut ProjectContext,
    registered: usize,
}

impl<'a> ServiceScope<'a> {
    pub fn new(owner: ComponentId, context: &'a mut ProjectContext) -> Self {
        Self {
            owner,
            context,
            registered: 0,
        }
    }

    pub fn owner(&self) -> &ComponentId {
        &self.owner
    }

    pub fn context(&self) -> &ProjectContext {
        self.context
    }

    pub fn project_name(&self) -> &str {
        self.context.project_name()
    }

    /// Shared secret value for `key`.
    pub fn secret(&mut self, key: &str) -> String {
        self.context.get_or_create_secret(key, 16)
    }

    pub fn secret_with_length(&mut self, key: &str, length: usize) -> String {
        self.context.get_or_create_secret(key, length)
    }

    pub fn port(&mut self, service: &str, default: u16) -> u16 {
        self.context.service_port(service, default)
    }

    /// New connection owned by this component.
    pub fn connection(&self, name: &str, service_type: &str) -> ServiceConnection {
        ServiceConnection::new(self.owner.clone(), name, service_type)
    }

    pub fn register(&mut self, mut connection: ServiceConnection) -> Result<(), ContextError> {
        connection.owner = self.owner.clone();
        self.context.register_connection(connection)?;
        self.registered += 1;
        Ok(())
    }

    pub fn registered(&self) -> usize {
        self.registered
    }
}

/// Everything a provider may read while generating.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub project: &'a ProjectContext,
    pub wiring: &'a Wiring,
    pub component: &'a ComponentId,
}

impl<'a> GenerationContext<'a> {
    pub fn project_name(&self) -> &str {
        self.project.project_name()
    }

    pub fn secret(&self, key: &str) -> Option<&'a str> {
        self.project.secret(key)
    }

    /// Selected storage provider, if any.
    pub fn storage(&self) -> Option<&'a str> {
        self.project.stack().get(Category::Storage)
    }
}
