use crate::pipeline::context::RunContext;
use crate::pipeline::phase_trait::{GenerationPhase, RunState};
use crate::pipeline::report::FatalError;
use crate::stack::{ComponentId, ServiceScope};
use tracing::{debug, info, warn};

/// Instantiates every selected provider and lets it register its services.
pub struct RegisterServicesPhase;

impl GenerationPhase for RegisterServicesPhase {
    fn name(&self) -> &'static str {
        "RegisterServicesPhase"
    }

    fn reaches(&self) -> RunState {
        RunState::ServicesRegistered
    }

    fn execute(&self, run: &mut RunContext<'_>) -> Result<(), Vec<FatalError>> {
        let selected: Vec<ComponentId> = run.project.stack().component_ids();
        let mut errors = Vec::new();

        for id in selected {
            let provider = match run.registry.get(id.category, &id.name) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(component = %id, "Skipping category: {}", e);
                    run.warn(e.to_string());
                    continue;
                }
            };

            let registered = {
                let mut scope = ServiceScope::new(id.clone(), &mut run.project);
                provider.register_services(&mut scope).map(|_| scope.registered())
            };
            match registered {
                Ok(count) => debug!(component = %id, services = count, "Registered services"),
                Err(e) => errors.push(FatalError::from(e)),
            }

            let dependencies = provider.dependencies();
            if !dependencies.is_empty() {
                debug!(component = %id, dependencies = dependencies.len(), "Declared dependencies");
            }
            run.dependencies.insert(id.clone(), dependencies);
            run.components.insert(id, provider);
        }

        info!(
            components = run.components.len(),
            services = run.project.connections().len(),
            "Services registered"
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::RngSecretSource;
    use crate::stack::{Category, ProjectContext, ProviderRegistry, Stack};

    #[test]
    fn test_missing_provider_is_skipped_with_warning() {
        let registry = ProviderRegistry::with_defaults();
        let stack = Stack::new()
            .with(Category::Storage, "PostgreSQL")
            .with(Category::Visualization, "Tableau");
        let project =
            ProjectContext::with_secret_source("acme", stack, Box::new(RngSecretSource::seeded(2)));
        let mut run = RunContext::new(&registry, project, "antigravity_net", None);

        RegisterServicesPhase.execute(&mut run).unwrap();

        assert_eq!(run.components.len(), 1);
        assert!(run.project.connection("postgres").is_some());
        assert_eq!(run.warnings.len(), 1);
        assert!(run.warnings[0].contains("Tableau"));
    }
}
