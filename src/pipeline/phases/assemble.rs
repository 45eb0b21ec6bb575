use crate::output::{
    architecture, devtools, env_files, RunMetadata, ARCHITECTURE_FILE, COMPOSE_FILE,
    DEVCONTAINER_PATH, GITIGNORE, MAKEFILE, METADATA_FILE, SWITCH_ENV_PATH, SWITCH_ENV_SCRIPT,
};
use crate::pipeline::context::RunContext;
use crate::pipeline::phase_trait::{GenerationPhase, RunState};
use crate::pipeline::report::FatalError;
use crate::stack::Stack;
use tracing::debug;

/// Adds the files owned by the run rather than by any component.
pub struct AssemblePhase;

impl AssemblePhase {
    fn readme(project: &str, stack: &Stack, ports: &[(String, u16)]) -> String {
        let mut readme = format!("# {}\n\nData platform generated by antigravity.\n\n## Stack\n\n", project);
        for (category, provider) in stack.selected() {
            readme.push_str(&format!("- **{}**: {}\n", category, provider));
        }
        if !ports.is_empty() {
            readme.push_str("\n## Services\n\n| Service | Port |\n|---|---|\n");
            for (service, port) in ports {
                readme.push_str(&format!("| {} | {} |\n", service, port));
            }
        }
        readme.push_str(
            "\n## Quick start\n\n```bash\n./scripts/switch-env.sh dev\nmake up\n```\n\n\
             See ARCHITECTURE.md for how the components fit together.\n",
        );
        readme
    }
}

impl GenerationPhase for AssemblePhase {
    fn name(&self) -> &'static str {
        "AssemblePhase"
    }

    fn reaches(&self) -> RunState {
        RunState::Done
    }

    fn execute(&self, run: &mut RunContext<'_>) -> Result<(), Vec<FatalError>> {
        let project = run.project.project_name().to_string();
        let ports: Vec<(String, u16)> = run
            .project
            .ports()
            .iter()
            .map(|(s, p)| (s.clone(), *p))
            .collect();
        run.output
            .add("README.md", Self::readme(&project, run.project.stack(), &ports));

        if !run.compose.services.is_empty() {
            let yaml = run
                .compose
                .to_yaml()
                .map_err(|e| vec![FatalError::Assembly(format!("{:#}", e))])?;
            run.output.add(COMPOSE_FILE, yaml);
        }

        for (path, content) in env_files(&run.env) {
            run.output.add(path, content);
        }
        run.output.add(SWITCH_ENV_PATH, SWITCH_ENV_SCRIPT);
        run.output.add(".gitignore", GITIGNORE);
        run.output.add(
            MAKEFILE,
            devtools::makefile(&project, run.project.stack(), &run.compose),
        );
        if let Some(json) = devtools::devcontainer(&project, run.project.stack(), &run.compose) {
            let json = json.map_err(|e| vec![FatalError::Assembly(e.to_string())])?;
            run.output.add(DEVCONTAINER_PATH, json);
        }

        let generated: Vec<_> = run
            .order
            .iter()
            .filter(|id| !run.component_errors.iter().any(|e| &e.component == *id))
            .cloned()
            .collect();
        run.output.add(
            ARCHITECTURE_FILE,
            architecture::render(&project, &generated, &run.edges),
        );

        let metadata = match run.previous.take() {
            Some(mut previous) => {
                previous.project.name = project.clone();
                previous.project.stack = run.project.stack().clone();
                previous.touch();
                previous
            }
            None => RunMetadata::new(project, run.project.stack().clone()),
        };
        let yaml = metadata
            .to_yaml()
            .map_err(|e| vec![FatalError::Assembly(e.to_string())])?;
        run.output.add(METADATA_FILE, yaml);

        debug!(files = run.output.len(), "Assembled project");
        Ok(())
    }
}
