//! `Makefile` and `.devcontainer/devcontainer.json` for the generated project

use super::{ComposeFile, Environment, SWITCH_ENV_PATH};
use crate::stack::Stack;
use serde_json::json;

pub const MAKEFILE: &str = "Makefile";
pub const DEVCONTAINER_PATH: &str = ".devcontainer/devcontainer.json";

/// Extra targets offered when `provider` is selected and its compose service exists.
const COMPONENT_TARGETS: &[(&str, &str, &str, &str)] = &[
    ("PostgreSQL", "postgres", "psql", "exec postgres sh -c 'psql -U \"$$POSTGRES_USER\" \"$$POSTGRES_DB\"'"),
    ("dbt", "dbt", "dbt-run", "run --rm dbt dbt run"),
    ("dbt", "dbt", "dbt-test", "run --rm dbt dbt test"),
    ("Airflow", "airflow", "airflow-shell", "exec airflow bash"),
    ("Soda", "soda", "soda-scan", "run --rm soda"),
    ("Great Expectations", "great-expectations", "ge-checkpoint", "run --rm great-expectations"),
];

const PYTHON_TOOLS: &[&str] = &[
    "dbt",
    "Airflow",
    "Prefect",
    "Dagster",
    "Mage",
    "dlt",
    "Soda",
    "Great Expectations",
];

pub fn makefile(project_name: &str, stack: &Stack, compose: &ComposeFile) -> String {
    let active = stack.active_providers();
    let targets: Vec<(&str, &str)> = COMPONENT_TARGETS
        .iter()
        .filter(|(provider, service, _, _)| {
            active.contains(provider) && compose.services.contains_key(*service)
        })
        .map(|(_, _, target, args)| (*target, *args))
        .collect();

    let mut phony = vec!["help", "up", "down", "logs", "ps", "clean"];
    let env_targets: Vec<String> = Environment::ALL
        .iter()
        .map(|env| format!("env-{}", env.name()))
        .collect();
    phony.extend(env_targets.iter().map(String::as_str));
    phony.extend(targets.iter().map(|(t, _)| *t));

    let mut out = format!(
        "# {project}\n\nCOMPOSE ?= docker compose\n\n.PHONY: {phony}\n\n\
         help:\n\t@grep -E '^[a-z-]+:' $(MAKEFILE_LIST) | cut -d: -f1\n\n\
         up:\n\t$(COMPOSE) up -d\n\n\
         down:\n\t$(COMPOSE) down\n\n\
         logs:\n\t$(COMPOSE) logs -f\n\n\
         ps:\n\t$(COMPOSE) ps\n\n\
         clean:\n\t$(COMPOSE) down -v --remove-orphans\n",
        project = project_name,
        phony = phony.join(" "),
    );
    for env in Environment::ALL {
        out.push_str(&format!(
            "\nenv-{name}:\n\t./{script} {name}\n",
            name = env.name(),
            script = SWITCH_ENV_PATH
        ));
    }
    for (target, args) in targets {
        out.push_str(&format!("\n{}:\n\t$(COMPOSE) {}\n", target, args));
    }
    out
}

/// Host side of every published `host:container` port mapping.
fn forwarded_ports(compose: &ComposeFile) -> Vec<u16> {
    let mut ports: Vec<u16> = compose
        .services
        .values()
        .flat_map(|s| s.ports.iter())
        .filter_map(|mapping| mapping.split(':').next()?.parse().ok())
        .collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}

fn extensions(stack: &Stack) -> Vec<&'static str> {
    let active = stack.active_providers();
    let mut extensions = vec!["ms-azuretools.vscode-docker"];
    if PYTHON_TOOLS.iter().any(|tool| active.contains(tool)) {
        extensions.push("ms-python.python");
    }
    if active.contains(&"dbt") {
        extensions.push("innoverio.vscode-dbt-power-user");
    }
    if active.contains(&"Terraform") {
        extensions.push("hashicorp.terraform");
    }
    if ["PostgreSQL", "Redshift", "DuckDB"].iter().any(|db| active.contains(db)) {
        extensions.push("mtxr.sqltools");
    }
    extensions
}

/// Attaches to the first compose service; `None` when there is nothing to attach to.
pub fn devcontainer(
    project_name: &str,
    stack: &Stack,
    compose: &ComposeFile,
) -> Option<Result<String, serde_json::Error>> {
    let service = compose.services.keys().next()?;
    let config = json!({
        "name": project_name,
        "dockerComposeFile": ["../docker-compose.yml"],
        "service": service,
        "runServices": compose.services.keys().collect::<Vec<_>>(),
        "workspaceFolder": "/workspace",
        "shutdownAction": "stopCompose",
        "forwardPorts": forwarded_ports(compose),
        "customizations": { "vscode": { "extensions": extensions(stack) } },
    });
    Some(serde_json::to_string_pretty(&config).map(|mut s| {
        s.push('\n');
        s
    }))
}
