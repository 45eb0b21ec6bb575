use super::{secret_or, service_map, storage_url};
use crate::output::{ComposeService, Healthcheck, OutputContainer};
use crate::pipeline::wiring::{storage_adapter, AdapterTool, ConnectionSummary};
use crate::stack::{
    Capability, Category, ContextError, GenerationContext, ProjectContext, Provider, ServiceScope,
};
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// One shell step an orchestrator schedules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    pub id: &'static str,
    pub command: String,
}

impl PipelineStep {
    fn new(id: &'static str, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
        }
    }
}

/// Steps derived from the services the orchestrator can see, in run order:
/// ingest, transform, test, quality.
pub fn pipeline_steps(connections: &[ConnectionSummary]) -> Vec<PipelineStep> {
    let has = |service_type: &str| connections.iter().any(|c| c.service_type == service_type);
    let mut steps = Vec::new();

    if has("dlt") {
        steps.push(PipelineStep::new("ingest", "python /opt/pipeline/ingestion/pipeline.py"));
    } else if has("airbyte") {
        steps.push(PipelineStep::new(
            "ingest",
            "curl -fsS -X POST http://airbyte-server:8001/api/v1/connections/sync",
        ));
    }

    if has("dbt") {
        steps.push(PipelineStep::new("transform", "cd /opt/pipeline/dbt_project && dbt run"));
        steps.push(PipelineStep::new("test", "cd /opt/pipeline/dbt_project && dbt test"));
    } else if has("spark") {
        steps.push(PipelineStep::new(
            "transform",
            "spark-submit --master spark://spark-master:7077 /opt/pipeline/spark_jobs/etl_job.py",
        ));
    }

    if has("great_expectations") {
        steps.push(PipelineStep::new(
            "quality",
            "cd /opt/pipeline/quality/great_expectations && great_expectations checkpoint run default",
        ));
    } else if has("soda") {
        steps.push(PipelineStep::new(
            "quality",
            "soda scan -d warehouse -c /opt/pipeline/quality/soda/configuration.yml /opt/pipeline/quality/soda/checks.yml",
        ));
    }

    steps
}

fn storage_env(context: &ProjectContext) -> Vec<(String, String)> {
    let db = context
        .service_by_capability(&Capability::Warehouse)
        .or_else(|| context.service_by_capability(&Capability::Database));
    let Some(db) = db else {
        return Vec::new();
    };
    let mut env = vec![
        ("DATA_DB_HOST".to_string(), db.host.clone()),
        ("DATA_DB_PORT".to_string(), db.port.to_string()),
        (
            "DATA_DB_USER".to_string(),
            db.credentials.get("username").cloned().unwrap_or_default(),
        ),
        (
            "DATA_DB_PASSWORD".to_string(),
            db.credentials.get("password").cloned().unwrap_or_default(),
        ),
    ];
    if let Some(url) = storage_url(context).or_else(|| db.connection_string()) {
        env.push(("DESTINATION__CREDENTIALS".to_string(), url));
    }
    env
}

fn with_storage_env(mut service: ComposeService, context: &ProjectContext) -> ComposeService {
    for (key, value) in storage_env(context) {
        service = service.env(key, value);
    }
    service
}

fn orchestrator_connection(
    scope: &mut ServiceScope<'_>,
    name: &str,
    default_port: u16,
) -> Result<(), ContextError> {
    let port = scope.port(name, default_port);
    let conn = scope
        .connection(name, name)
        .port(port)
        .env_prefix(format!("{}_", name.to_uppercase()))
        .capabilities([Capability::Orchestrator, Capability::Scheduler])
        .extra("webserver_port", port.to_string());
    scope.register(conn)
}

fn port_of(context: &ProjectContext, service: &str, default: u16) -> u16 {
    context.ports().get(service).copied().unwrap_or(default)
}

pub struct AirflowProvider;

impl AirflowProvider {
    fn dag(project: &str, steps: &[PipelineStep]) -> String {
        let mut dag = format!(
            r#"from datetime import datetime, timedelta

from airflow import DAG
from airflow.operators.bash import BashOperator

default_args = {{
    "owner": "data-team",
    "retries": 2,
    "retry_delay": timedelta(minutes=5),
}}

with DAG(
    dag_id="{project}_pipeline",
    default_args=default_args,
    start_date=datetime(2024, 1, 1),
    schedule="@daily",
    catchup=False,
) as dag:
"#,
            project = project
        );
        if steps.is_empty() {
            dag.push_str("    noop = BashOperator(task_id=\"noop\", bash_command=\"echo nothing to run\")\n");
            return dag;
        }
        for step in steps {
            dag.push_str(&format!(
                "    {id} = BashOperator(task_id=\"{id}\", bash_command=\"{cmd}\")\n",
                id = step.id,
                cmd = step.command
            ));
        }
        let chain: Vec<&str> = steps.iter().map(|s| s.id).collect();
        if chain.len() > 1 {
            dag.push_str(&format!("\n    {}\n", chain.join(" >> ")));
        }
        dag
    }
}

impl Provider for AirflowProvider {
    fn name(&self) -> &str {
        "Airflow"
    }

    fn category(&self) -> Category {
        Category::Orchestration
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        scope.secret("airflow_fernet_key");
        scope.secret("airflow_admin_password");
        orchestrator_connection(scope, "airflow", 8080)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let steps = pipeline_steps(ctx.wiring.connections());
        output.add(
            format!("dags/{}_pipeline.py", ctx.project_name()),
            Self::dag(ctx.project_name(), &steps),
        );

        if ctx.wiring.connections().iter().any(|c| c.service_type == "dbt") {
            let adapter = ctx
                .storage()
                .and_then(|s| storage_adapter(s, AdapterTool::Dbt))
                .unwrap_or("postgres");
            output.add(
                "Dockerfile",
                format!(
                    "FROM apache/airflow:2.8.1-python3.11\n\n\
                     RUN pip install --no-cache-dir dbt-core dbt-{}\n",
                    adapter
                ),
            );
        }
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "airflow", 8080);
        let base = if context.connection("dbt_transformation").is_some() {
            ComposeService::build(".")
        } else {
            ComposeService::image("apache/airflow:2.8.1-python3.11")
        };
        let service = base
            .env("AIRFLOW__CORE__EXECUTOR", "LocalExecutor")
            .env("AIRFLOW__CORE__LOAD_EXAMPLES", "False")
            .env("AIRFLOW__CORE__FERNET_KEY", "${AIRFLOW_FERNET_KEY}")
            .env("_AIRFLOW_WWW_USER_PASSWORD", "${AIRFLOW_ADMIN_PASSWORD}")
            .port(port, 8080)
            .volume("./dags:/opt/airflow/dags")
            .volume(".:/opt/pipeline")
            .command("standalone")
            .healthcheck(Healthcheck::cmd(&["curl", "-f", "http://localhost:8080/health"]));
        service_map([("airflow", with_storage_env(service, context))])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::from([
            ("AIRFLOW__CORE__EXECUTOR".to_string(), "LocalExecutor".to_string()),
            ("AIRFLOW__CORE__LOAD_EXAMPLES".to_string(), "False".to_string()),
            ("AIRFLOW_FERNET_KEY".to_string(), secret_or(context, "airflow_fernet_key", "")),
            (
                "AIRFLOW_ADMIN_PASSWORD".to_string(),
                secret_or(context, "airflow_admin_password", ""),
            ),
        ]);
        let postgres = context
            .service_by_capability(&Capability::Database)
            .filter(|db| matches!(db.service_type.as_str(), "postgres" | "postgresql"));
        if let Some(db) = postgres {
            vars.insert(
                "AIRFLOW__DATABASE__SQL_ALCHEMY_CONN".to_string(),
                format!(
                    "postgresql://{}:{}@{}:{}/airflow",
                    db.credentials.get("username").map(String::as_str).unwrap_or("postgres"),
                    db.credentials.get("password").map(String::as_str).unwrap_or(""),
                    db.host,
                    db.port
                ),
            );
        }
        vars
    }
}

pub struct PrefectProvider;

impl Provider for PrefectProvider {
    fn name(&self) -> &str {
        "Prefect"
    }

    fn category(&self) -> Category {
        Category::Orchestration
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        orchestrator_connection(scope, "prefect", 4200)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let steps = pipeline_steps(ctx.wiring.connections());
        let mut flow = String::from(
            "import subprocess\n\nfrom prefect import flow, task\n\n\n\
             @task(retries=3, retry_delay_seconds=60)\n\
             def run(command: str):\n    subprocess.run(command, shell=True, check=True)\n\n\n",
        );
        flow.push_str(&format!(
            "@flow(name=\"{}_pipeline\", log_prints=True)\ndef pipeline():\n",
            ctx.project_name()
        ));
        if steps.is_empty() {
            flow.push_str("    print(\"nothing to run\")\n");
        }
        for step in &steps {
            flow.push_str(&format!("    run(\"{}\")  # {}\n", step.command, step.id));
        }
        flow.push_str("\n\nif __name__ == \"__main__\":\n    pipeline()\n");
        output.add("flows/pipeline.py", flow);
        output.add(
            "prefect.yaml",
            format!(
                "name: {project}\nprefect-version: 2.14.0\n\ndeployments:\n  - name: {project}-daily\n    entrypoint: flows/pipeline.py:pipeline\n    schedule:\n      cron: \"0 2 * * *\"\n    work_pool:\n      name: default\n",
                project = ctx.project_name()
            ),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "prefect", 4200);
        service_map([
            (
                "prefect-server",
                ComposeService::image("prefecthq/prefect:2-python3.11")
                    .env("PREFECT_UI_URL", format!("http://localhost:{}/api", port))
                    .env("PREFECT_API_URL", format!("http://localhost:{}/api", port))
                    .port(port, 4200)
                    .volume("prefect_data:/root/.prefect")
                    .command("prefect server start --host 0.0.0.0"),
            ),
            (
                "prefect-agent",
                with_storage_env(
                    ComposeService::image("prefecthq/prefect:2-python3.11")
                        .env("PREFECT_API_URL", "http://prefect-server:4200/api")
                        .volume(".:/opt/pipeline")
                        .command("prefect agent start -q default")
                        .depends_on("prefect-server"),
                    context,
                ),
            ),
        ])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["prefect_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = port_of(context, "prefect", 4200);
        BTreeMap::from([("PREFECT_API_URL".to_string(), format!("http://localhost:{}/api", port))])
    }
}

pub struct DagsterProvider;

impl Provider for DagsterProvider {
    fn name(&self) -> &str {
        "Dagster"
    }

    fn category(&self) -> Category {
        Category::Orchestration
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        orchestrator_connection(scope, "dagster", 3000)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let steps = pipeline_steps(ctx.wiring.connections());
        let mut code = String::from("import subprocess\n\nfrom dagster import Definitions, In, Nothing, job, op\n\n");
        for (i, step) in steps.iter().enumerate() {
            let ins = if i == 0 { "" } else { "ins={\"start\": In(Nothing)}" };
            code.push_str(&format!(
                "\n@op({ins})\ndef {id}():\n    subprocess.run(\"{cmd}\", shell=True, check=True)\n\n",
                ins = ins,
                id = step.id,
                cmd = step.command
            ));
        }
        code.push_str(&format!("\n@job\ndef {}_pipeline():\n", ctx.project_name()));
        match steps.split_first() {
            None => code.push_str("    pass\n"),
            Some((first, rest)) => {
                let mut call = format!("{}()", first.id);
                for step in rest {
                    call = format!("{}(start={})", step.id, call);
                }
                code.push_str(&format!("    {}\n", call));
            }
        }
        code.push_str(&format!(
            "\n\ndefs = Definitions(jobs=[{}_pipeline])\n",
            ctx.project_name()
        ));
        output.add("dagster/pipeline.py", code);
        output.add(
            "dagster/workspace.yaml",
            "load_from:\n  - python_file: /opt/dagster/app/pipeline.py\n",
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "dagster", 3000);
        service_map([
            (
                "dagster-webserver",
                with_storage_env(
                    ComposeService::image("dagster/dagster-webserver:latest")
                        .env("DAGSTER_HOME", "/opt/dagster/dagster_home")
                        .port(port, 3000)
                        .volume("./dagster:/opt/dagster/app")
                        .command("dagster-webserver -h 0.0.0.0 -p 3000 -w /opt/dagster/app/workspace.yaml"),
                    context,
                ),
            ),
            (
                "dagster-daemon",
                with_storage_env(
                    ComposeService::image("dagster/dagster-daemon:latest")
                        .env("DAGSTER_HOME", "/opt/dagster/dagster_home")
                        .volume("./dagster:/opt/dagster/app")
                        .command("dagster-daemon run -w /opt/dagster/app/workspace.yaml")
                        .depends_on("dagster-webserver"),
                    context,
                ),
            ),
        ])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = port_of(context, "dagster", 3000);
        BTreeMap::from([("DAGSTER_URL".to_string(), format!("http://localhost:{}", port))])
    }
}

pub struct MageProvider;

impl Provider for MageProvider {
    fn name(&self) -> &str {
        "Mage"
    }

    fn category(&self) -> Category {
        Category::Orchestration
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        orchestrator_connection(scope, "mage", 6789)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let project = ctx.project_name();
        let steps = pipeline_steps(ctx.wiring.connections());
        let mut blocks = String::from("blocks:\n");
        let mut previous: Option<&str> = None;
        for step in &steps {
            blocks.push_str(&format!(
                "  - name: {id}\n    type: custom\n    upstream_blocks: [{up}]\n",
                id = step.id,
                up = previous.unwrap_or("")
            ));
            output.add(
                format!("mage/{}/custom/{}.py", project, step.id),
                format!(
                    "import subprocess\n\n\n@custom\ndef run(*args, **kwargs):\n    subprocess.run(\"{}\", shell=True, check=True)\n",
                    step.command
                ),
            );
            previous = Some(step.id);
        }
        output.add(
            format!("mage/{}/pipelines/{}_pipeline/metadata.yaml", project, project),
            format!("name: {}_pipeline\ntype: python\n{}", project, blocks),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "mage", 6789);
        service_map([(
            "mage",
            with_storage_env(
                ComposeService::image("mageai/mageai:latest")
                    .env("PROJECT_NAME", context.project_name())
                    .port(port, 6789)
                    .volume("./mage:/home/src")
                    .command(format!("mage start {}", context.project_name())),
                context,
            ),
        )])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = port_of(context, "mage", 6789);
        BTreeMap::from([("MAGE_URL".to_string(), format!("http://localhost:{}", port))])
    }
}
