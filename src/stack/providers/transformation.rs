use super::{requirements, service_map};
use crate::output::{ComposeService, OutputContainer};
use crate::pipeline::wiring::{storage_adapter, AdapterTool, StorageTarget};
use crate::stack::{
    Capability, Category, ContextError, DependencySpec, GenerationContext, ProjectContext,
    Provider, ServiceScope,
};
use crate::validation::required_packages;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;

const DBT_SUPPORTED_TYPES: &[&str] = &["postgres", "postgresql", "snowflake", "bigquery", "redshift", "duckdb"];

pub struct DbtProvider;

impl DbtProvider {
    fn profile_output(target: &StorageTarget, adapter: &str, ctx: &GenerationContext<'_>) -> serde_yaml::Value {
        let mut out = serde_yaml::Mapping::new();
        let mut put = |k: &str, v: serde_yaml::Value| {
            out.insert(serde_yaml::Value::from(k), v);
        };
        put("type", adapter.into());
        put("threads", 4.into());
        match adapter {
            "duckdb" => {
                put("path", "/data/analytics.duckdb".into());
            }
            "bigquery" => {
                put("method", "service-account".into());
                put("project", ctx.secret("bigquery_project").unwrap_or_default().into());
                put("dataset", ctx.secret("bigquery_dataset").unwrap_or("analytics").into());
                put("keyfile", "/secrets/service-account.json".into());
            }
            "snowflake" => {
                put("account", ctx.secret("snowflake_account").unwrap_or_default().into());
                put("user", target.user.clone().into());
                put("password", "{{ env_var('DBT_DB_PASSWORD') }}".into());
                put("role", ctx.secret("snowflake_role").unwrap_or("SYSADMIN").into());
                put("database", ctx.secret("snowflake_database").unwrap_or("ANALYTICS").into());
                put("warehouse", ctx.secret("snowflake_warehouse").unwrap_or("COMPUTE_WH").into());
                put("schema", "analytics".into());
            }
            _ => {
                put("host", target.host.clone().into());
                put("port", u64::from(target.port).into());
                put("user", target.user.clone().into());
                put("password", "{{ env_var('DBT_DB_PASSWORD') }}".into());
                put("dbname", target.database.clone().into());
                put("schema", "analytics".into());
            }
        }
        serde_yaml::Value::Mapping(out)
    }
}

impl Provider for DbtProvider {
    fn name(&self) -> &str {
        "dbt"
    }

    fn category(&self) -> Category {
        Category::Transformation
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let conn = scope
            .connection("dbt_transformation", "dbt")
            .host("localhost")
            .env_prefix("DBT_")
            .capabilities([Capability::Transformation]);
        scope.register(conn)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![
            DependencySpec::capability(Capability::SqlDatabase),
            DependencySpec::capability(Capability::Warehouse),
        ]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        let db = context
            .service_by_capability(&Capability::SqlDatabase)
            .or_else(|| context.service_by_capability(&Capability::Warehouse))
            .ok_or_else(|| "dbt requires a SQL database or warehouse".to_string())?;
        if DBT_SUPPORTED_TYPES.contains(&db.service_type.to_lowercase().as_str()) {
            Ok(())
        } else {
            Err(format!(
                "dbt does not support {}. Supported: {}",
                db.service_type,
                DBT_SUPPORTED_TYPES.join(", ")
            ))
        }
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let project = ctx.project_name();
        let target = ctx
            .wiring
            .storage_target()
            .context("dbt has no storage target to run against")?;
        let storage = ctx.storage().unwrap_or("PostgreSQL");
        let adapter = storage_adapter(storage, AdapterTool::Dbt).unwrap_or("postgres");

        output.add(
            "dbt_project/dbt_project.yml",
            format!(
                "name: '{project}'\n\
                 version: '1.0.0'\n\
                 config-version: 2\n\
                 profile: '{project}'\n\n\
                 model-paths: [\"models\"]\n\
                 seed-paths: [\"seeds\"]\n\
                 test-paths: [\"tests\"]\n\
                 macro-paths: [\"macros\"]\n\
                 snapshot-paths: [\"snapshots\"]\n\
                 target-path: \"target\"\n\
                 clean-targets: [\"target\", \"dbt_packages\"]\n\n\
                 models:\n  {project}:\n    staging:\n      +materialized: view\n    marts:\n      +materialized: table\n",
                project = project
            ),
        );

        let mut outputs = serde_yaml::Mapping::new();
        outputs.insert("dev".into(), Self::profile_output(target, adapter, ctx));
        let mut profile = serde_yaml::Mapping::new();
        profile.insert("target".into(), "dev".into());
        profile.insert("outputs".into(), serde_yaml::Value::Mapping(outputs));
        let mut profiles = serde_yaml::Mapping::new();
        profiles.insert(project.into(), serde_yaml::Value::Mapping(profile));
        output.add(
            "dbt_project/profiles.yml",
            serde_yaml::to_string(&profiles).context("Failed to render dbt profiles")?,
        );

        output.add(
            "dbt_project/models/staging/stg_raw_events.sql",
            "select *\nfrom {{ source('raw', 'raw_events') }}\n",
        );
        output.add(
            "dbt_project/models/staging/sources.yml",
            "version: 2\n\nsources:\n  - name: raw\n    schema: raw\n    tables:\n      - name: raw_events\n",
        );
        output.add(
            "dbt_project/requirements.txt",
            requirements(&required_packages(self.name(), storage)),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let storage = context.stack().get(Category::Storage).unwrap_or("PostgreSQL");
        let package = required_packages(self.name(), storage).join(" ");
        let mut service = ComposeService::image("python:3.11-slim")
            .oneshot()
            .env("DBT_PROFILES_DIR", "/dbt_project")
            .env("DBT_DB_PASSWORD", "${DBT_DB_PASSWORD}")
            .volume("./dbt_project:/dbt_project")
            .command(format!(
                "sh -c \"pip install -q {} && cd /dbt_project && dbt run\"",
                package
            ));
        if let Some(db) = context.service_by_capability(&Capability::SqlDatabase) {
            if db.port > 0 {
                service = service.depends_on(db.name.clone());
            }
        }
        service_map([("dbt", service)])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::from([
            ("DBT_PROFILES_DIR".to_string(), "/dbt_project".to_string()),
            ("DBT_TARGET".to_string(), "dev".to_string()),
        ]);
        let db = context
            .service_by_capability(&Capability::Warehouse)
            .or_else(|| context.service_by_capability(&Capability::SqlDatabase));
        if let Some(db) = db {
            vars.insert("DBT_DB_HOST".to_string(), db.host.clone());
            vars.insert("DBT_DB_PORT".to_string(), db.port.to_string());
            vars.insert(
                "DBT_DB_USER".to_string(),
                db.credentials.get("username").cloned().unwrap_or_default(),
            );
            vars.insert(
                "DBT_DB_PASSWORD".to_string(),
                db.credentials.get("password").cloned().unwrap_or_default(),
            );
            if let Some(name) = db.extra.get("db_name") {
                vars.insert("DBT_DB_NAME".to_string(), name.clone());
            }
        }
        vars
    }
}

pub struct SparkProvider;

impl Provider for SparkProvider {
    fn name(&self) -> &str {
        "Spark"
    }

    fn category(&self) -> Category {
        Category::Transformation
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let master = scope.port("spark-master", 7077);
        let ui = scope.port("spark-ui", 8081);
        let conn = scope
            .connection("spark-master", "spark")
            .port(master)
            .env_prefix("SPARK_")
            .capabilities([Capability::Transformation, Capability::StreamProcessing])
            .extra("master_url", format!("spark://spark-master:{}", master))
            .extra("ui_port", ui.to_string());
        scope.register(conn)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let sink = ctx
            .wiring
            .storage_target()
            .and_then(|t| t.connection_string.clone())
            .unwrap_or_else(|| "/data/output/results".to_string());
        output.add(
            "spark_jobs/etl_job.py",
            format!(
                r#"import os

from pyspark.sql import SparkSession
from pyspark.sql.functions import avg, col, count

spark = SparkSession.builder.appName("{project}_etl").getOrCreate()

SINK = os.environ.get("SPARK_SINK_URL", "{sink}")


def extract(path):
    return spark.read.option("header", "true").option("inferSchema", "true").csv(path)


def transform(df):
    return (
        df.where(col("value") > 100)
        .groupBy("date_column")
        .agg(count("id").alias("total_records"), avg("value").alias("avg_value"))
    )


if __name__ == "__main__":
    result = transform(extract("/data/input/*.csv"))
    result.write.mode("overwrite").parquet("/data/output/results")
    print(f"Loaded results, sink configured as {{SINK}}")
    spark.stop()
"#,
                project = ctx.project_name(),
                sink = sink,
            ),
        );
        output.add(
            "spark_jobs/submit_job.sh",
            "#!/bin/bash\nset -euo pipefail\n\n\
             spark-submit \\\n  --master spark://spark-master:7077 \\\n  --deploy-mode client \\\n  \
             --driver-memory 2g \\\n  --executor-memory 4g \\\n  /spark_jobs/etl_job.py\n",
        );
        let storage = ctx.storage().unwrap_or_default();
        output.add(
            "spark_jobs/requirements.txt",
            requirements(&required_packages(self.name(), storage)),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let master = context.ports().get("spark-master").copied().unwrap_or(7077);
        let ui = context.ports().get("spark-ui").copied().unwrap_or(8081);
        service_map([
            (
                "spark-master",
                ComposeService::image("bitnami/spark:3.5")
                    .env("SPARK_MODE", "master")
                    .port(master, 7077)
                    .port(ui, 8080)
                    .volume("./spark_jobs:/spark_jobs"),
            ),
            (
                "spark-worker",
                ComposeService::image("bitnami/spark:3.5")
                    .env("SPARK_MODE", "worker")
                    .env("SPARK_MASTER_URL", "spark://spark-master:7077")
                    .env("SPARK_WORKER_MEMORY", "4G")
                    .volume("./spark_jobs:/spark_jobs")
                    .depends_on("spark-master"),
            ),
        ])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let ui = context.ports().get("spark-ui").copied().unwrap_or(8081);
        BTreeMap::from([
            ("SPARK_MASTER_URL".to_string(), "spark://spark-master:7077".to_string()),
            ("SPARK_UI_URL".to_string(), format!("http://localhost:{}", ui)),
        ])
    }
}
