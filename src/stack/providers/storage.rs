use super::{secret_or, service_map};
use crate::output::{ComposeService, Healthcheck, OutputContainer};
use crate::stack::{
    Capability, Category, ContextError, GenerationContext, ProjectContext, Provider, ServiceScope,
};
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::BTreeMap;

pub struct PostgresProvider;

impl Provider for PostgresProvider {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    fn category(&self) -> Category {
        Category::Storage
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let user = scope.secret("postgres_user");
        let password = scope.secret("postgres_password");
        let database = scope.secret("postgres_database");
        let port = scope.port("postgres", 5432);

        let conn = scope
            .connection("postgres", "postgres")
            .port(port)
            .env_prefix("POSTGRES_")
            .capabilities([
                Capability::Database,
                Capability::SqlDatabase,
                Capability::Warehouse,
            ])
            .credential("username", user)
            .credential("password", password)
            .extra("db_name", database);
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let user = ctx.secret("postgres_user").unwrap_or("postgres");
        output.add(
            "storage/postgres/init.sql",
            format!(
                "-- Schemas for {project}\n\
                 CREATE SCHEMA IF NOT EXISTS raw;\n\
                 CREATE SCHEMA IF NOT EXISTS staging;\n\
                 CREATE SCHEMA IF NOT EXISTS analytics;\n\
                 GRANT ALL ON SCHEMA raw, staging, analytics TO {user};\n",
                project = ctx.project_name(),
                user = user,
            ),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = context.ports().get("postgres").copied().unwrap_or(5432);
        service_map([(
            "postgres",
            ComposeService::image("postgres:15")
                .container(format!("{}_postgres", context.project_name()))
                .env("POSTGRES_USER", "${POSTGRES_USER}")
                .env("POSTGRES_PASSWORD", "${POSTGRES_PASSWORD}")
                .env("POSTGRES_DB", "${POSTGRES_DB}")
                .port(port, 5432)
                .volume("postgres_data:/var/lib/postgresql/data")
                .volume("./storage/postgres/init.sql:/docker-entrypoint-initdb.d/init.sql")
                .healthcheck(Healthcheck::cmd(&["pg_isready", "-U", "${POSTGRES_USER}"])),
        )])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["postgres_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = context.ports().get("postgres").copied().unwrap_or(5432);
        BTreeMap::from([
            ("POSTGRES_HOST".to_string(), "postgres".to_string()),
            ("POSTGRES_PORT".to_string(), port.to_string()),
            ("POSTGRES_USER".to_string(), secret_or(context, "postgres_user", "postgres")),
            ("POSTGRES_PASSWORD".to_string(), secret_or(context, "postgres_password", "")),
            ("POSTGRES_DB".to_string(), secret_or(context, "postgres_database", "warehouse")),
        ])
    }
}

pub struct SnowflakeProvider;

impl Provider for SnowflakeProvider {
    fn name(&self) -> &str {
        "Snowflake"
    }

    fn category(&self) -> Category {
        Category::Storage
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let account = scope.secret("snowflake_account");
        let conn = scope
            .connection("snowflake", "snowflake")
            .host(format!("{}.snowflakecomputing.com", account))
            .env_prefix("SNOWFLAKE_")
            .capabilities([
                Capability::Database,
                Capability::SqlDatabase,
                Capability::Warehouse,
            ])
            .credential("username", scope.secret("snowflake_user"))
            .credential("password", scope.secret("snowflake_password"))
            .extra("account", account)
            .extra("warehouse", scope.secret("snowflake_warehouse"))
            .extra("database", scope.secret("snowflake_database"))
            .extra("role", scope.secret("snowflake_role"));
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let database = ctx.secret("snowflake_database").unwrap_or("ANALYTICS");
        let warehouse = ctx.secret("snowflake_warehouse").unwrap_or("COMPUTE_WH");
        output.add(
            "storage/snowflake/setup.sql",
            format!(
                "CREATE WAREHOUSE IF NOT EXISTS {wh} WITH WAREHOUSE_SIZE = 'XSMALL' AUTO_SUSPEND = 60;\n\
                 CREATE DATABASE IF NOT EXISTS {db};\n\
                 CREATE SCHEMA IF NOT EXISTS {db}.RAW;\n\
                 CREATE SCHEMA IF NOT EXISTS {db}.ANALYTICS;\n",
                wh = warehouse,
                db = database,
            ),
        );
        output.add("storage/snowflake/check_connection.py", CHECK_CONNECTION_PY);
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        service_map([(
            "snowflake-check",
            ComposeService::image("python:3.11-slim")
                .oneshot()
                .env("DATABASE_URL", "${SNOWFLAKE_URL}")
                .volume("./storage/snowflake:/scripts")
                .command(
                    "sh -c \"pip install -q snowflake-sqlalchemy && python /scripts/check_connection.py\"",
                ),
        )])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let mut vars: BTreeMap<String, String> = [
            "snowflake_account",
            "snowflake_user",
            "snowflake_password",
            "snowflake_warehouse",
            "snowflake_database",
            "snowflake_role",
        ]
        .iter()
        .map(|key| (key.to_uppercase(), secret_or(context, key, "")))
        .collect();
        if let Some(url) = super::storage_url(context) {
            vars.insert("SNOWFLAKE_URL".to_string(), url);
        }
        vars
    }
}

pub struct BigQueryProvider;

impl Provider for BigQueryProvider {
    fn name(&self) -> &str {
        "BigQuery"
    }

    fn category(&self) -> Category {
        Category::Storage
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let conn = scope
            .connection("bigquery", "bigquery")
            .host("bigquery.googleapis.com")
            .env_prefix("BIGQUERY_")
            .capabilities([Capability::Database, Capability::SqlDatabase, Capability::Warehouse])
            .extra("project", scope.secret("bigquery_project"))
            .extra("dataset", scope.secret("bigquery_dataset"))
            .extra("keyfile", "/secrets/service-account.json");
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let project = ctx.secret("bigquery_project").unwrap_or("CHANGE_ME_PROJECT_ID");
        output.add(
            "storage/bigquery/setup.sh",
            format!(
                "#!/bin/bash\nset -euo pipefail\n\n\
                 gcloud iam service-accounts create {name}-sa \\\n  \
                 --project={project} \\\n  \
                 --display-name=\"BigQuery Service Account\"\n\
                 gcloud projects add-iam-policy-binding {project} \\\n  \
                 --member=\"serviceAccount:{name}-sa@{project}.iam.gserviceaccount.com\" \\\n  \
                 --role=\"roles/bigquery.admin\"\n\
                 gcloud iam service-accounts keys create secrets/service-account.json \\\n  \
                 --iam-account={name}-sa@{project}.iam.gserviceaccount.com\n",
                name = ctx.project_name().replace('_', "-"),
                project = project,
            ),
        );
        output.add("storage/bigquery/check_connection.py", CHECK_CONNECTION_PY);
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        service_map([(
            "bigquery-check",
            ComposeService::image("google/cloud-sdk:slim")
                .oneshot()
                .env("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/service-account.json")
                .volume("./secrets:/secrets:ro")
                .command("bq ls --project_id=${BIGQUERY_PROJECT}"),
        )])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("BIGQUERY_PROJECT".to_string(), secret_or(context, "bigquery_project", "")),
            ("BIGQUERY_DATASET".to_string(), secret_or(context, "bigquery_dataset", "analytics")),
            (
                "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                "./secrets/service-account.json".to_string(),
            ),
        ])
    }
}

pub struct RedshiftProvider;

impl Provider for RedshiftProvider {
    fn name(&self) -> &str {
        "Redshift"
    }

    fn category(&self) -> Category {
        Category::Storage
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let host = scope.secret("redshift_host");
        let conn = scope
            .connection("redshift", "redshift")
            .host(host)
            .port(5439)
            .env_prefix("REDSHIFT_")
            .capabilities([Capability::Database, Capability::SqlDatabase, Capability::Warehouse])
            .credential("username", scope.secret("redshift_user"))
            .credential("password", scope.secret("redshift_password"))
            .extra("db_name", scope.secret("redshift_database"));
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        output.add(
            "storage/redshift/setup.sql",
            format!(
                "-- Schemas for {}\n\
                 CREATE SCHEMA IF NOT EXISTS raw;\n\
                 CREATE SCHEMA IF NOT EXISTS analytics;\n",
                ctx.project_name()
            ),
        );
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        service_map([(
            "redshift-check",
            ComposeService::image("postgres:15")
                .oneshot()
                .env("PGPASSWORD", "${REDSHIFT_PASSWORD}")
                .command(
                    "psql -h ${REDSHIFT_HOST} -p 5439 -U ${REDSHIFT_USER} -d ${REDSHIFT_DATABASE} -c 'select 1'",
                ),
        )])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        ["redshift_host", "redshift_user", "redshift_password", "redshift_database"]
            .iter()
            .map(|key| (key.to_uppercase(), secret_or(context, key, "")))
            .collect()
    }
}

pub struct DuckDbProvider;

impl Provider for DuckDbProvider {
    fn name(&self) -> &str {
        "DuckDB"
    }

    fn category(&self) -> Category {
        Category::Storage
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let conn = scope
            .connection("duckdb", "duckdb")
            .host("localhost")
            .env_prefix("DUCKDB_")
            .capabilities([Capability::Database, Capability::SqlDatabase, Capability::Warehouse])
            .extra("db_name", "analytics")
            .extra("path", "/data/analytics.duckdb");
        scope.register(conn)
    }

    fn generate(&self, _ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        output.add(
            "storage/duckdb/init.sql",
            "CREATE SCHEMA IF NOT EXISTS raw;\nCREATE SCHEMA IF NOT EXISTS analytics;\n",
        );
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        service_map([(
            "duckdb",
            ComposeService::image("python:3.11-slim")
                .volume("duckdb_data:/data")
                .volume("./storage/duckdb:/scripts")
                .command("sh -c \"pip install -q duckdb && sleep infinity\""),
        )])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["duckdb_data".to_string()]
    }

    fn env_vars(&self, _context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([("DUCKDB_PATH".to_string(), "/data/analytics.duckdb".to_string())])
    }
}

pub struct MongoDbProvider;

impl Provider for MongoDbProvider {
    fn name(&self) -> &str {
        "MongoDB"
    }

    fn category(&self) -> Category {
        Category::Storage
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let port = scope.port("mongodb", 27017);
        let conn = scope
            .connection("mongodb", "mongodb")
            .port(port)
            .env_prefix("MONGODB_")
            .capabilities([Capability::Database, Capability::NosqlDatabase])
            .credential("username", scope.secret("mongodb_user"))
            .credential("password", scope.secret("mongodb_password"))
            .extra("db_name", "analytics");
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        output.add(
            "storage/mongodb/init.js",
            format!(
                "db = db.getSiblingDB('analytics');\ndb.createCollection('raw_events');\n// {}\n",
                ctx.project_name()
            ),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = context.ports().get("mongodb").copied().unwrap_or(27017);
        service_map([(
            "mongodb",
            ComposeService::image("mongo:7")
                .env("MONGO_INITDB_ROOT_USERNAME", "${MONGODB_USER}")
                .env("MONGO_INITDB_ROOT_PASSWORD", "${MONGODB_PASSWORD}")
                .port(port, 27017)
                .volume("mongodb_data:/data/db")
                .volume("./storage/mongodb/init.js:/docker-entrypoint-initdb.d/init.js:ro"),
        )])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["mongodb_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = context.ports().get("mongodb").copied().unwrap_or(27017);
        BTreeMap::from([
            ("MONGODB_HOST".to_string(), "mongodb".to_string()),
            ("MONGODB_PORT".to_string(), port.to_string()),
            ("MONGODB_USER".to_string(), secret_or(context, "mongodb_user", "")),
            ("MONGODB_PASSWORD".to_string(), secret_or(context, "mongodb_password", "")),
        ])
    }
}

const CHECK_CONNECTION_PY: &str = r#"import os

from sqlalchemy import create_engine, text

engine = create_engine(os.environ["DATABASE_URL"])
with engine.connect() as conn:
    conn.execute(text("select 1"))
print("connection ok")
"#;
