use super::{service_map, storage_url};
use crate::output::{ComposeService, OutputContainer};
use crate::stack::{
    Capability, Category, ContextError, DependencySpec, GenerationContext, ProjectContext,
    Provider, ServiceConnection, ServiceScope,
};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;

fn checked_database(context: &ProjectContext) -> Option<&ServiceConnection> {
    context
        .service_by_capability(&Capability::Warehouse)
        .or_else(|| context.service_by_capability(&Capability::Database))
}

fn quality_connection(scope: &mut ServiceScope<'_>, name: &str) -> Result<(), ContextError> {
    let conn = scope
        .connection(name, name)
        .host("localhost")
        .env_prefix(format!("{}_", name.to_uppercase()))
        .capabilities([Capability::Quality]);
    scope.register(conn)
}

pub struct GreatExpectationsProvider;

impl Provider for GreatExpectationsProvider {
    fn name(&self) -> &str {
        "Great Expectations"
    }

    fn category(&self) -> Category {
        Category::Quality
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        quality_connection(scope, "great_expectations")
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        if context.service_by_capability(&Capability::SqlDatabase).is_some() {
            Ok(())
        } else {
            Err("Great Expectations requires a SQL database".to_string())
        }
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let url = storage_url(ctx.project)
            .or_else(|| checked_database(ctx.project).and_then(|db| db.connection_string()))
            .context("Great Expectations has no database to validate")?;
        output.add(
            "quality/great_expectations/great_expectations.yml",
            format!(
                "config_version: 3.0\n\n\
                 datasources:\n  warehouse:\n    class_name: Datasource\n    execution_engine:\n      \
                 class_name: SqlAlchemyExecutionEngine\n      connection_string: {url}\n    data_connectors:\n      \
                 default_inferred_data_connector:\n        class_name: InferredAssetSqlDataConnector\n        include_schema_name: true\n\n\
                 stores:\n  expectations_store:\n    class_name: ExpectationsStore\n    store_backend:\n      \
                 class_name: TupleFilesystemStoreBackend\n      base_directory: expectations/\n  validations_store:\n    \
                 class_name: ValidationsStore\n    store_backend:\n      class_name: TupleFilesystemStoreBackend\n      \
                 base_directory: uncommitted/validations/\n  checkpoint_store:\n    class_name: CheckpointStore\n    \
                 store_backend:\n      class_name: TupleFilesystemStoreBackend\n      base_directory: checkpoints/\n\n\
                 expectations_store_name: expectations_store\n\
                 validations_store_name: validations_store\n\
                 checkpoint_store_name: checkpoint_store\n",
                url = url
            ),
        );
        output.add(
            "quality/great_expectations/checkpoints/default.yml",
            format!(
                "name: default\nconfig_version: 1.0\nclass_name: Checkpoint\nrun_name_template: \"{}-%Y%m%d\"\n\
                 validations:\n  - batch_request:\n      datasource_name: warehouse\n      \
                 data_connector_name: default_inferred_data_connector\n      data_asset_name: analytics.raw_events\n    \
                 expectation_suite_name: raw_events\n",
                ctx.project_name()
            ),
        );
        output.add(
            "quality/great_expectations/expectations/raw_events.json",
            r#"{
  "expectation_suite_name": "raw_events",
  "expectations": [
    {"expectation_type": "expect_table_row_count_to_be_between", "kwargs": {"min_value": 1}},
    {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "id"}},
    {"expectation_type": "expect_column_values_to_be_unique", "kwargs": {"column": "id"}}
  ]
}
"#,
        );
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        service_map([(
            "great-expectations",
            ComposeService::image("python:3.11-slim")
                .oneshot()
                .volume("./quality/great_expectations:/ge")
                .command(
                    "sh -c \"pip install -q great_expectations sqlalchemy psycopg2-binary && cd /ge && great_expectations checkpoint run default\"",
                ),
        )])
    }

    fn env_vars(&self, _context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([(
            "GE_HOME".to_string(),
            "/ge".to_string(),
        )])
    }
}

pub struct SodaProvider;

impl SodaProvider {
    fn data_source(db: &ServiceConnection) -> String {
        let kind = match db.service_type.as_str() {
            "postgresql" => "postgres",
            other => other,
        };
        let mut out = format!("data_source warehouse:\n  type: {}\n", kind);
        match kind {
            "duckdb" => out.push_str(&format!(
                "  path: {}\n",
                db.extra.get("path").map(String::as_str).unwrap_or("/data/analytics.duckdb")
            )),
            "bigquery" => out.push_str(&format!(
                "  project_id: {}\n  dataset: {}\n  account_info_json_path: /secrets/service-account.json\n",
                db.extra.get("project").map(String::as_str).unwrap_or(""),
                db.extra.get("dataset").map(String::as_str).unwrap_or("analytics"),
            )),
            "snowflake" => out.push_str(&format!(
                "  account: {}\n  username: {}\n  password: ${{SODA_DB_PASSWORD}}\n  database: {}\n  warehouse: {}\n",
                db.extra.get("account").map(String::as_str).unwrap_or(""),
                db.credentials.get("username").map(String::as_str).unwrap_or(""),
                db.extra.get("database").map(String::as_str).unwrap_or(""),
                db.extra.get("warehouse").map(String::as_str).unwrap_or(""),
            )),
            _ => out.push_str(&format!(
                "  host: {}\n  port: {}\n  username: {}\n  password: ${{SODA_DB_PASSWORD}}\n  database: {}\n",
                db.host,
                db.port,
                db.credentials.get("username").map(String::as_str).unwrap_or(""),
                db.extra.get("db_name").map(String::as_str).unwrap_or("analytics"),
            )),
        }
        out
    }
}

impl Provider for SodaProvider {
    fn name(&self) -> &str {
        "Soda"
    }

    fn category(&self) -> Category {
        Category::Quality
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        quality_connection(scope, "soda")
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        checked_database(context)
            .map(|_| ())
            .ok_or_else(|| "Soda requires a database to scan".to_string())
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let db = checked_database(ctx.project).context("Soda has no database to scan")?;
        output.add("quality/soda/configuration.yml", Self::data_source(db));
        output.add(
            "quality/soda/checks.yml",
            "checks for raw_events:\n  - row_count > 0\n  - missing_count(id) = 0\n  - duplicate_count(id) = 0\n  - freshness(loaded_at) < 1d\n",
        );
        output.add(
            "quality/soda/run_scan.sh",
            "#!/bin/bash\nset -euo pipefail\n\nsoda scan -d warehouse -c configuration.yml checks.yml\n",
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let package = match context.stack().get(Category::Storage) {
            Some("MongoDB") => "soda-core-mongodb",
            Some("Snowflake") => "soda-core-snowflake",
            Some("BigQuery") => "soda-core-bigquery",
            Some("DuckDB") => "soda-core-duckdb",
            _ => "soda-core-postgres",
        };
        service_map([(
            "soda",
            ComposeService::image("python:3.11-slim")
                .oneshot()
                .env("SODA_DB_PASSWORD", "${SODA_DB_PASSWORD}")
                .volume("./quality/soda:/soda")
                .command(format!(
                    "sh -c \"pip install -q {} && cd /soda && sh run_scan.sh\"",
                    package
                )),
        )])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::from([(
            "SODA_CONFIG_PATH".to_string(),
            "/soda/configuration.yml".to_string(),
        )]);
        if let Some(db) = checked_database(context) {
            vars.insert(
                "SODA_DB_PASSWORD".to_string(),
                db.credentials.get("password").cloned().unwrap_or_default(),
            );
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Wiring;
    use crate::secrets::{RngSecretSource, SecretRegistry};
    use crate::stack::providers::{MongoDbProvider, PostgresProvider};
    use crate::stack::Stack;

    fn context(storage: &dyn Provider, quality: &str) -> ProjectContext {
        let stack = Stack::new()
            .with(Category::Storage, storage.name())
            .with(Category::Quality, quality);
        let mut source = RngSecretSource::seeded(11);
        let secrets = SecretRegistry::new().secrets_for_stack(&stack, "acme", &mut source);
        let mut ctx = ProjectContext::with_secret_source("acme", stack, Box::new(source));
        ctx.extend_secrets(secrets);
        storage
            .register_services(&mut ServiceScope::new(storage.id(), &mut ctx))
            .unwrap();
        ctx
    }

    fn generate(provider: &dyn Provider, ctx: &ProjectContext) -> Result<OutputContainer> {
        let wiring = Wiring::None;
        let id = provider.id();
        let gen = GenerationContext {
            project: ctx,
            wiring: &wiring,
            component: &id,
        };
        let mut out = OutputContainer::new();
        provider.generate(&gen, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_great_expectations_uses_storage_url() {
        let ctx = context(&PostgresProvider, "Great Expectations");
        let out = generate(&GreatExpectationsProvider, &ctx).unwrap();
        let config = out
            .get("quality/great_expectations/great_expectations.yml")
            .unwrap();
        assert!(config.contains("@postgres:5432/acme_warehouse"));
        assert!(config.contains(ctx.secret("postgres_password").unwrap()));
    }

    #[test]
    fn test_great_expectations_rejects_nosql() {
        let ctx = context(&MongoDbProvider, "Great Expectations");
        assert!(GreatExpectationsProvider.validate_configuration(&ctx).is_err());
    }

    #[test]
    fn test_soda_scans_mongodb() {
        let ctx = context(&MongoDbProvider, "Soda");
        assert!(SodaProvider.validate_configuration(&ctx).is_ok());
        let out = generate(&SodaProvider, &ctx).unwrap();
        let config = out.get("quality/soda/configuration.yml").unwrap();
        assert!(config.contains("type: mongodb"));
        assert!(config.contains("port: 27017"));
        assert_eq!(
            SodaProvider.env_vars(&ctx)["SODA_DB_PASSWORD"],
            ctx.secret("mongodb_password").unwrap()
        );
    }
}
