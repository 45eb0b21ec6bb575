use super::{secret_or, service_map, storage_url};
use crate::output::{ComposeService, Healthcheck, OutputContainer};
use crate::stack::{
    Capability, Category, ContextError, DependencySpec, GenerationContext, ProjectContext,
    Provider, ServiceConnection, ServiceScope,
};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::json;
use std::collections::BTreeMap;

fn data_source(context: &ProjectContext) -> Option<&ServiceConnection> {
    context
        .service_by_capability(&Capability::Warehouse)
        .or_else(|| context.service_by_capability(&Capability::Database))
}

fn require_database(tool: &str, context: &ProjectContext) -> Result<(), String> {
    data_source(context)
        .map(|_| ())
        .ok_or_else(|| format!("{} requires a database to visualize", tool))
}

fn dashboard_connection(
    scope: &mut ServiceScope<'_>,
    name: &str,
    default_port: u16,
) -> Result<(), ContextError> {
    let port = scope.port(name, default_port);
    let conn = scope
        .connection(name, name)
        .port(port)
        .env_prefix(format!("{}_", name.to_uppercase()))
        .capabilities([Capability::Visualization])
        .extra("url", format!("http://localhost:{}", port));
    scope.register(conn)
}

fn port_of(context: &ProjectContext, service: &str, default: u16) -> u16 {
    context.ports().get(service).copied().unwrap_or(default)
}

pub struct MetabaseProvider;

impl Provider for MetabaseProvider {
    fn name(&self) -> &str {
        "Metabase"
    }

    fn category(&self) -> Category {
        Category::Visualization
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        scope.secret("metabase_db_password");
        dashboard_connection(scope, "metabase", 3000)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        require_database(self.name(), context)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let database = data_source(ctx.project).map(|db| {
            json!({
                "name": format!("{} warehouse", ctx.project_name()),
                "engine": db.service_type,
                "details": {
                    "host": db.host,
                    "port": db.port,
                    "dbname": db.extra.get("db_name"),
                    "user": db.credentials.get("username"),
                },
            })
        });
        output.add(
            "visualization/metabase/database.json",
            serde_json::to_string_pretty(&json!({ "databases": database.into_iter().collect::<Vec<_>>() }))
                .context("Failed to render Metabase database config")?,
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "metabase", 3000);
        service_map([
            (
                "metabase",
                ComposeService::image("metabase/metabase:latest")
                    .port(port, 3000)
                    .env("MB_DB_TYPE", "postgres")
                    .env("MB_DB_DBNAME", "metabase")
                    .env("MB_DB_PORT", "5432")
                    .env("MB_DB_USER", "metabase")
                    .env("MB_DB_PASS", "${METABASE_DB_PASSWORD}")
                    .env("MB_DB_HOST", "metabase-db")
                    .volume("./visualization/metabase:/metabase-config:ro")
                    .depends_on("metabase-db")
                    .healthcheck(Healthcheck::cmd(&["curl", "-f", "http://localhost:3000/api/health"])),
            ),
            (
                "metabase-db",
                ComposeService::image("postgres:15")
                    .env("POSTGRES_DB", "metabase")
                    .env("POSTGRES_USER", "metabase")
                    .env("POSTGRES_PASSWORD", "${METABASE_DB_PASSWORD}")
                    .volume("metabase_data:/var/lib/postgresql/data"),
            ),
        ])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["metabase_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "METABASE_URL".to_string(),
                format!("http://localhost:{}", port_of(context, "metabase", 3000)),
            ),
            (
                "METABASE_DB_PASSWORD".to_string(),
                secret_or(context, "metabase_db_password", ""),
            ),
        ])
    }
}

pub struct SupersetProvider;

impl Provider for SupersetProvider {
    fn name(&self) -> &str {
        "Superset"
    }

    fn category(&self) -> Category {
        Category::Visualization
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        scope.secret("superset_secret_key");
        scope.secret("superset_admin_password");
        dashboard_connection(scope, "superset", 8088)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        require_database(self.name(), context)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        output.add(
            "visualization/superset/superset_config.py",
            "import os\n\n\
             SECRET_KEY = os.environ[\"SUPERSET_SECRET_KEY\"]\n\
             SQLALCHEMY_DATABASE_URI = \"sqlite:////app/superset_home/superset.db\"\n\
             FEATURE_FLAGS = {\"DASHBOARD_NATIVE_FILTERS\": True}\n",
        );
        let uri = storage_url(ctx.project)
            .or_else(|| data_source(ctx.project).and_then(|db| db.connection_string()));
        if let Some(uri) = uri {
            output.add(
                "visualization/superset/databases.yaml",
                format!(
                    "databases:\n  - database_name: {}_warehouse\n    sqlalchemy_uri: {}\n    expose_in_sqllab: true\n",
                    ctx.project_name(),
                    uri
                ),
            );
        }
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "superset", 8088);
        service_map([(
            "superset",
            ComposeService::image("apache/superset:latest")
                .port(port, 8088)
                .env("SUPERSET_SECRET_KEY", "${SUPERSET_SECRET_KEY}")
                .env("SUPERSET_CONFIG_PATH", "/app/pythonpath/superset_config.py")
                .env("ADMIN_PASSWORD", "${SUPERSET_ADMIN_PASSWORD}")
                .volume("./visualization/superset/superset_config.py:/app/pythonpath/superset_config.py:ro")
                .volume("superset_data:/app/superset_home")
                .command(
                    "sh -c \"superset db upgrade && superset fab create-admin --username admin --firstname Admin --lastname User --email admin@example.com --password $$ADMIN_PASSWORD; superset init && superset run -h 0.0.0.0 -p 8088\"",
                ),
        )])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["superset_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "SUPERSET_URL".to_string(),
                format!("http://localhost:{}", port_of(context, "superset", 8088)),
            ),
            (
                "SUPERSET_SECRET_KEY".to_string(),
                secret_or(context, "superset_secret_key", ""),
            ),
            (
                "SUPERSET_ADMIN_PASSWORD".to_string(),
                secret_or(context, "superset_admin_password", ""),
            ),
        ])
    }
}

pub struct GrafanaProvider;

impl Provider for GrafanaProvider {
    fn name(&self) -> &str {
        "Grafana"
    }

    fn category(&self) -> Category {
        Category::Visualization
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        scope.secret("grafana_admin_password");
        dashboard_connection(scope, "grafana", 3001)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        require_database(self.name(), context)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let mut datasources = String::from("apiVersion: 1\n\ndatasources:\n");
        if let Some(db) = data_source(ctx.project) {
            let kind = match db.service_type.as_str() {
                "postgres" | "postgresql" | "redshift" => "postgres",
                "mongodb" => "grafana-mongodb-datasource",
                other => other,
            };
            datasources.push_str(&format!(
                "  - name: {project}-warehouse\n    type: {kind}\n    url: {host}:{port}\n    user: {user}\n    database: {db}\n    secureJsonData:\n      password: ${{DATA_DB_PASSWORD}}\n",
                project = ctx.project_name(),
                kind = kind,
                host = db.host,
                port = db.port,
                user = db.credentials.get("username").map(String::as_str).unwrap_or(""),
                db = db.extra.get("db_name").map(String::as_str).unwrap_or(""),
            ));
        }
        if ctx.project.connection("prometheus").is_some() {
            datasources.push_str("  - name: Prometheus\n    type: prometheus\n    url: http://prometheus:9090\n");
        }
        output.add("visualization/grafana/provisioning/datasources/datasources.yml", datasources);
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = port_of(context, "grafana", 3001);
        let mut service = ComposeService::image("grafana/grafana:latest")
            .port(port, 3000)
            .env("GF_SECURITY_ADMIN_PASSWORD", "${GRAFANA_ADMIN_PASSWORD}")
            .volume("grafana_data:/var/lib/grafana")
            .volume("./visualization/grafana/provisioning:/etc/grafana/provisioning:ro");
        if let Some(db) = data_source(context) {
            service = service.env(
                "DATA_DB_PASSWORD",
                db.credentials.get("password").cloned().unwrap_or_default(),
            );
        }
        service_map([("grafana", service)])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["grafana_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "GRAFANA_URL".to_string(),
                format!("http://localhost:{}", port_of(context, "grafana", 3001)),
            ),
            (
                "GRAFANA_ADMIN_PASSWORD".to_string(),
                secret_or(context, "grafana_admin_password", ""),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Wiring;
    use crate::secrets::{RngSecretSource, SecretRegistry};
    use crate::stack::providers::PostgresProvider;
    use crate::stack::Stack;

    fn context(viz: &str) -> ProjectContext {
        let stack = Stack::new()
            .with(Category::Storage, "PostgreSQL")
            .with(Category::Visualization, viz);
        let mut source = RngSecretSource::seeded(4);
        let secrets = SecretRegistry::new().secrets_for_stack(&stack, "acme", &mut source);
        let mut ctx = ProjectContext::with_secret_source("acme", stack, Box::new(source));
        ctx.extend_secrets(secrets);
        let pg = PostgresProvider;
        pg.register_services(&mut ServiceScope::new(pg.id(), &mut ctx))
            .unwrap();
        ctx
    }

    fn generate(provider: &dyn Provider, ctx: &ProjectContext) -> OutputContainer {
        let wiring = Wiring::None;
        let id = provider.id();
        let gen = GenerationContext {
            project: ctx,
            wiring: &wiring,
            component: &id,
        };
        let mut out = OutputContainer::new();
        provider.generate(&gen, &mut out).unwrap();
        out
    }

    #[test]
    fn test_visualization_needs_database() {
        let empty = ProjectContext::with_secret_source(
            "acme",
            Stack::new(),
            Box::new(RngSecretSource::seeded(4)),
        );
        assert_eq!(
            MetabaseProvider.validate_configuration(&empty).unwrap_err(),
            "Metabase requires a database to visualize"
        );
        assert!(MetabaseProvider.validate_configuration(&context("Metabase")).is_ok());
    }

    #[test]
    fn test_superset_database_uses_shared_password() {
        let ctx = context("Superset");
        let out = generate(&SupersetProvider, &ctx);
        let databases = out.get("visualization/superset/databases.yaml").unwrap();
        assert!(databases.contains(ctx.secret("postgres_password").unwrap()));
        assert!(databases.contains("@postgres:5432/acme_warehouse"));
    }

    #[test]
    fn test_grafana_provisions_warehouse() {
        let ctx = context("Grafana");
        let out = generate(&GrafanaProvider, &ctx);
        let yml = out
            .get("visualization/grafana/provisioning/datasources/datasources.yml")
            .unwrap();
        assert!(yml.contains("type: postgres"));
        assert!(yml.contains("database: acme_warehouse"));
    }

    #[test]
    fn test_metabase_ships_metadata_db() {
        let ctx = context("Metabase");
        let services = MetabaseProvider.compose_services(&ctx);
        assert!(services.contains_key("metabase-db"));
        assert_eq!(services["metabase"].depends_on, vec!["metabase-db"]);
    }
}
