//! Derived configuration handed to each component before generation

use crate::stack::{Capability, Category, ComponentId, ProjectContext, ServiceConnection};
use serde::{Deserialize, Serialize};

/// A discovered database or warehouse a component reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageTarget {
    pub owner: ComponentId,
    pub service: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub connection_string: Option<String>,
}

impl StorageTarget {
    fn from_connection(conn: &ServiceConnection) -> Self {
        Self {
            owner: conn.owner.clone(),
            service: conn.name.clone(),
            service_type: conn.service_type.clone(),
            host: conn.host.clone(),
            port: conn.port,
            database: conn
                .extra
                .get("db_name")
                .cloned()
                .unwrap_or_else(|| "warehouse".to_string()),
            user: conn.credentials.get("username").cloned().unwrap_or_default(),
            password: conn.credentials.get("password").cloned().unwrap_or_default(),
            connection_string: conn.connection_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub host: String,
    pub port: u16,
    pub connection_string: Option<String>,
    pub capabilities: Vec<Capability>,
}

impl From<&ServiceConnection> for ConnectionSummary {
    fn from(conn: &ServiceConnection) -> Self {
        Self {
            name: conn.name.clone(),
            service_type: conn.service_type.clone(),
            host: conn.host.clone(),
            port: conn.port,
            connection_string: conn.connection_string(),
            capabilities: conn.capabilities.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum Wiring {
    #[default]
    None,
    /// Where an ingestion component lands data.
    Destination(StorageTarget),
    /// What a transformation component runs against.
    Target(StorageTarget),
    /// Every registered service, for orchestrators.
    Connections(Vec<ConnectionSummary>),
}

impl Wiring {
    /// Wiring for a component of `category`. Reads the context, never
    /// changes it.
    pub fn for_category(category: Category, context: &ProjectContext) -> Self {
        match category {
            Category::Ingestion => find_storage(context)
                .map(|c| Wiring::Destination(StorageTarget::from_connection(c)))
                .unwrap_or_default(),
            Category::Transformation => find_storage(context)
                .map(|c| Wiring::Target(StorageTarget::from_connection(c)))
                .unwrap_or_default(),
            Category::Orchestration => Wiring::Connections(
                context.connections().iter().map(ConnectionSummary::from).collect(),
            ),
            _ => Wiring::None,
        }
    }

    pub fn storage_target(&self) -> Option<&StorageTarget> {
        match self {
            Wiring::Destination(target) | Wiring::Target(target) => Some(target),
            _ => None,
        }
    }

    pub fn connections(&self) -> &[ConnectionSummary] {
        match self {
            Wiring::Connections(conns) => conns,
            _ => &[],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Wiring::None)
    }
}

fn find_storage(context: &ProjectContext) -> Option<&ServiceConnection> {
    context
        .service_by_capability(&Capability::Warehouse)
        .or_else(|| context.service_by_capability(&Capability::Database))
}

/// Tools that need a storage-specific adapter or driver name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterTool {
    Dlt,
    Dbt,
    SqlAlchemy,
}

/// Adapter name `tool` uses to talk to `storage`.
pub fn storage_adapter(storage: &str, tool: AdapterTool) -> Option<&'static str> {
    let (dlt, dbt, sqlalchemy) = match storage {
        "PostgreSQL" => ("postgres", "postgres", "postgresql+psycopg2"),
        "Snowflake" => ("snowflake", "snowflake", "snowflake"),
        "BigQuery" => ("bigquery", "bigquery", "bigquery"),
        "DuckDB" => ("duckdb", "duckdb", "duckdb"),
        "Redshift" => ("redshift", "redshift", "redshift+psycopg2"),
        _ => return None,
    };
    Some(match tool {
        AdapterTool::Dlt => dlt,
        AdapterTool::Dbt => dbt,
        AdapterTool::SqlAlchemy => sqlalchemy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::RngSecretSource;
    use crate::stack::Stack;

    fn context_with(conns: Vec<ServiceConnection>) -> ProjectContext {
        let mut ctx = ProjectContext::with_secret_source(
            "acme",
            Stack::new(),
            Box::new(RngSecretSource::seeded(1)),
        );
        for conn in conns {
            ctx.register_connection(conn).unwrap();
        }
        ctx
    }

    fn duckdb() -> ServiceConnection {
        ServiceConnection::new(ComponentId::new(Category::Storage, "DuckDB"), "duckdb", "duckdb")
            .capabilities([Capability::Database])
    }

    fn postgres() -> ServiceConnection {
        ServiceConnection::new(ComponentId::new(Category::Storage, "PostgreSQL"), "postgres", "postgres")
            .port(5432)
            .credential("username", "u")
            .credential("password", "p")
            .extra("db_name", "acme_warehouse")
            .capabilities([Capability::Database, Capability::Warehouse])
    }

    #[test]
    fn test_warehouse_preferred_over_database() {
        let ctx = context_with(vec![duckdb(), postgres()]);
        let wiring = Wiring::for_category(Category::Ingestion, &ctx);
        let target = wiring.storage_target().unwrap();
        assert!(matches!(wiring, Wiring::Destination(_)));
        assert_eq!(target.service, "postgres");
        assert_eq!(target.database, "acme_warehouse");
        assert_eq!(
            target.connection_string.as_deref(),
            Some("postgres://u:p@postgres:5432/acme_warehouse")
        );
    }

    #[test]
    fn test_transformation_falls_back_to_database() {
        let ctx = context_with(vec![duckdb()]);
        let wiring = Wiring::for_category(Category::Transformation, &ctx);
        assert!(matches!(wiring, Wiring::Target(ref t) if t.service == "duckdb"));
    }

    #[test]
    fn test_orchestration_sees_every_connection() {
        let ctx = context_with(vec![duckdb(), postgres()]);
        let wiring = Wiring::for_category(Category::Orchestration, &ctx);
        let names: Vec<&str> = wiring.connections().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["duckdb", "postgres"]);
    }

    #[test]
    fn test_no_wiring_without_storage() {
        let ctx = context_with(vec![]);
        assert!(Wiring::for_category(Category::Ingestion, &ctx).is_none());
        assert!(Wiring::for_category(Category::Visualization, &ctx).is_none());
    }

    #[test]
    fn test_storage_adapter() {
        assert_eq!(storage_adapter("PostgreSQL", AdapterTool::Dbt), Some("postgres"));
        assert_eq!(
            storage_adapter("Redshift", AdapterTool::SqlAlchemy),
            Some("redshift+psycopg2")
        );
        assert_eq!(storage_adapter("MongoDB", AdapterTool::Dlt), None);
    }
}
