//! Built-in providers, one module per category

pub mod infrastructure;
pub mod ingestion;
pub mod monitoring;
pub mod orchestration;
pub mod quality;
pub mod storage;
pub mod transformation;
pub mod visualization;

use super::{Category, ProjectContext, ProviderRegistry};
use crate::output::ComposeService;
use crate::secrets;
use indexmap::IndexMap;

pub use infrastructure::TerraformProvider;
pub use ingestion::{AirbyteProvider, DltProvider, KafkaProvider};
pub use monitoring::PrometheusProvider;
pub use orchestration::{AirflowProvider, DagsterProvider, MageProvider, PrefectProvider};
pub use quality::{GreatExpectationsProvider, SodaProvider};
pub use storage::{
    BigQueryProvider, DuckDbProvider, MongoDbProvider, PostgresProvider, RedshiftProvider,
    SnowflakeProvider,
};
pub use transformation::{DbtProvider, SparkProvider};
pub use visualization::{GrafanaProvider, MetabaseProvider, SupersetProvider};

pub(crate) fn register_builtin(registry: &mut ProviderRegistry) {
    registry.insert(Category::Ingestion, "DLT", || Box::new(DltProvider));
    registry.insert(Category::Ingestion, "Airbyte", || Box::new(AirbyteProvider));
    registry.insert(Category::Ingestion, "Kafka", || Box::new(KafkaProvider));

    registry.insert(Category::Storage, "PostgreSQL", || Box::new(PostgresProvider));
    registry.insert(Category::Storage, "Snowflake", || Box::new(SnowflakeProvider));
    registry.insert(Category::Storage, "BigQuery", || Box::new(BigQueryProvider));
    registry.insert(Category::Storage, "Redshift", || Box::new(RedshiftProvider));
    registry.insert(Category::Storage, "DuckDB", || Box::new(DuckDbProvider));
    registry.insert(Category::Storage, "MongoDB", || Box::new(MongoDbProvider));

    registry.insert(Category::Transformation, "dbt", || Box::new(DbtProvider));
    registry.insert(Category::Transformation, "Spark", || Box::new(SparkProvider));

    registry.insert(Category::Orchestration, "Airflow", || Box::new(AirflowProvider));
    registry.insert(Category::Orchestration, "Prefect", || Box::new(PrefectProvider));
    registry.insert(Category::Orchestration, "Dagster", || Box::new(DagsterProvider));
    registry.insert(Category::Orchestration, "Mage", || Box::new(MageProvider));

    registry.insert(Category::Visualization, "Metabase", || Box::new(MetabaseProvider));
    registry.insert(Category::Visualization, "Superset", || Box::new(SupersetProvider));
    registry.insert(Category::Visualization, "Grafana", || Box::new(GrafanaProvider));

    registry.insert(Category::Quality, "Great Expectations", || {
        Box::new(GreatExpectationsProvider)
    });
    registry.insert(Category::Quality, "Soda", || Box::new(SodaProvider));

    registry.insert(Category::Monitoring, "Prometheus", || Box::new(PrometheusProvider));

    registry.insert(Category::Infrastructure, "Terraform", || Box::new(TerraformProvider));
}

pub(crate) fn service_map<const N: usize>(
    services: [(&str, ComposeService); N],
) -> IndexMap<String, ComposeService> {
    services
        .into_iter()
        .map(|(name, service)| (name.to_string(), service))
        .collect()
}

pub(crate) fn secret_or(context: &ProjectContext, key: &str, fallback: &str) -> String {
    context.secret(key).unwrap_or(fallback).to_string()
}

/// URI of the selected storage built from the run's shared secrets.
pub(crate) fn storage_url(context: &ProjectContext) -> Option<String> {
    let storage = context.stack().get(Category::Storage)?;
    secrets::connection_string(storage, context.secrets(), None).ok()
}

/// Python requirement lines for `packages`, one per line.
pub(crate) fn requirements(packages: &[String]) -> String {
    let mut out = packages.join("\n");
    out.push('\n');
    out
}
