use super::{requirements, service_map, storage_url};
use crate::output::{ComposeService, Healthcheck, OutputContainer};
use crate::pipeline::wiring::{storage_adapter, AdapterTool};
use crate::stack::{
    Capability, Category, ContextError, DataSource, DependencySpec, GenerationContext,
    ProjectContext, Provider, ServiceScope,
};
use crate::validation::required_packages;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::json;
use std::collections::BTreeMap;

fn has_destination(context: &ProjectContext) -> bool {
    context.service_by_capability(&Capability::Warehouse).is_some()
        || context.service_by_capability(&Capability::Database).is_some()
}

pub struct DltProvider;

impl DltProvider {
    fn pipeline_script(source: Option<&DataSource>, destination: &str, dataset: &str) -> String {
        let (name, resource) = match source {
            Some(source) => (source.name.as_str(), source.connector.as_str()),
            None => ("antigravity_pipeline", "sample"),
        };
        let endpoint = source
            .and_then(|s| s.config.get("base_url"))
            .and_then(|v| v.as_str())
            .unwrap_or("https://api.example.com/data");
        format!(
            r#"import dlt
from dlt.sources.helpers import requests


@dlt.resource(name="{resource}", write_disposition="append")
def {resource}_resource():
    response = requests.get("{endpoint}")
    response.raise_for_status()
    yield response.json()


if __name__ == "__main__":
    pipeline = dlt.pipeline(
        pipeline_name="{name}",
        destination="{destination}",
        dataset_name="{dataset}",
    )
    info = pipeline.run({resource}_resource())
    print(info)
"#,
            resource = resource.replace(['-', ' '], "_"),
            endpoint = endpoint,
            name = name,
            destination = destination,
            dataset = dataset,
        )
    }
}

impl Provider for DltProvider {
    fn name(&self) -> &str {
        "DLT"
    }

    fn category(&self) -> Category {
        Category::Ingestion
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let conn = scope
            .connection("dlt_ingestion", "dlt")
            .host("localhost")
            .env_prefix("DLT_")
            .capabilities([Capability::Ingestion]);
        scope.register(conn)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Warehouse)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        if has_destination(context) {
            Ok(())
        } else {
            Err("DLT requires a warehouse or database destination".to_string())
        }
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let storage = ctx.storage().unwrap_or("PostgreSQL");
        let destination = storage_adapter(storage, AdapterTool::Dlt).unwrap_or("postgres");
        let dataset = format!("{}_raw", ctx.project_name());

        let sources: Vec<&DataSource> = ctx.project.enabled_data_sources().collect();
        if sources.is_empty() {
            output.add(
                "ingestion/pipeline.py",
                Self::pipeline_script(None, destination, &dataset),
            );
        }
        for source in sources {
            output.add(
                format!("ingestion/pipelines/{}.py", source.name),
                Self::pipeline_script(Some(source), destination, &dataset),
            );
        }

        output.add(
            "ingestion/requirements.txt",
            requirements(&required_packages(self.name(), storage)),
        );
        output.add(
            "ingestion/Dockerfile",
            "FROM python:3.11-slim\n\n\
             WORKDIR /app\n\
             COPY requirements.txt .\n\
             RUN pip install --no-cache-dir -r requirements.txt\n\
             COPY . .\n\n\
             CMD [\"python\", \"pipeline.py\"]\n",
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let mut service = ComposeService::image("python:3.11-slim")
            .oneshot()
            .env("PIPELINE_NAME", format!("{}_pipeline", context.project_name()))
            .volume("./ingestion:/app")
            .command("sh -c \"pip install -q -r /app/requirements.txt && python /app/pipeline.py\"");
        if let Some(url) = storage_url(context) {
            service = service.env("DESTINATION__CREDENTIALS", url);
        }
        if let Some(storage) = context.service_by_capability(&Capability::Warehouse) {
            if storage.port > 0 {
                service = service.depends_on(storage.name.clone());
            }
        }
        service_map([("dlt_ingestion", service)])
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::from([(
            "PIPELINE_NAME".to_string(),
            format!("{}_pipeline", context.project_name()),
        )]);
        if let Some(url) = storage_url(context) {
            vars.insert("DESTINATION__CREDENTIALS".to_string(), url);
        }
        vars
    }
}

pub struct AirbyteProvider;

impl Provider for AirbyteProvider {
    fn name(&self) -> &str {
        "Airbyte"
    }

    fn category(&self) -> Category {
        Category::Ingestion
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let webapp = scope.port("airbyte-webapp", 8000);
        let api = scope.port("airbyte-server", 8001);
        let conn = scope
            .connection("airbyte", "airbyte")
            .host("airbyte-webapp")
            .port(webapp)
            .env_prefix("AIRBYTE_")
            .capabilities([Capability::Ingestion])
            .credential("password", scope.secret("airbyte_db_password"))
            .extra("api_port", api.to_string());
        scope.register(conn)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        vec![DependencySpec::capability(Capability::Database)]
    }

    fn validate_configuration(&self, context: &ProjectContext) -> Result<(), String> {
        if has_destination(context) {
            Ok(())
        } else {
            Err("Airbyte requires a warehouse or database destination".to_string())
        }
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let destination = ctx.wiring.storage_target().map(|t| {
            json!({
                "name": format!("{}-destination", ctx.project_name()),
                "type": t.service_type,
                "host": t.host,
                "port": t.port,
                "database": t.database,
                "username": t.user,
            })
        });
        let sources: Vec<_> = ctx
            .project
            .enabled_data_sources()
            .map(|s| {
                json!({
                    "name": s.name,
                    "connector": s.connector,
                    "schedule": s.schedule,
                    "config": s.config,
                })
            })
            .collect();
        let doc = json!({
            "workspace": ctx.project_name(),
            "destination": destination,
            "sources": sources,
        });
        output.add(
            "ingestion/airbyte/connections.json",
            serde_json::to_string_pretty(&doc).context("Failed to render Airbyte connections")?,
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let webapp = context.ports().get("airbyte-webapp").copied().unwrap_or(8000);
        let api = context.ports().get("airbyte-server").copied().unwrap_or(8001);
        service_map([
            (
                "airbyte-db",
                ComposeService::image("airbyte/db:0.50.0")
                    .env("POSTGRES_USER", "airbyte")
                    .env("POSTGRES_PASSWORD", "${AIRBYTE_DB_PASSWORD}")
                    .volume("airbyte_data:/var/lib/postgresql/data"),
            ),
            (
                "airbyte-server",
                ComposeService::image("airbyte/server:0.50.0")
                    .env("DATABASE_URL", "jdbc:postgresql://airbyte-db:5432/airbyte")
                    .env("DATABASE_USER", "airbyte")
                    .env("DATABASE_PASSWORD", "${AIRBYTE_DB_PASSWORD}")
                    .port(api, 8001)
                    .depends_on("airbyte-db"),
            ),
            (
                "airbyte-webapp",
                ComposeService::image("airbyte/webapp:0.50.0")
                    .env("AIRBYTE_SERVER_HOST", "airbyte-server:8001")
                    .port(webapp, 80)
                    .depends_on("airbyte-server"),
            ),
            (
                "airbyte-worker",
                ComposeService::image("airbyte/worker:0.50.0")
                    .volume("/var/run/docker.sock:/var/run/docker.sock")
                    .depends_on("airbyte-server"),
            ),
        ])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["airbyte_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        BTreeMap::from([(
            "AIRBYTE_DB_PASSWORD".to_string(),
            super::secret_or(context, "airbyte_db_password", "airbyte"),
        )])
    }
}

pub struct KafkaProvider;

impl Provider for KafkaProvider {
    fn name(&self) -> &str {
        "Kafka"
    }

    fn category(&self) -> Category {
        Category::Ingestion
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let port = scope.port("kafka", 9092);
        scope.port("kafka-ui", 8080);
        let conn = scope
            .connection("kafka", "kafka")
            .port(port)
            .env_prefix("KAFKA_")
            .capabilities([Capability::MessageQueue, Capability::StreamProcessing])
            .extra("bootstrap_servers", format!("kafka:{}", port));
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let mut topics: Vec<String> = ctx
            .project
            .enabled_data_sources()
            .filter(|s| s.source_type == "stream")
            .map(|s| s.name.clone())
            .collect();
        if topics.is_empty() {
            topics.push("raw_events".to_string());
        }

        let mut script = String::from("#!/bin/bash\nset -euo pipefail\n\n");
        for topic in &topics {
            script.push_str(&format!(
                "kafka-topics --bootstrap-server kafka:9092 --create --if-not-exists \
                 --topic {} --partitions 3 --replication-factor 1\n",
                topic
            ));
        }
        output.add("ingestion/kafka/create_topics.sh", script);

        let sink = ctx
            .project
            .service_by_capability(&Capability::Database)
            .and_then(|c| c.connection_string())
            .unwrap_or_default();
        output.add(
            "ingestion/kafka/consumer.py",
            format!(
                r#"import json
import os

from kafka import KafkaConsumer

TOPICS = {topics:?}
SINK_URL = os.environ.get("SINK_URL", "{sink}")

consumer = KafkaConsumer(
    *TOPICS,
    bootstrap_servers=os.environ.get("KAFKA_BOOTSTRAP_SERVERS", "kafka:9092"),
    value_deserializer=lambda m: json.loads(m.decode("utf-8")),
)

for message in consumer:
    print(message.topic, message.value)
"#,
                topics = topics,
                sink = sink,
            ),
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = context.ports().get("kafka").copied().unwrap_or(9092);
        let ui = context.ports().get("kafka-ui").copied().unwrap_or(8080);
        service_map([
            (
                "zookeeper",
                ComposeService::image("confluentinc/cp-zookeeper:7.5.0")
                    .env("ZOOKEEPER_CLIENT_PORT", "2181")
                    .env("ZOOKEEPER_TICK_TIME", "2000")
                    .volume("zookeeper_data:/var/lib/zookeeper/data"),
            ),
            (
                "kafka",
                ComposeService::image("confluentinc/cp-kafka:7.5.0")
                    .env("KAFKA_BROKER_ID", "1")
                    .env("KAFKA_ZOOKEEPER_CONNECT", "zookeeper:2181")
                    .env("KAFKA_ADVERTISED_LISTENERS", "PLAINTEXT://kafka:9092")
                    .env("KAFKA_OFFSETS_TOPIC_REPLICATION_FACTOR", "1")
                    .port(port, 9092)
                    .volume("kafka_data:/var/lib/kafka/data")
                    .volume("./ingestion/kafka:/scripts")
                    .depends_on("zookeeper")
                    .healthcheck(Healthcheck::cmd(&[
                        "kafka-topics",
                        "--bootstrap-server",
                        "localhost:9092",
                        "--list",
                    ])),
            ),
            (
                "kafka-ui",
                ComposeService::image("provectuslabs/kafka-ui:latest")
                    .env("KAFKA_CLUSTERS_0_NAME", context.project_name())
                    .env("KAFKA_CLUSTERS_0_BOOTSTRAPSERVERS", "kafka:9092")
                    .port(ui, 8080)
                    .depends_on("kafka"),
            ),
        ])
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["zookeeper_data".to_string(), "kafka_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = context.ports().get("kafka").copied().unwrap_or(9092);
        BTreeMap::from([(
            "KAFKA_BOOTSTRAP_SERVERS".to_string(),
            format!("kafka:{}", port),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Wiring;
    use crate::secrets::RngSecretSource;
    use crate::stack::providers::PostgresProvider;
    use crate::stack::Stack;

    fn context() -> ProjectContext {
        let stack = Stack::new()
            .with(Category::Storage, "PostgreSQL")
            .with(Category::Ingestion, "DLT");
        let mut ctx =
            ProjectContext::with_secret_source("acme", stack, Box::new(RngSecretSource::seeded(3)));
        let pg = PostgresProvider;
        pg.register_services(&mut ServiceScope::new(pg.id(), &mut ctx))
            .unwrap();
        ctx
    }

    #[test]
    fn test_dlt_requires_destination() {
        let empty = ProjectContext::with_secret_source(
            "acme",
            Stack::new(),
            Box::new(RngSecretSource::seeded(3)),
        );
        assert!(DltProvider.validate_configuration(&empty).is_err());
        assert!(DltProvider.validate_configuration(&context()).is_ok());
    }

    #[test]
    fn test_dlt_one_pipeline_per_enabled_source() {
        let mut ctx = context();
        let mut disabled = DataSource::new("billing", "api", "stripe");
        disabled.enabled = false;
        ctx.add_data_source(DataSource::new("crm", "api", "hubspot")).unwrap();
        ctx.add_data_source(disabled).unwrap();

        let wiring = Wiring::for_category(Category::Ingestion, &ctx);
        let id = DltProvider.id();
        let gen = GenerationContext {
            project: &ctx,
            wiring: &wiring,
            component: &id,
        };
        let mut out = OutputContainer::new();
        DltProvider.generate(&gen, &mut out).unwrap();

        let script = out.get("ingestion/pipelines/crm.py").unwrap();
        assert!(script.contains("destination=\"postgres\""));
        assert!(!out.contains("ingestion/pipelines/billing.py"));
        assert!(!out.contains("ingestion/pipeline.py"));
        assert_eq!(out.get("ingestion/requirements.txt"), Some("dlt[postgres]\n"));
    }

    #[test]
    fn test_kafka_registers_stream_capabilities() {
        let mut ctx = context();
        KafkaProvider
            .register_services(&mut ServiceScope::new(KafkaProvider.id(), &mut ctx))
            .unwrap();
        let conn = ctx.connection("kafka").unwrap();
        assert!(conn.has_capability(&Capability::StreamProcessing));
        assert_eq!(ctx.ports()["kafka-ui"], 8080);
        assert_eq!(KafkaProvider.compose_services(&ctx).len(), 3);
    }
}
