use super::service_map;
use crate::output::{ComposeService, OutputContainer};
use crate::stack::{
    Capability, Category, ContextError, GenerationContext, ProjectContext, Provider, ServiceScope,
};
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::BTreeMap;

pub struct PrometheusProvider;

impl PrometheusProvider {
    fn scrape_config(project: &str, context: &ProjectContext) -> String {
        let mut config = format!(
            "global:\n  scrape_interval: 15s\n  evaluation_interval: 15s\n  external_labels:\n    cluster: '{}'\n\n\
             scrape_configs:\n  - job_name: 'prometheus'\n    static_configs:\n      - targets: ['localhost:9090']\n\n  \
             - job_name: 'node'\n    static_configs:\n      - targets: ['node-exporter:9100']\n",
            project
        );
        if Self::postgres_host(context).is_some() {
            config.push_str(
                "\n  - job_name: 'postgres'\n    static_configs:\n      - targets: ['postgres-exporter:9187']\n",
            );
        }
        if context.connection("airflow").is_some() {
            config.push_str(
                "\n  - job_name: 'airflow'\n    metrics_path: '/admin/metrics'\n    static_configs:\n      - targets: ['airflow:8080']\n",
            );
        }
        config
    }

    fn postgres_host(context: &ProjectContext) -> Option<String> {
        context
            .connections_by_type("postgres")
            .first()
            .map(|c| format!("{}:{}", c.host, c.port))
    }
}

impl Provider for PrometheusProvider {
    fn name(&self) -> &str {
        "Prometheus"
    }

    fn category(&self) -> Category {
        Category::Monitoring
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let port = scope.port("prometheus", 9090);
        scope.port("grafana-monitoring", 3002);
        let conn = scope
            .connection("prometheus", "prometheus")
            .port(port)
            .env_prefix("PROMETHEUS_")
            .capabilities([Capability::Monitoring]);
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        output.add(
            "monitoring/prometheus.yml",
            Self::scrape_config(ctx.project_name(), ctx.project),
        );
        output.add(
            "monitoring/grafana/datasources/prometheus.yml",
            "apiVersion: 1\n\ndatasources:\n  - name: Prometheus\n    type: prometheus\n    access: proxy\n    url: http://prometheus:9090\n    isDefault: true\n",
        );
        output.add(
            "monitoring/alerts.yml",
            "groups:\n  - name: stack\n    rules:\n      - alert: ServiceDown\n        expr: up == 0\n        for: 2m\n        labels:\n          severity: critical\n",
        );
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let port = context.ports().get("prometheus").copied().unwrap_or(9090);
        let grafana = context.ports().get("grafana-monitoring").copied().unwrap_or(3002);
        let mut services = service_map([
            (
                "prometheus",
                ComposeService::image("prom/prometheus:latest")
                    .port(port, 9090)
                    .volume("./monitoring/prometheus.yml:/etc/prometheus/prometheus.yml:ro")
                    .volume("./monitoring/alerts.yml:/etc/prometheus/alerts.yml:ro")
                    .volume("prometheus_data:/prometheus"),
            ),
            (
                "grafana-monitoring",
                ComposeService::image("grafana/grafana:latest")
                    .port(grafana, 3000)
                    .env("GF_SECURITY_ADMIN_PASSWORD", "${GRAFANA_ADMIN_PASSWORD:-admin}")
                    .volume("./monitoring/grafana/datasources:/etc/grafana/provisioning/datasources:ro")
                    .volume("grafana_monitoring_data:/var/lib/grafana")
                    .depends_on("prometheus"),
            ),
            (
                "node-exporter",
                ComposeService::image("prom/node-exporter:latest").port(9100, 9100),
            ),
        ]);
        if let Some(host) = Self::postgres_host(context) {
            services.insert(
                "postgres-exporter".to_string(),
                ComposeService::image("prometheuscommunity/postgres-exporter:latest")
                    .port(9187, 9187)
                    .env(
                        "DATA_SOURCE_NAME",
                        format!(
                            "postgresql://${{POSTGRES_USER}}:${{POSTGRES_PASSWORD}}@{}/postgres?sslmode=disable",
                            host
                        ),
                    ),
            );
        }
        services
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec![
            "prometheus_data".to_string(),
            "grafana_monitoring_data".to_string(),
        ]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let port = context.ports().get("prometheus").copied().unwrap_or(9090);
        let grafana = context.ports().get("grafana-monitoring").copied().unwrap_or(3002);
        BTreeMap::from([
            ("PROMETHEUS_URL".to_string(), format!("http://localhost:{}", port)),
            (
                "GRAFANA_MONITORING_URL".to_string(),
                format!("http://localhost:{}", grafana),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::RngSecretSource;
    use crate::stack::providers::PostgresProvider;
    use crate::stack::Stack;

    fn context(with_postgres: bool) -> ProjectContext {
        let mut ctx = ProjectContext::with_secret_source(
            "acme",
            Stack::new(),
            Box::new(RngSecretSource::seeded(6)),
        );
        if with_postgres {
            let pg = PostgresProvider;
            pg.register_services(&mut ServiceScope::new(pg.id(), &mut ctx))
                .unwrap();
        }
        PrometheusProvider
            .register_services(&mut ServiceScope::new(PrometheusProvider.id(), &mut ctx))
            .unwrap();
        ctx
    }

    #[test]
    fn test_postgres_exporter_only_with_postgres() {
        assert!(PrometheusProvider
            .compose_services(&context(true))
            .contains_key("postgres-exporter"));
        assert!(!PrometheusProvider
            .compose_services(&context(false))
            .contains_key("postgres-exporter"));
    }

    #[test]
    fn test_scrape_config_follows_services() {
        let config = PrometheusProvider::scrape_config("acme", &context(true));
        assert!(config.contains("postgres-exporter:9187"));
        assert!(config.contains("cluster: 'acme'"));
        assert!(!config.contains("airflow"));
    }
}
