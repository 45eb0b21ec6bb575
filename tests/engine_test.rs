//! End-to-end runs of the generation engine
//!
//! These tests drive `GenerationOrchestrator` with the built-in providers
//! and with small test providers registered next to them. Secrets come from
//! a seeded source so that runs are reproducible.

use antigravity::output::{
    ComposeFile, ComposeService, OutputContainer, RunMetadata, COMPONENT_LABEL, COMPOSE_FILE,
    METADATA_FILE,
};
use antigravity::pipeline::{GenerationOrchestrator, GenerationOutcome, GenerationRequest};
use antigravity::secrets::RngSecretSource;
use antigravity::stack::{
    Category, ComponentId, DependencySpec, GenerationContext, ProjectContext, Provider,
    ProviderRegistry, Stack,
};
use indexmap::IndexMap;

/// Minimal provider with configurable dependencies and failure.
#[derive(Clone)]
struct TestProvider {
    category: Category,
    name: &'static str,
    deps: Vec<DependencySpec>,
    fail: bool,
}

impl TestProvider {
    fn new(category: Category, name: &'static str) -> Self {
        Self {
            category,
            name,
            deps: Vec::new(),
            fail: false,
        }
    }

    fn depends_on(mut self, category: Category, name: &str) -> Self {
        self.deps.push(DependencySpec::component(category, name));
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn file(&self) -> String {
        format!("{}/{}.txt", self.category, self.name.to_lowercase())
    }
}

impl Provider for TestProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        self.deps.clone()
    }

    fn generate(&self, _ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("template {} is missing", self.file());
        }
        output.add(self.file(), format!("generated by {}\n", self.name));
        Ok(())
    }

    fn compose_services(&self, _context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let mut services = IndexMap::new();
        services.insert(
            self.name.to_lowercase(),
            ComposeService::image(format!("example/{}:latest", self.name.to_lowercase())),
        );
        services
    }
}

fn register(registry: &mut ProviderRegistry, provider: TestProvider) {
    let category = provider.category;
    let name = provider.name;
    registry.insert(category, name, move || Box::new(provider.clone()));
}

fn request(stack: Stack) -> GenerationRequest {
    GenerationRequest::new("acme", stack).with_secret_source(Box::new(RngSecretSource::seeded(7)))
}

fn generate(registry: &ProviderRegistry, stack: Stack) -> GenerationOutcome {
    GenerationOrchestrator::new(registry)
        .generate(request(stack))
        .expect("generation should succeed")
}

fn compose(outcome: &GenerationOutcome) -> ComposeFile {
    ComposeFile::from_yaml(outcome.output.get(COMPOSE_FILE).expect("compose file")).unwrap()
}

fn env_value<'a>(env_file: &'a str, key: &str) -> Option<&'a str> {
    env_file
        .lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
        .map(|value| {
            value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .unwrap_or(value)
        })
}

fn yaml(outcome: &GenerationOutcome, path: &str) -> serde_yaml::Value {
    serde_yaml::from_str(outcome.output.get(path).unwrap_or_else(|| panic!("missing {}", path)))
        .unwrap()
}

/// The URI every consumer should use for the PostgreSQL warehouse, built
/// from the values the storage component exports.
fn postgres_uri(env: &str) -> String {
    format!(
        "postgresql://{}:{}@postgres:5432/{}",
        urlencoding::encode(env_value(env, "POSTGRES_USER").unwrap()),
        urlencoding::encode(env_value(env, "POSTGRES_PASSWORD").unwrap()),
        env_value(env, "POSTGRES_DB").unwrap(),
    )
}

#[test]
fn test_postgres_dbt_airflow_end_to_end() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Transformation, "dbt")
        .with(Category::Orchestration, "Airflow");

    let outcome = generate(&registry, stack);
    assert!(!outcome.is_partial());

    let order: Vec<String> = outcome.order.iter().map(ToString::to_string).collect();
    let storage = order.iter().position(|id| id == "storage:PostgreSQL").unwrap();
    let dbt = order.iter().position(|id| id == "transformation:dbt").unwrap();
    assert!(storage < dbt);

    let compose = compose(&outcome);
    for id in ["storage:PostgreSQL", "transformation:dbt", "orchestration:Airflow"] {
        assert!(
            compose
                .services
                .values()
                .any(|s| s.labels.get(COMPONENT_LABEL).map(String::as_str) == Some(id)),
            "no compose service for {}",
            id
        );
    }
    for service in compose.services.values() {
        assert_eq!(service.networks, vec![compose.network().to_string()]);
    }

    let metadata_files: Vec<&str> = outcome
        .output
        .paths()
        .filter(|p| p.ends_with(METADATA_FILE))
        .collect();
    assert_eq!(metadata_files, vec![METADATA_FILE]);

    for path in [
        "README.md",
        "ARCHITECTURE.md",
        ".env.dev",
        ".env.example",
        "scripts/switch-env.sh",
        "storage/postgres/init.sql",
        "dbt_project/profiles.yml",
        "Makefile",
        ".devcontainer/devcontainer.json",
    ] {
        assert!(outcome.output.contains(path), "missing {}", path);
    }
}

#[test]
fn test_secrets_are_shared_between_components() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Transformation, "dbt");

    let outcome = generate(&registry, stack);
    let env = outcome.output.get(".env.dev").unwrap();

    let postgres = env_value(env, "POSTGRES_PASSWORD").unwrap();
    assert_eq!(postgres.len(), 16);
    assert_eq!(env_value(env, "DBT_DB_PASSWORD"), Some(postgres));
    let profiles = outcome.output.get("dbt_project/profiles.yml").unwrap();
    assert!(!profiles.contains(postgres));
    let profiles = yaml(&outcome, "dbt_project/profiles.yml");
    assert_eq!(
        profiles["acme"]["outputs"]["dev"]["password"],
        "{{ env_var('DBT_DB_PASSWORD') }}"
    );

    let example = outcome.output.get(".env.example").unwrap();
    assert!(!example.contains(postgres));
}

#[test]
fn test_storage_password_shared_by_every_consumer() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Transformation, "dbt")
        .with(Category::Visualization, "Metabase")
        .with(Category::Quality, "Soda");

    let outcome = generate(&registry, stack);
    assert!(!outcome.is_partial());
    let env = outcome.output.get(".env.dev").unwrap();

    let password = env_value(env, "POSTGRES_PASSWORD").unwrap();
    assert!(!password.is_empty());
    assert_eq!(env_value(env, "DBT_DB_PASSWORD"), Some(password));
    assert_eq!(env_value(env, "SODA_DB_PASSWORD"), Some(password));

    let soda = yaml(&outcome, "quality/soda/configuration.yml");
    let source = &soda["data_source warehouse"];
    assert_eq!(source["password"], "${SODA_DB_PASSWORD}");
    assert_eq!(source["username"].as_str(), env_value(env, "POSTGRES_USER"));
    assert_eq!(source["database"].as_str(), env_value(env, "POSTGRES_DB"));

    let metabase: serde_json::Value = serde_json::from_str(
        outcome.output.get("visualization/metabase/database.json").unwrap(),
    )
    .unwrap();
    let details = &metabase["databases"][0]["details"];
    assert_eq!(details["host"], "postgres");
    assert_eq!(details["user"].as_str(), env_value(env, "POSTGRES_USER"));
    assert_eq!(details["dbname"].as_str(), env_value(env, "POSTGRES_DB"));
    assert_ne!(env_value(env, "METABASE_DB_PASSWORD"), Some(password));
}

#[test]
fn test_storage_uri_shared_by_every_consumer() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Transformation, "dbt")
        .with(Category::Visualization, "Superset")
        .with(Category::Quality, "Great Expectations");

    let outcome = generate(&registry, stack);
    assert!(!outcome.is_partial());
    let env = outcome.output.get(".env.dev").unwrap();
    let expected = postgres_uri(env);

    let ge = yaml(&outcome, "quality/great_expectations/great_expectations.yml");
    assert_eq!(
        ge["datasources"]["warehouse"]["execution_engine"]["connection_string"].as_str(),
        Some(expected.as_str())
    );
    let superset = yaml(&outcome, "visualization/superset/databases.yaml");
    assert_eq!(
        superset["databases"][0]["sqlalchemy_uri"].as_str(),
        Some(expected.as_str())
    );
    assert_eq!(
        env_value(env, "DBT_DB_PASSWORD"),
        env_value(env, "POSTGRES_PASSWORD")
    );
}

#[test]
fn test_generation_is_reproducible() {
    let registry = ProviderRegistry::with_defaults();
    let stack: Stack = "storage=PostgreSQL,ingestion=DLT,transformation=dbt,orchestration=Airflow"
        .parse()
        .unwrap();

    let first = generate(&registry, stack.clone());
    let second = generate(&registry, stack);

    let files = |outcome: &GenerationOutcome| -> Vec<(String, String)> {
        outcome
            .output
            .iter()
            .filter(|(path, _)| *path != METADATA_FILE)
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    };
    assert_eq!(files(&first), files(&second));
    assert_eq!(first.order, second.order);
}

#[test]
fn test_missing_storage_is_fatal() {
    let registry = ProviderRegistry::with_defaults();
    let failure = GenerationOrchestrator::new(&registry)
        .generate(request(Stack::new().with(Category::Transformation, "dbt")))
        .unwrap_err();

    assert!(failure
        .errors
        .iter()
        .any(|e| e.kind() == "missing_required_category"));
    assert!(failure
        .messages()
        .iter()
        .any(|m| m.starts_with("Storage is required")));
}

#[test]
fn test_kafka_with_dbt_is_rejected() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Ingestion, "Kafka")
        .with(Category::Transformation, "dbt");

    let failure = GenerationOrchestrator::new(&registry)
        .generate(request(stack))
        .unwrap_err();
    assert!(failure.errors.iter().any(|e| e.kind() == "incompatible_stack"
        && e.to_string().contains("Kafka (streaming) is incompatible with dbt (batch)")));
}

#[test]
fn test_nosql_rules_batch_all_errors() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "MongoDB")
        .with(Category::Transformation, "dbt")
        .with(Category::Quality, "Great Expectations");

    let failure = GenerationOrchestrator::new(&registry)
        .generate(request(stack))
        .unwrap_err();
    let messages = failure.messages();
    assert!(messages.iter().any(|m| m.contains("MongoDB (NoSQL) is incompatible with dbt")));
    assert!(messages
        .iter()
        .any(|m| m.contains("not fully supported by Great Expectations")));
}

#[test]
fn test_skipped_category_is_not_generated() {
    let registry = ProviderRegistry::with_defaults();
    let stack = Stack::new()
        .with(Category::Storage, "DuckDB")
        .with(Category::Orchestration, "");

    let outcome = generate(&registry, stack);
    assert_eq!(outcome.order, vec![ComponentId::new(Category::Storage, "DuckDB")]);
}

#[test]
fn test_registered_provider_overrides_builtin() {
    let mut registry = ProviderRegistry::with_defaults();
    let custom = TestProvider::new(Category::Storage, "PostgreSQL");
    let custom_file = custom.file();
    register(&mut registry, custom);

    let outcome = generate(&registry, Stack::new().with(Category::Storage, "PostgreSQL"));
    assert!(outcome.output.contains(&custom_file));
    assert!(!outcome.output.contains("storage/postgres/init.sql"));
}

#[test]
fn test_failing_component_yields_partial_project() {
    let mut registry = ProviderRegistry::with_defaults();
    register(
        &mut registry,
        TestProvider::new(Category::Visualization, "Broken").failing(),
    );

    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Visualization, "Broken");
    let outcome = generate(&registry, stack);

    assert!(outcome.is_partial());
    assert_eq!(outcome.component_errors.len(), 1);
    let failed = &outcome.component_errors[0];
    assert_eq!(failed.component, ComponentId::new(Category::Visualization, "Broken"));
    assert!(failed.message.contains("template visualization/broken.txt is missing"));

    assert!(!outcome.output.contains("visualization/broken.txt"));
    assert!(outcome.output.contains("storage/postgres/init.sql"));
    let compose = compose(&outcome);
    assert!(compose.services.contains_key("postgres"));
    assert!(!compose.services.contains_key("broken"));
    assert!(!outcome.output.get("ARCHITECTURE.md").unwrap().contains("Broken"));
}

#[test]
fn test_three_component_cycle_is_fatal() {
    let mut registry = ProviderRegistry::with_defaults();
    register(
        &mut registry,
        TestProvider::new(Category::Ingestion, "Alpha").depends_on(Category::Transformation, "Beta"),
    );
    register(
        &mut registry,
        TestProvider::new(Category::Transformation, "Beta").depends_on(Category::Orchestration, "Gamma"),
    );
    register(
        &mut registry,
        TestProvider::new(Category::Orchestration, "Gamma").depends_on(Category::Ingestion, "Alpha"),
    );

    let stack = Stack::new()
        .with(Category::Storage, "PostgreSQL")
        .with(Category::Ingestion, "Alpha")
        .with(Category::Transformation, "Beta")
        .with(Category::Orchestration, "Gamma");
    let failure = GenerationOrchestrator::new(&registry)
        .generate(request(stack))
        .unwrap_err();

    let cycles: Vec<String> = failure
        .errors
        .iter()
        .filter(|e| e.kind() == "cyclic_dependency")
        .map(ToString::to_string)
        .collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].starts_with("Circular dependencies detected: "));
    for id in ["ingestion:Alpha", "transformation:Beta", "orchestration:Gamma"] {
        assert!(cycles[0].contains(id));
    }
}

#[test]
fn test_five_component_dag_order() {
    let mut registry = ProviderRegistry::new();
    register(&mut registry, TestProvider::new(Category::Storage, "Base"));
    register(
        &mut registry,
        TestProvider::new(Category::Ingestion, "Loader").depends_on(Category::Storage, "Base"),
    );
    register(
        &mut registry,
        TestProvider::new(Category::Transformation, "Models")
            .depends_on(Category::Storage, "Base")
            .depends_on(Category::Ingestion, "Loader"),
    );
    register(
        &mut registry,
        TestProvider::new(Category::Quality, "Checks").depends_on(Category::Transformation, "Models"),
    );
    register(
        &mut registry,
        TestProvider::new(Category::Orchestration, "Runner")
            .depends_on(Category::Quality, "Checks")
            .depends_on(Category::Ingestion, "Loader"),
    );

    let stack = Stack::new()
        .with(Category::Storage, "Base")
        .with(Category::Ingestion, "Loader")
        .with(Category::Transformation, "Models")
        .with(Category::Quality, "Checks")
        .with(Category::Orchestration, "Runner");
    let outcome = generate(&registry, stack);

    let order: Vec<String> = outcome.order.iter().map(ToString::to_string).collect();
    assert_eq!(
        order,
        vec![
            "storage:Base",
            "ingestion:Loader",
            "transformation:Models",
            "quality:Checks",
            "orchestration:Runner",
        ]
    );

    let architecture = outcome.output.get("ARCHITECTURE.md").unwrap();
    assert!(architecture.contains("Base_storage --> Loader_ingestion"));
    assert!(architecture.contains("Checks_quality --> Runner_orchestration"));
}

#[test]
fn test_update_run_reports_previous_stack() {
    let registry = ProviderRegistry::with_defaults();
    let first = generate(&registry, Stack::new().with(Category::Storage, "PostgreSQL"));
    let previous = RunMetadata::from_yaml(first.output.get(METADATA_FILE).unwrap()).unwrap();

    let outcome = GenerationOrchestrator::new(&registry)
        .generate(request(Stack::new().with(Category::Storage, "DuckDB")).updating(previous.clone()))
        .unwrap();
    let updated = RunMetadata::from_yaml(outcome.output.get(METADATA_FILE).unwrap()).unwrap();

    assert_eq!(updated.antigravity.generated_at, previous.antigravity.generated_at);
    assert!(updated.antigravity.last_updated.is_some());
    assert_eq!(updated.project.stack.get(Category::Storage), Some("DuckDB"));
}
