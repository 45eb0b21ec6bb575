//! Static compatibility data for the built-in providers

use crate::pipeline::wiring::{storage_adapter, AdapterTool};
use crate::stack::{Category, Stack};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataModel {
    Sql,
    NoSql,
    SqlAndNoSql,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Paradigm {
    Batch,
    Streaming,
    BatchAndStreaming,
}

impl Paradigm {
    pub fn supports_streaming(self) -> bool {
        !matches!(self, Paradigm::Batch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Deployment {
    OnPremise,
    Cloud,
    Embedded,
}

/// What the table knows about one provider.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderProfile {
    pub category: Category,
    pub name: &'static str,
    pub description: &'static str,
    pub data_model: Option<DataModel>,
    pub paradigm: Option<Paradigm>,
    pub deployment: Option<Deployment>,
    /// Business-intelligence front end with its own query engine.
    pub bi: bool,
    pub works_with_all: bool,
    pub requires_service_account: bool,
    /// Explicit compatible peers per category.
    #[serde(skip)]
    pub compatible: &'static [(Category, &'static [&'static str])],
    pub incompatible: &'static [&'static str],
    /// Caveats per peer; `*` matches any peer of that category.
    #[serde(skip)]
    pub notes: &'static [(Category, &'static str, &'static str)],
    /// Storage providers this provider is recommended alongside.
    pub recommended_for: &'static [&'static str],
}

impl ProviderProfile {
    fn compatible_with(&self, category: Category) -> Option<&'static [&'static str]> {
        self.compatible
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, names)| *names)
    }

    fn note_for(&self, category: Category, peer: &str) -> Option<&'static str> {
        let exact = self
            .notes
            .iter()
            .find(|(c, p, _)| *c == category && *p == peer);
        exact
            .or_else(|| self.notes.iter().find(|(c, p, _)| *c == category && *p == "*"))
            .map(|(_, _, note)| *note)
    }
}

const BASE: ProviderProfile = ProviderProfile {
    category: Category::Storage,
    name: "",
    description: "",
    data_model: None,
    paradigm: None,
    deployment: None,
    bi: false,
    works_with_all: false,
    requires_service_account: false,
    compatible: &[],
    incompatible: &[],
    notes: &[],
    recommended_for: &[],
};

const ALL_ORCHESTRATORS: &[&str] = &["Airflow", "Prefect", "Dagster", "Mage"];
const ALL_STORAGE: &[&str] = &["PostgreSQL", "Snowflake", "BigQuery", "Redshift", "DuckDB", "MongoDB"];
const SQL_STORAGE: &[&str] = &["PostgreSQL", "Snowflake", "BigQuery", "Redshift", "DuckDB"];
const CLOUD_STORAGE: &[&str] = &["Snowflake", "BigQuery", "Redshift"];
const ALL_QUALITY: &[&str] = &["Great Expectations", "Soda"];
const ALL_VISUALIZATION: &[&str] = &["Metabase", "Superset", "Grafana"];

pub const PROFILES: &[ProviderProfile] = &[
    ProviderProfile {
        category: Category::Ingestion,
        name: "DLT",
        description: "Python-native data loading tool, works with most SQL warehouses",
        paradigm: Some(Paradigm::Batch),
        compatible: &[
            (Category::Storage, SQL_STORAGE),
            (Category::Transformation, &["dbt", "Spark"]),
            (Category::Orchestration, ALL_ORCHESTRATORS),
        ],
        notes: &[
            (Category::Storage, "PostgreSQL", "Requires dlt[postgres] package"),
            (Category::Storage, "Snowflake", "Requires dlt[snowflake] package"),
            (Category::Storage, "BigQuery", "Requires dlt[bigquery] package"),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Ingestion,
        name: "Airbyte",
        description: "Open-source ELT platform with 300+ connectors",
        paradigm: Some(Paradigm::Batch),
        compatible: &[
            (Category::Storage, &["PostgreSQL", "Snowflake", "BigQuery", "Redshift", "MongoDB"]),
            (Category::Transformation, &["dbt", "Spark"]),
            (Category::Orchestration, &["Airflow", "Prefect", "Dagster"]),
        ],
        notes: &[(Category::Storage, "*", "Airbyte supports most destinations via connectors")],
        ..BASE
    },
    ProviderProfile {
        category: Category::Ingestion,
        name: "Kafka",
        description: "Real-time streaming platform",
        paradigm: Some(Paradigm::Streaming),
        compatible: &[
            (Category::Storage, &["PostgreSQL", "Snowflake", "BigQuery", "MongoDB"]),
            (Category::Transformation, &["Spark"]),
            (Category::Orchestration, &["Airflow"]),
        ],
        incompatible: &["dbt"],
        notes: &[(Category::Storage, "*", "Requires Kafka Connect or custom consumer")],
        ..BASE
    },
    ProviderProfile {
        category: Category::Storage,
        name: "PostgreSQL",
        description: "Open-source relational database, works with everything",
        data_model: Some(DataModel::Sql),
        deployment: Some(Deployment::OnPremise),
        works_with_all: true,
        compatible: &[
            (Category::Visualization, ALL_VISUALIZATION),
            (Category::Quality, ALL_QUALITY),
            (Category::Monitoring, &["Prometheus"]),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Storage,
        name: "Snowflake",
        description: "Cloud data warehouse",
        data_model: Some(DataModel::Sql),
        deployment: Some(Deployment::Cloud),
        compatible: &[
            (Category::Visualization, ALL_VISUALIZATION),
            (Category::Quality, ALL_QUALITY),
            (Category::Monitoring, &[]),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Storage,
        name: "BigQuery",
        description: "Google Cloud data warehouse",
        data_model: Some(DataModel::Sql),
        deployment: Some(Deployment::Cloud),
        requires_service_account: true,
        compatible: &[
            (Category::Visualization, ALL_VISUALIZATION),
            (Category::Quality, ALL_QUALITY),
            (Category::Monitoring, &[]),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Storage,
        name: "Redshift",
        description: "AWS data warehouse",
        data_model: Some(DataModel::Sql),
        deployment: Some(Deployment::Cloud),
        compatible: &[
            (Category::Visualization, ALL_VISUALIZATION),
            (Category::Quality, ALL_QUALITY),
            (Category::Monitoring, &[]),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Storage,
        name: "DuckDB",
        description: "Embedded analytics database",
        data_model: Some(DataModel::Sql),
        deployment: Some(Deployment::Embedded),
        compatible: &[
            (Category::Visualization, &["Metabase", "Grafana"]),
            (Category::Quality, ALL_QUALITY),
            (Category::Monitoring, &[]),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Storage,
        name: "MongoDB",
        description: "NoSQL document database",
        data_model: Some(DataModel::NoSql),
        deployment: Some(Deployment::OnPremise),
        compatible: &[
            (Category::Visualization, &["Superset", "Grafana"]),
            (Category::Quality, &["Soda"]),
            (Category::Monitoring, &["Prometheus"]),
        ],
        incompatible: &["dbt", "Great Expectations"],
        ..BASE
    },
    ProviderProfile {
        category: Category::Transformation,
        name: "dbt",
        description: "SQL-based transformation tool for analytics",
        data_model: Some(DataModel::Sql),
        paradigm: Some(Paradigm::Batch),
        compatible: &[(Category::Storage, SQL_STORAGE)],
        incompatible: &["MongoDB", "Kafka"],
        notes: &[
            (Category::Storage, "PostgreSQL", "Requires dbt-postgres adapter"),
            (Category::Storage, "Snowflake", "Requires dbt-snowflake adapter"),
            (Category::Storage, "BigQuery", "Requires dbt-bigquery adapter"),
            (Category::Storage, "MongoDB", "dbt requires SQL database"),
        ],
        ..BASE
    },
    ProviderProfile {
        category: Category::Transformation,
        name: "Spark",
        description: "Distributed processing engine for big data",
        data_model: Some(DataModel::Distributed),
        paradigm: Some(Paradigm::BatchAndStreaming),
        compatible: &[(
            Category::Storage,
            &["PostgreSQL", "Snowflake", "BigQuery", "MongoDB", "DuckDB"],
        )],
        notes: &[(Category::Storage, "*", "Spark can read/write most data sources via connectors")],
        ..BASE
    },
    ProviderProfile {
        category: Category::Orchestration,
        name: "Airflow",
        description: "Most popular workflow orchestration platform",
        works_with_all: true,
        compatible: &[(Category::Storage, ALL_STORAGE)],
        notes: &[(Category::Storage, "PostgreSQL", "Can use as metadata DB and data warehouse")],
        ..BASE
    },
    ProviderProfile {
        category: Category::Orchestration,
        name: "Prefect",
        description: "Modern workflow orchestration with cloud option",
        works_with_all: true,
        compatible: &[(Category::Storage, ALL_STORAGE)],
        ..BASE
    },
    ProviderProfile {
        category: Category::Orchestration,
        name: "Dagster",
        description: "Asset-based data orchestrator",
        works_with_all: true,
        compatible: &[(Category::Storage, ALL_STORAGE)],
        ..BASE
    },
    ProviderProfile {
        category: Category::Orchestration,
        name: "Mage",
        description: "Data pipeline tool with integrated UI",
        works_with_all: true,
        compatible: &[(Category::Storage, SQL_STORAGE)],
        ..BASE
    },
    ProviderProfile {
        category: Category::Infrastructure,
        name: "Terraform",
        description: "Infrastructure as Code for cloud resources",
        works_with_all: true,
        recommended_for: CLOUD_STORAGE,
        ..BASE
    },
    ProviderProfile {
        category: Category::Visualization,
        name: "Metabase",
        description: "Easy-to-use BI tool",
        bi: true,
        compatible: &[(Category::Storage, ALL_STORAGE)],
        ..BASE
    },
    ProviderProfile {
        category: Category::Visualization,
        name: "Superset",
        description: "Apache open-source BI platform",
        bi: true,
        compatible: &[(
            Category::Storage,
            &["PostgreSQL", "Snowflake", "BigQuery", "Redshift", "MongoDB"],
        )],
        ..BASE
    },
    ProviderProfile {
        category: Category::Visualization,
        name: "Grafana",
        description: "Metrics and monitoring dashboards",
        ..BASE
    },
    ProviderProfile {
        category: Category::Quality,
        name: "Great Expectations",
        description: "Data validation and testing framework",
        data_model: Some(DataModel::Sql),
        compatible: &[(Category::Storage, SQL_STORAGE)],
        ..BASE
    },
    ProviderProfile {
        category: Category::Quality,
        name: "Soda",
        description: "Data quality checks as code",
        data_model: Some(DataModel::SqlAndNoSql),
        compatible: &[(Category::Storage, ALL_STORAGE)],
        ..BASE
    },
    ProviderProfile {
        category: Category::Monitoring,
        name: "Prometheus",
        description: "Metrics collection and alerting",
        works_with_all: true,
        ..BASE
    },
];

pub fn profile(category: Category, name: &str) -> Option<&'static ProviderProfile> {
    PROFILES
        .iter()
        .find(|p| p.category == category && p.name == name)
}

/// Profile for a provider name regardless of the category it was placed in.
pub fn profile_by_name(name: &str) -> Option<&'static ProviderProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

pub fn profiles_in(category: Category) -> impl Iterator<Item = &'static ProviderProfile> {
    PROFILES.iter().filter(move |p| p.category == category)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityLevel {
    FullyCompatible,
    CompatibleWithCaveat,
    Limited,
    Incompatible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairCheck {
    pub level: CompatibilityLevel,
    pub note: Option<String>,
}

impl PairCheck {
    fn new(level: CompatibilityLevel, note: Option<&str>) -> Self {
        Self {
            level,
            note: note.map(str::to_string),
        }
    }
}

/// Generic table lookup for one pair of selections.
pub fn check_pair(cat_a: Category, prov_a: &str, cat_b: Category, prov_b: &str) -> PairCheck {
    let (a, b) = match (profile(cat_a, prov_a), profile(cat_b, prov_b)) {
        (Some(a), Some(b)) => (a, b),
        _ => return PairCheck::new(CompatibilityLevel::Limited, Some("Compatibility not verified")),
    };

    let note = a.note_for(cat_b, prov_b).or_else(|| b.note_for(cat_a, prov_a));

    if a.incompatible.contains(&prov_b) || b.incompatible.contains(&prov_a) {
        return PairCheck::new(
            CompatibilityLevel::Incompatible,
            Some(note.unwrap_or("Incompatible combination")),
        );
    }

    let lists: Vec<(&[&str], &str)> = [
        a.compatible_with(cat_b).map(|list| (list, prov_b)),
        b.compatible_with(cat_a).map(|list| (list, prov_a)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !lists.is_empty() && !lists.iter().any(|(list, peer)| list.contains(peer)) {
        return PairCheck::new(CompatibilityLevel::Limited, Some("Compatibility not verified"));
    }

    match note {
        Some(note) => PairCheck::new(CompatibilityLevel::CompatibleWithCaveat, Some(note)),
        None => PairCheck::new(CompatibilityLevel::FullyCompatible, None),
    }
}

/// Table providers of `category` that the rest of `stack` does not rule out.
pub fn compatible_providers(category: Category, stack: &Stack) -> Vec<&'static str> {
    let rules = super::rules::default_pair_rules();
    profiles_in(category)
        .filter(|candidate| {
            stack
                .selected()
                .filter(|(cat, _)| *cat != category)
                .all(|(cat, prov)| {
                    let blocked_by_rule = rules
                        .iter()
                        .any(|rule| rule.check((category, candidate.name), (cat, prov)).is_some());
                    !blocked_by_rule
                        && check_pair(category, candidate.name, cat, prov).level
                            != CompatibilityLevel::Incompatible
                })
        })
        .map(|p| p.name)
        .collect()
}

/// Suggested provider for `category` given the rest of the stack.
pub fn recommend(category: Category, stack: &Stack) -> Option<&'static str> {
    let compatible = compatible_providers(category, stack);
    let first = *compatible.first()?;
    let prefer = |name: &'static str| {
        if compatible.contains(&name) {
            name
        } else {
            first
        }
    };

    let storage = stack.get(Category::Storage);
    let storage_model = storage
        .and_then(|s| profile(Category::Storage, s))
        .and_then(|p| p.data_model);
    let streaming_ingestion = stack
        .get(Category::Ingestion)
        .and_then(|i| profile(Category::Ingestion, i))
        .and_then(|p| p.paradigm)
        .is_some_and(|p| p == Paradigm::Streaming);

    let choice = match category {
        Category::Transformation if storage_model == Some(DataModel::NoSql) || streaming_ingestion => {
            prefer("Spark")
        }
        Category::Transformation if storage_model == Some(DataModel::Sql) => prefer("dbt"),
        Category::Visualization if matches!(storage, Some("Snowflake") | Some("BigQuery")) => {
            prefer("Superset")
        }
        Category::Visualization => prefer("Metabase"),
        Category::Quality if storage_model == Some(DataModel::NoSql) => prefer("Soda"),
        Category::Quality if storage_model == Some(DataModel::Sql) => prefer("Great Expectations"),
        Category::Orchestration => prefer("Airflow"),
        _ => first,
    };
    Some(choice)
}

/// Python packages `tool` needs to reach `storage`.
pub fn required_packages(tool: &str, storage: &str) -> Vec<String> {
    match tool {
        "DLT" => storage_adapter(storage, AdapterTool::Dlt)
            .map(|a| vec![format!("dlt[{}]", a)])
            .unwrap_or_else(|| vec!["dlt".to_string()]),
        "dbt" => storage_adapter(storage, AdapterTool::Dbt)
            .map(|a| vec![format!("dbt-{}", a)])
            .unwrap_or_else(|| vec!["dbt-core".to_string()]),
        "Spark" => {
            let mut packages = vec!["pyspark".to_string()];
            match storage {
                "PostgreSQL" => packages.push("psycopg2-binary".to_string()),
                "BigQuery" => packages.push("google-cloud-bigquery".to_string()),
                "MongoDB" => packages.push("pymongo".to_string()),
                _ => {}
            }
            packages
        }
        _ => Vec::new(),
    }
}

/// Every package the stack's tools need for its storage, sorted.
pub fn stack_required_packages(stack: &Stack) -> Vec<String> {
    let Some(storage) = stack.get(Category::Storage) else {
        return Vec::new();
    };
    let mut packages: Vec<String> = stack
        .selected()
        .flat_map(|(_, provider)| required_packages(provider, storage))
        .collect();
    packages.sort();
    packages.dedup();
    packages
}
