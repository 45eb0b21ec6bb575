use super::compatibility::{
    check_pair, profile, profile_by_name, profiles_in, CompatibilityLevel, DataModel, Deployment,
    Paradigm,
};
use super::report::ValidationReport;
use crate::stack::{Category, Stack};

/// A stack-level check that records errors and warnings into the report.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, stack: &Stack, report: &mut ValidationReport);
}

/// A special case for one pair of selections. When it fires, the generic
/// table lookup is skipped for that pair.
pub trait PairRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Error message when the pair conflicts. Either argument order matches.
    fn check(&self, a: (Category, &str), b: (Category, &str)) -> Option<String>;
}

pub fn default_pair_rules() -> Vec<Box<dyn PairRule>> {
    vec![
        Box::new(StreamingBatchRule),
        Box::new(NoSqlTransformationRule),
        Box::new(NoSqlQualityRule),
    ]
}

fn oriented<'a>(
    a: (Category, &'a str),
    b: (Category, &'a str),
    first: Category,
    second: Category,
) -> Option<(&'a str, &'a str)> {
    if a.0 == first && b.0 == second {
        Some((a.1, b.1))
    } else if b.0 == first && a.0 == second {
        Some((b.1, a.1))
    } else {
        None
    }
}

fn first_in(category: Category, pred: impl Fn(&super::ProviderProfile) -> bool) -> &'static str {
    profiles_in(category)
        .find(|p| pred(p))
        .map(|p| p.name)
        .unwrap_or("another tool")
}

fn streaming_engine() -> &'static str {
    first_in(Category::Transformation, |p| {
        p.paradigm.is_some_and(Paradigm::supports_streaming)
    })
}

fn nosql_quality() -> &'static str {
    first_in(Category::Quality, |p| p.data_model == Some(DataModel::SqlAndNoSql))
}

fn nosql_storage(name: &str) -> bool {
    profile(Category::Storage, name).is_some_and(|p| p.data_model == Some(DataModel::NoSql))
}

fn sql_only(category: Category, name: &str) -> bool {
    profile(category, name).is_some_and(|p| p.data_model == Some(DataModel::Sql))
}

pub struct StreamingBatchRule;

impl PairRule for StreamingBatchRule {
    fn name(&self) -> &'static str {
        "StreamingBatch"
    }

    fn check(&self, a: (Category, &str), b: (Category, &str)) -> Option<String> {
        let (ingestion, transformation) =
            oriented(a, b, Category::Ingestion, Category::Transformation)?;
        let streaming = profile(Category::Ingestion, ingestion)?.paradigm == Some(Paradigm::Streaming);
        let batch = profile(Category::Transformation, transformation)?.paradigm == Some(Paradigm::Batch);
        (streaming && batch).then(|| {
            format!(
                "{} (streaming) is incompatible with {} (batch). Use {} for streaming transformations.",
                ingestion,
                transformation,
                streaming_engine()
            )
        })
    }
}

pub struct NoSqlTransformationRule;

impl PairRule for NoSqlTransformationRule {
    fn name(&self) -> &'static str {
        "NoSqlTransformation"
    }

    fn check(&self, a: (Category, &str), b: (Category, &str)) -> Option<String> {
        let (storage, transformation) =
            oriented(a, b, Category::Storage, Category::Transformation)?;
        (nosql_storage(storage) && sql_only(Category::Transformation, transformation)).then(|| {
            format!(
                "{} (NoSQL) is incompatible with {} (SQL-only). Consider using {} for transformations or {} for quality.",
                storage,
                transformation,
                first_in(Category::Transformation, |p| p.data_model != Some(DataModel::Sql)),
                nosql_quality()
            )
        })
    }
}

pub struct NoSqlQualityRule;

impl PairRule for NoSqlQualityRule {
    fn name(&self) -> &'static str {
        "NoSqlQuality"
    }

    fn check(&self, a: (Category, &str), b: (Category, &str)) -> Option<String> {
        let (storage, quality) = oriented(a, b, Category::Storage, Category::Quality)?;
        (nosql_storage(storage) && sql_only(Category::Quality, quality)).then(|| {
            format!(
                "{} is not fully supported by {}. Use {} instead for NoSQL quality checks.",
                storage,
                quality,
                nosql_quality()
            )
        })
    }
}

pub struct RequiredStorageRule;

impl ValidationRule for RequiredStorageRule {
    fn name(&self) -> &'static str {
        "RequiredStorage"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        if stack.get(Category::Storage).is_none() {
            report.missing(
                Category::Storage,
                "Storage is required - it's the foundation of any data stack",
            );
        }
    }
}

/// Checks every pair of selections, special rules first.
pub struct PairCompatibilityRule {
    pair_rules: Vec<Box<dyn PairRule>>,
}

impl PairCompatibilityRule {
    pub fn new(pair_rules: Vec<Box<dyn PairRule>>) -> Self {
        Self { pair_rules }
    }
}

impl Default for PairCompatibilityRule {
    fn default() -> Self {
        Self::new(default_pair_rules())
    }
}

impl ValidationRule for PairCompatibilityRule {
    fn name(&self) -> &'static str {
        "PairCompatibility"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        let selected: Vec<(Category, &str)> = stack.selected().collect();
        for (i, &a) in selected.iter().enumerate() {
            for &b in &selected[i + 1..] {
                let special = self
                    .pair_rules
                    .iter()
                    .find_map(|rule| rule.check(a, b).map(|msg| (rule.name(), msg)));
                if let Some((rule, message)) = special {
                    report.incompatible(rule, message);
                    continue;
                }

                let check = check_pair(a.0, a.1, b.0, b.1);
                let note = check.note.unwrap_or_default();
                match check.level {
                    CompatibilityLevel::FullyCompatible => {}
                    CompatibilityLevel::Incompatible => report.incompatible(
                        self.name(),
                        format!(
                            "Incompatible combination: {}:{} + {}:{}. {}",
                            a.0, a.1, b.0, b.1, note
                        ),
                    ),
                    CompatibilityLevel::CompatibleWithCaveat | CompatibilityLevel::Limited => {
                        report.warn(format!("{}:{} + {}:{}: {}", a.0, a.1, b.0, b.1, note))
                    }
                }
            }
        }
    }
}

/// Visualization and quality tools need something to read from.
pub struct StorageDependencyRule;

impl ValidationRule for StorageDependencyRule {
    fn name(&self) -> &'static str {
        "StorageDependency"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        if stack.get(Category::Storage).is_some() {
            return;
        }
        for category in [Category::Quality, Category::Visualization] {
            if let Some(provider) = stack.get(category) {
                report.missing(
                    Category::Storage,
                    format!("{} ({}) requires a storage layer", provider, category),
                );
            }
        }
    }
}

pub struct EmbeddedStorageBiRule;

impl ValidationRule for EmbeddedStorageBiRule {
    fn name(&self) -> &'static str {
        "EmbeddedStorageBi"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        let Some(storage) = stack.get(Category::Storage) else {
            return;
        };
        let embedded = profile(Category::Storage, storage)
            .is_some_and(|p| p.deployment == Some(Deployment::Embedded));
        let bi = stack
            .get(Category::Visualization)
            .and_then(|v| profile(Category::Visualization, v))
            .is_some_and(|p| p.bi);
        if embedded && bi {
            report.warn(format!(
                "{} is embedded/local. May not scale for production BI. Consider PostgreSQL, Snowflake, or BigQuery for production.",
                storage
            ));
        }
    }
}

pub struct CloudInfrastructureRule;

impl ValidationRule for CloudInfrastructureRule {
    fn name(&self) -> &'static str {
        "CloudInfrastructure"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        if stack.get(Category::Infrastructure).is_some() {
            return;
        }
        let Some(storage) = stack.get(Category::Storage) else {
            return;
        };
        if profile(Category::Storage, storage).is_some_and(|p| p.deployment == Some(Deployment::Cloud)) {
            let tool = first_in(Category::Infrastructure, |p| p.recommended_for.contains(&storage));
            report.warn(format!(
                "{} is cloud-based. Consider adding {} to provision infrastructure automatically.",
                storage, tool
            ));
        }
    }
}

pub struct StreamingTransformationRule;

impl ValidationRule for StreamingTransformationRule {
    fn name(&self) -> &'static str {
        "StreamingTransformation"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        let Some(ingestion) = stack.get(Category::Ingestion) else {
            return;
        };
        let streaming = profile(Category::Ingestion, ingestion)
            .is_some_and(|p| p.paradigm == Some(Paradigm::Streaming));
        let handled = stack
            .get(Category::Transformation)
            .and_then(|t| profile(Category::Transformation, t))
            .and_then(|p| p.paradigm)
            .is_some_and(Paradigm::supports_streaming);
        if streaming && !handled {
            report.warn(format!(
                "{} is streaming-focused. Consider adding {} for real-time transformations.",
                ingestion,
                streaming_engine()
            ));
        }
    }
}

pub struct ServiceAccountRule;

impl ValidationRule for ServiceAccountRule {
    fn name(&self) -> &'static str {
        "ServiceAccount"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        if let Some(storage) = stack.get(Category::Storage) {
            if profile(Category::Storage, storage).is_some_and(|p| p.requires_service_account) {
                report.warn(format!(
                    "{} requires a service account JSON key. You'll need to provide this manually.",
                    storage
                ));
            }
        }
    }
}

pub struct SingleOrchestratorRule;

impl ValidationRule for SingleOrchestratorRule {
    fn name(&self) -> &'static str {
        "SingleOrchestrator"
    }

    fn validate(&self, stack: &Stack, report: &mut ValidationReport) {
        let mut orchestrators: Vec<&str> = stack
            .selected()
            .map(|(_, provider)| provider)
            .filter(|provider| {
                profile_by_name(provider).is_some_and(|p| p.category == Category::Orchestration)
            })
            .collect();
        orchestrators.dedup();
        if orchestrators.len() > 1 {
            report.warn("Multiple orchestrators selected. Typically you only need one orchestration tool.");
        }
    }
}
