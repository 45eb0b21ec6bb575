use crate::stack::Stack;
use crate::validation::report::ValidationReport;
use crate::validation::rules::{
    CloudInfrastructureRule, EmbeddedStorageBiRule, PairCompatibilityRule, RequiredStorageRule,
    ServiceAccountRule, SingleOrchestratorRule, StorageDependencyRule, StreamingTransformationRule,
    ValidationRule,
};
use tracing::debug;

/// Runs every rule and collects all findings; never stops at the first error.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, stack: &Stack) -> ValidationReport {
        let mut report = ValidationReport::new();
        for rule in &self.rules {
            let before = (report.errors.len(), report.warnings.len());
            rule.validate(stack, &mut report);
            debug!(
                "[{}] {} error(s), {} warning(s)",
                rule.name(),
                report.errors.len() - before.0,
                report.warnings.len() - before.1
            );
        }
        report
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredStorageRule),
                Box::new(PairCompatibilityRule::default()),
                Box::new(StorageDependencyRule),
                Box::new(EmbeddedStorageBiRule),
                Box::new(CloudInfrastructureRule),
                Box::new(StreamingTransformationRule),
                Box::new(ServiceAccountRule),
                Box::new(SingleOrchestratorRule),
            ],
        }
    }
}

/// Validates `stack` with the default rule set.
pub fn validate_stack(stack: &Stack) -> ValidationReport {
    Validator::default().validate(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Category;
    use crate::validation::StackError;

    #[test]
    fn test_empty_stack_requires_storage() {
        let report = validate_stack(&Stack::new());
        assert!(!report.is_valid());
        assert_eq!(
            report.error_messages(),
            vec!["Storage is required - it's the foundation of any data stack"]
        );
        assert!(matches!(
            report.errors[0],
            StackError::MissingRequiredCategory { category: Category::Storage, .. }
        ));
    }

    #[test]
    fn test_postgres_dbt_airflow_is_valid() {
        let stack = Stack::new()
            .with(Category::Storage, "PostgreSQL")
            .with(Category::Transformation, "dbt")
            .with(Category::Orchestration, "Airflow");
        let report = validate_stack(&stack);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report
            .warnings
            .contains(&"storage:PostgreSQL + transformation:dbt: Requires dbt-postgres adapter".to_string()));
    }

    #[test]
    fn test_kafka_dbt_reports_every_problem() {
        let stack = Stack::new()
            .with(Category::Ingestion, "Kafka")
            .with(Category::Transformation, "dbt");
        let report = validate_stack(&stack);
        let errors = report.error_messages();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Storage is required - it's the foundation of any data stack");
        assert!(errors[1].contains("Kafka (streaming) is incompatible with dbt (batch)"));
    }

    #[test]
    fn test_custom_rule_list() {
        let validator = Validator::with_rules(vec![Box::new(ServiceAccountRule)]);
        let report = validator.validate(&Stack::new());
        assert!(report.is_valid());
    }

    #[test]
    fn test_validation_is_deterministic() {
        let stack = Stack::new()
            .with(Category::Storage, "MongoDB")
            .with(Category::Transformation, "dbt")
            .with(Category::Quality, "Great Expectations")
            .with(Category::Visualization, "Metabase");
        assert_eq!(validate_stack(&stack), validate_stack(&stack));
    }
}
