use crate::stack::Category;
use serde::Serialize;
use thiserror::Error;

/// A problem that stops generation before any provider runs.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StackError {
    #[error("{message}")]
    MissingRequiredCategory { category: Category, message: String },

    #[error("{message}")]
    IncompatibleStack { rule: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<StackError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, error: StackError) {
        self.errors.push(error);
    }

    pub fn missing(&mut self, category: Category, message: impl Into<String>) {
        self.errors.push(StackError::MissingRequiredCategory {
            category,
            message: message.into(),
        });
    }

    pub fn incompatible(&mut self, rule: &str, message: impl Into<String>) {
        self.errors.push(StackError::IncompatibleStack {
            rule: rule.to_string(),
            message: message.into(),
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Warnings when valid, every error otherwise.
    pub fn into_result(self) -> Result<Vec<String>, Vec<StackError>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_validity() {
        let mut report = ValidationReport::new();
        report.warn("heads up");
        assert!(report.is_valid());

        report.missing(Category::Storage, "Storage is required");
        report.incompatible("StreamingBatch", "no");
        assert!(!report.is_valid());
        assert_eq!(report.error_messages(), vec!["Storage is required", "no"]);
        assert_eq!(report.into_result().unwrap_err().len(), 2);
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = StackError::MissingRequiredCategory {
            category: Category::Storage,
            message: "m".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "missing_required_category");
        assert_eq!(json["category"], "storage");
    }
}
