use super::ids::Category;
use super::provider::Provider;
use super::providers;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid category '{0}'. Valid categories: infrastructure, ingestion, monitoring, orchestration, quality, storage, transformation, visualization")]
    InvalidCategory(String),

    #[error("Provider '{name}' not found for category '{category}'")]
    ProviderNotFound { category: Category, name: String },
}

pub type ProviderFactory = Arc<dyn Fn() -> Box<dyn Provider> + Send + Sync>;

/// Table of `(category, name) -> factory`.
///
/// Built once at startup and passed into every run; registering the same
/// key twice keeps the later factory.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<Category, BTreeMap<String, ProviderFactory>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        providers::register_builtin(&mut registry);
        registry
    }

    /// Registers a factory under a category given by name.
    pub fn register<F>(&mut self, category: &str, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        let category: Category = category.parse()?;
        self.insert(category, name, factory);
        Ok(())
    }

    pub fn insert<F>(&mut self, category: Category, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        self.factories
            .entry(category)
            .or_default()
            .insert(name.to_string(), Arc::new(factory));
    }

    pub fn factory(&self, category: Category, name: &str) -> Result<ProviderFactory, RegistryError> {
        self.factories
            .get(&category)
            .and_then(|providers| providers.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::ProviderNotFound {
                category,
                name: name.to_string(),
            })
    }

    /// Fresh provider instance.
    pub fn get(&self, category: Category, name: &str) -> Result<Box<dyn Provider>, RegistryError> {
        self.factory(category, name).map(|factory| factory())
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.factories
            .get(&category)
            .is_some_and(|providers| providers.contains_key(name))
    }

    /// Sorted provider names for every category, empty ones included.
    pub fn list(&self) -> BTreeMap<Category, Vec<String>> {
        Category::all_variants()
            .iter()
            .map(|category| {
                let names = self
                    .factories
                    .get(category)
                    .map(|providers| providers.keys().cloned().collect())
                    .unwrap_or_default();
                (*category, names)
            })
            .collect()
    }

    pub fn names(&self, category: Category) -> Vec<String> {
        self.factories
            .get(&category)
            .map(|providers| providers.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::NoOpProvider;

    struct Marker(&'static str);

    impl Provider for Marker {
        fn name(&self) -> &str {
            self.0
        }

        fn category(&self) -> Category {
            Category::Storage
        }

        fn compose_volumes(&self) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    #[test]
    fn test_register_invalid_category() {
        let mut registry = ProviderRegistry::new();
        let err = registry
            .register("lakehouse", "Iceberg", || {
                Box::new(NoOpProvider::new(Category::Storage, "Iceberg"))
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidCategory("lakehouse".to_string()));
    }

    #[test]
    fn test_reregistration_overrides() {
        let mut registry = ProviderRegistry::new();
        registry
            .register("storage", "Custom", || Box::new(Marker("first")))
            .unwrap();
        registry
            .register("storage", "Custom", || Box::new(Marker("second")))
            .unwrap();

        let provider = registry.get(Category::Storage, "Custom").unwrap();
        assert_eq!(provider.compose_volumes(), vec!["second"]);
        assert_eq!(registry.names(Category::Storage), vec!["Custom"]);
    }

    #[test]
    fn test_get_missing_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.get(Category::Storage, "Oracle").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Provider 'Oracle' not found for category 'storage'"
        );
    }

    #[test]
    fn test_list_includes_empty_categories() {
        let mut registry = ProviderRegistry::new();
        registry.insert(Category::Storage, "b", || Box::new(Marker("b")));
        registry.insert(Category::Storage, "a", || Box::new(Marker("a")));

        let listing = registry.list();
        assert_eq!(listing.len(), 8);
        assert_eq!(listing[&Category::Storage], vec!["a", "b"]);
        assert!(listing[&Category::Monitoring].is_empty());
    }

    #[test]
    fn test_defaults_cover_every_category() {
        let registry = ProviderRegistry::with_defaults();
        for (category, names) in registry.list() {
            assert!(!names.is_empty(), "no providers for {}", category);
        }
        assert!(registry.contains(Category::Storage, "PostgreSQL"));
        assert!(registry.contains(Category::Quality, "Great Expectations"));
    }

    #[test]
    fn test_instances_are_fresh() {
        let registry = ProviderRegistry::with_defaults();
        let a = registry.get(Category::Storage, "PostgreSQL").unwrap();
        let b = registry.get(Category::Storage, "PostgreSQL").unwrap();
        assert_eq!(a.id(), b.id());
    }
}
