use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::registry::RegistryError;

crate::define_closed_enum! {
    /// Fixed set of provider categories. Variant order is lexicographic so
    /// that anything iterating a `Stack` is reproducible.
    Category {
        Infrastructure => "infrastructure",
        Ingestion => "ingestion",
        Monitoring => "monitoring",
        Orchestration => "orchestration",
        Quality => "quality",
        Storage => "storage",
        Transformation => "transformation",
        Visualization => "visualization",
    }
}

impl FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_name(&s.trim().to_lowercase())
            .ok_or_else(|| RegistryError::InvalidCategory(s.to_string()))
    }
}

crate::define_id_enum! {
    /// Abstract tag a service connection can expose for discovery.
    Capability {
        Database => "database",
        SqlDatabase => "sql_database",
        NosqlDatabase => "nosql_database",
        Warehouse => "warehouse",
        MessageQueue => "message_queue",
        StreamProcessing => "stream_processing",
        ObjectStorage => "object_storage",
        Orchestrator => "orchestrator",
        Scheduler => "scheduler",
        Transformation => "transformation",
        Ingestion => "ingestion",
        Visualization => "visualization",
        Monitoring => "monitoring",
        Quality => "quality",
        Infrastructure => "infrastructure",
    }
}

/// Identifies one instantiated provider within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    pub category: Category,
    pub name: String,
}

impl ComponentId {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

impl FromStr for ComponentId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, name) = s
            .split_once(':')
            .ok_or_else(|| RegistryError::InvalidCategory(s.to_string()))?;
        Ok(Self::new(category.parse()?, name.trim()))
    }
}

impl Serialize for ComponentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A declared dependency: either a concrete component or any provider of a
/// capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencySpec {
    Component(ComponentId),
    Capability(Capability),
}

impl DependencySpec {
    pub fn component(category: Category, name: impl Into<String>) -> Self {
        Self::Component(ComponentId::new(category, name))
    }

    pub fn capability(capability: Capability) -> Self {
        Self::Capability(capability)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(id) => write!(f, "{}", id),
            Self::Capability(capability) => write!(f, "{}", capability),
        }
    }
}

/// Selected technology per category. An empty provider name means the
/// category was explicitly skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    entries: BTreeMap<Category, String>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a stack from raw `category -> provider` pairs, rejecting
    /// categories outside the fixed set.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut stack = Self::new();
        for (category, provider) in pairs {
            let category: Category = category.as_ref().parse()?;
            stack.set(category, provider);
        }
        Ok(stack)
    }

    pub fn with(mut self, category: Category, provider: impl Into<String>) -> Self {
        self.set(category, provider);
        self
    }

    pub fn set(&mut self, category: Category, provider: impl Into<String>) {
        self.entries.insert(category, provider.into().trim().to_string());
    }

    pub fn remove(&mut self, category: Category) -> Option<String> {
        self.entries.remove(&category)
    }

    /// Raw entry, including skipped (empty) selections.
    pub fn entry(&self, category: Category) -> Option<&str> {
        self.entries.get(&category).map(String::as_str)
    }

    /// Selected provider, treating an empty name as absent.
    pub fn get(&self, category: Category) -> Option<&str> {
        self.entry(category).filter(|name| !name.is_empty())
    }

    pub fn contains_category(&self, category: Category) -> bool {
        self.entries.contains_key(&category)
    }

    pub fn is_selected(&self, category: Category, provider: &str) -> bool {
        self.get(category) == Some(provider)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Every entry in category order, skipped ones included.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.entries.iter().map(|(c, p)| (*c, p.as_str()))
    }

    /// Non-skipped entries in category order.
    pub fn selected(&self) -> impl Iterator<Item = (Category, &str)> {
        self.iter().filter(|(_, p)| !p.is_empty())
    }

    /// Provider names present anywhere in the stack.
    pub fn active_providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.selected().map(|(_, p)| p).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn has_provider(&self, provider: &str) -> bool {
        self.selected().any(|(_, p)| p == provider)
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.selected()
            .map(|(category, name)| ComponentId::new(category, name))
            .collect()
    }
}

impl FromStr for Stack {
    type Err = RegistryError;

    /// Parses `category=Provider` pairs separated by commas.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut stack = Stack::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (category, provider) = pair.split_once('=').unwrap_or((pair, ""));
            stack.set(category.parse()?, provider);
        }
        Ok(stack)
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(category, provider)| format!("{}={}", category, provider))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_lexicographic() {
        let mut names: Vec<&str> = Category::all_variants().iter().map(|c| c.name()).collect();
        let sorted = {
            let mut n = names.clone();
            n.sort();
            n
        };
        assert_eq!(names, sorted);
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        assert_eq!("Storage".parse::<Category>().unwrap(), Category::Storage);
        let err = "lakehouse".parse::<Category>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCategory(ref c) if c == "lakehouse"));
    }

    #[test]
    fn test_capability_custom_roundtrip() {
        assert_eq!(Capability::from_name("warehouse"), Capability::Warehouse);
        let custom = Capability::from_name("vector_index");
        assert_eq!(custom, Capability::Custom("vector_index".to_string()));
        assert_eq!(custom.to_string(), "vector_index");
    }

    #[test]
    fn test_component_id_display_and_parse() {
        let id = ComponentId::new(Category::Storage, "PostgreSQL");
        assert_eq!(id.to_string(), "storage:PostgreSQL");
        assert_eq!("storage:PostgreSQL".parse::<ComponentId>().unwrap(), id);
        assert!("PostgreSQL".parse::<ComponentId>().is_err());
    }

    #[test]
    fn test_stack_parse_and_skipped_entries() {
        let stack: Stack = "storage=PostgreSQL, transformation=dbt, quality=".parse().unwrap();
        assert_eq!(stack.get(Category::Storage), Some("PostgreSQL"));
        assert_eq!(stack.entry(Category::Quality), Some(""));
        assert_eq!(stack.get(Category::Quality), None);
        assert!(stack.contains_category(Category::Quality));
        assert_eq!(stack.component_ids().len(), 2);
    }

    #[test]
    fn test_stack_from_pairs_invalid_category() {
        let result = Stack::from_pairs([("storage", "PostgreSQL"), ("lake", "Iceberg")]);
        assert!(matches!(result, Err(RegistryError::InvalidCategory(_))));
    }

    #[test]
    fn test_stack_serializes_as_map() {
        let stack = Stack::new()
            .with(Category::Transformation, "dbt")
            .with(Category::Storage, "PostgreSQL");
        let json = serde_json::to_string(&stack).unwrap();
        assert_eq!(json, r#"{"storage":"PostgreSQL","transformation":"dbt"}"#);
        let back: Stack = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stack);
    }
}
