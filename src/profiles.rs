//! Saved stack configurations
//!
//! Built-in presets cover common platform shapes. User profiles live as one
//! JSON file per profile in a directory (`~/.antigravity/profiles` unless
//! configured otherwise). Presets shadow user profiles of the same name and
//! can be neither overwritten nor deleted.

use crate::stack::{Category, Stack};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile '{0}' not found")]
    NotFound(String),

    #[error("Profile '{0}' already exists")]
    AlreadyExists(String),

    #[error("'{0}' is a built-in preset and cannot be modified")]
    Preset(String),

    #[error("Invalid profile name '{0}': use letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("Failed to access profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub stack: Stack,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StackProfile {
    pub fn new(name: impl Into<String>, stack: Stack) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            stack,
            created_at: Utc::now(),
            updated_at: None,
            author: None,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    fn matches(&self, query: &str, tags: &[String]) -> bool {
        let query = query.to_lowercase();
        let query_match = query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query);
        let tags_match = tags.is_empty() || tags.iter().any(|t| self.tags.contains(t));
        query_match && tags_match
    }
}

const PRESET_NAMES: &[&str] = &[
    "modern_data_stack",
    "analytics_starter",
    "streaming_platform",
    "ml_platform",
    "data_lakehouse",
];

fn preset_profile(
    name: &str,
    description: &str,
    entries: &[(Category, &str)],
    tags: &[&str],
) -> StackProfile {
    let stack = entries
        .iter()
        .fold(Stack::new(), |stack, (category, provider)| stack.with(*category, *provider));
    StackProfile::new(name, stack)
        .with_description(description)
        .with_author("AntiGravity")
        .with_tags(tags.iter().copied())
}

/// Built-in preset by name.
pub fn preset(name: &str) -> Option<StackProfile> {
    use Category::*;

    let profile = match name {
        "modern_data_stack" => preset_profile(
            name,
            "Modern Data Stack with cloud-native tools",
            &[
                (Ingestion, "Airbyte"),
                (Storage, "Snowflake"),
                (Transformation, "dbt"),
                (Orchestration, "Prefect"),
                (Visualization, "Superset"),
                (Quality, "Great Expectations"),
            ],
            &["cloud", "enterprise", "modern"],
        ),
        "analytics_starter" => preset_profile(
            name,
            "Simple analytics stack for beginners",
            &[
                (Ingestion, "DLT"),
                (Storage, "PostgreSQL"),
                (Transformation, "dbt"),
                (Orchestration, "Airflow"),
            ],
            &["beginner", "local", "analytics"],
        ),
        "streaming_platform" => preset_profile(
            name,
            "Real-time streaming data platform",
            &[
                (Ingestion, "Kafka"),
                (Storage, "MongoDB"),
                (Transformation, "Spark"),
                (Orchestration, "Dagster"),
                (Monitoring, "Prometheus"),
                (Visualization, "Grafana"),
            ],
            &["streaming", "real-time", "advanced"],
        ),
        "ml_platform" => preset_profile(
            name,
            "MLOps platform with experiment tracking",
            &[
                (Ingestion, "DLT"),
                (Storage, "PostgreSQL"),
                (Transformation, "Spark"),
                (Orchestration, "Airflow"),
                (Monitoring, "Prometheus"),
            ],
            &["ml", "mlops", "advanced"],
        ),
        "data_lakehouse" => preset_profile(
            name,
            "Data lakehouse architecture with DuckDB",
            &[
                (Ingestion, "Airbyte"),
                (Storage, "DuckDB"),
                (Transformation, "dbt"),
                (Orchestration, "Dagster"),
                (Visualization, "Metabase"),
            ],
            &["lakehouse", "duckdb", "modern"],
        ),
        _ => return None,
    };
    Some(profile)
}

pub fn presets() -> Vec<StackProfile> {
    PRESET_NAMES.iter().filter_map(|name| preset(name)).collect()
}

pub fn is_preset(name: &str) -> bool {
    PRESET_NAMES.contains(&name)
}

fn validate_name(name: &str) -> Result<(), ProfileError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidName(name.to_string()))
    }
}

/// Profiles stored as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Writes `profile`. Updating an existing profile keeps its creation
    /// time and fills unset fields from the stored copy.
    pub fn save(&self, profile: StackProfile, overwrite: bool) -> Result<StackProfile, ProfileError> {
        validate_name(&profile.name)?;
        if is_preset(&profile.name) {
            return Err(ProfileError::Preset(profile.name));
        }

        let path = self.path_for(&profile.name);
        let profile = if path.exists() {
            if !overwrite {
                return Err(ProfileError::AlreadyExists(profile.name));
            }
            let existing = self.read(&path)?;
            StackProfile {
                description: if profile.description.is_empty() {
                    existing.description
                } else {
                    profile.description
                },
                created_at: existing.created_at,
                updated_at: Some(Utc::now()),
                author: profile.author.or(existing.author),
                tags: if profile.tags.is_empty() {
                    existing.tags
                } else {
                    profile.tags
                },
                ..profile
            }
        } else {
            profile
        };

        fs::create_dir_all(&self.dir).map_err(|source| ProfileError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let json = serde_json::to_string_pretty(&profile).map_err(|source| ProfileError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(profile = %profile.name, path = %path.display(), "Saved profile");
        Ok(profile)
    }

    fn read(&self, path: &Path) -> Result<StackProfile, ProfileError> {
        let content = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Presets are checked before the directory.
    pub fn load(&self, name: &str) -> Result<StackProfile, ProfileError> {
        if let Some(profile) = preset(name) {
            return Ok(profile);
        }
        validate_name(name)?;

        let path = self.path_for(name);
        if !path.exists() {
            return Err(ProfileError::NotFound(name.to_string()));
        }
        self.read(&path)
    }

    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, name: &str) -> Result<bool, ProfileError> {
        if is_preset(name) {
            return Err(ProfileError::Preset(name.to_string()));
        }
        validate_name(name)?;

        let path = self.path_for(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| ProfileError::Io { path, source })?;
        Ok(true)
    }

    /// Sorted, de-duplicated names of presets and saved profiles.
    pub fn list(&self) -> Result<Vec<String>, ProfileError> {
        let mut names: Vec<String> = PRESET_NAMES.iter().map(|n| n.to_string()).collect();

        if self.dir.exists() {
            let entries = fs::read_dir(&self.dir).map_err(|source| ProfileError::Io {
                path: self.dir.clone(),
                source,
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn list_detailed(&self) -> Result<Vec<StackProfile>, ProfileError> {
        self.list()?.iter().map(|name| self.load(name)).collect()
    }

    /// Case-insensitive match on name or description, and on any of `tags`.
    /// An empty query or tag list matches everything.
    pub fn search(&self, query: &str, tags: &[String]) -> Result<Vec<StackProfile>, ProfileError> {
        Ok(self
            .list_detailed()?
            .into_iter()
            .filter(|profile| profile.matches(query, tags))
            .collect())
    }
}
