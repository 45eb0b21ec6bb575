//! `.antigravity.yml` run metadata and stack diffs for update runs

use crate::stack::{Category, Stack};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const METADATA_FILE: &str = ".antigravity.yml";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Not an antigravity project: {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid metadata in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub stack: Stack,
}

/// What a run generated, kept so later runs can update the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub antigravity: GeneratorInfo,
    pub project: ProjectInfo,
}

impl RunMetadata {
    pub fn new(project_name: impl Into<String>, stack: Stack) -> Self {
        Self {
            antigravity: GeneratorInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now(),
                last_updated: None,
            },
            project: ProjectInfo {
                name: project_name.into(),
                stack,
            },
        }
    }

    /// Marks an update run on top of an existing project.
    pub fn touch(&mut self) {
        self.antigravity.last_updated = Some(Utc::now());
        self.antigravity.version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Reads the metadata of a generated project.
    pub fn read_from(project_dir: &Path) -> Result<Self, MetadataError> {
        let path = project_dir.join(METADATA_FILE);
        if !path.exists() {
            return Err(MetadataError::NotFound(path));
        }
        let content = fs::read_to_string(&path).map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| MetadataError::Parse { path, source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedProvider {
    pub category: Category,
    pub from: String,
    pub to: String,
}

/// Category-level difference between two stacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackDiff {
    pub added: Vec<(Category, String)>,
    pub removed: Vec<(Category, String)>,
    pub changed: Vec<ChangedProvider>,
}

impl StackDiff {
    /// Skipped categories count as absent.
    pub fn between(old: &Stack, new: &Stack) -> Self {
        let mut diff = StackDiff::default();
        for category in Category::all_variants() {
            match (old.get(*category), new.get(*category)) {
                (None, Some(to)) => diff.added.push((*category, to.to_string())),
                (Some(from), None) => diff.removed.push((*category, from.to_string())),
                (Some(from), Some(to)) if from != to => diff.changed.push(ChangedProvider {
                    category: *category,
                    from: from.to_string(),
                    to: to.to_string(),
                }),
                _ => {}
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}
