//! Output formatting for multiple formats
//!
//! Every command result is a serializable summary. JSON and YAML render the
//! summary as-is; the human format is a short report.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::output::StackDiff;
use crate::pipeline::{ComponentError, GenerationFailure, GenerationOutcome};
use crate::profiles::StackProfile;
use crate::stack::{Category, Stack};
use crate::validation::ValidationReport;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub project: String,
    pub output_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
    pub stack: Stack,
    pub files: Vec<String>,
    pub order: Vec<String>,
    pub warnings: Vec<String>,
    pub component_errors: Vec<ComponentError>,
}

impl GenerationSummary {
    pub fn new(project: &str, stack: &Stack, output_dir: PathBuf, outcome: &GenerationOutcome) -> Self {
        Self {
            project: project.to_string(),
            output_dir,
            archive: None,
            stack: stack.clone(),
            files: outcome.output.paths().map(str::to_string).collect(),
            order: outcome.order.iter().map(ToString::to_string).collect(),
            warnings: outcome.warnings.clone(),
            component_errors: outcome.component_errors.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<String>,
}

impl From<&GenerationFailure> for FailureSummary {
    fn from(failure: &GenerationFailure) -> Self {
        Self {
            errors: failure
                .errors
                .iter()
                .map(|e| ErrorEntry {
                    kind: e.kind(),
                    message: e.to_string(),
                })
                .collect(),
            warnings: failure.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub stack: Stack,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Recommended provider for each missing required category
    pub suggestions: BTreeMap<Category, String>,
    pub required_packages: Vec<String>,
}

impl ValidationSummary {
    pub fn new(stack: &Stack, report: &ValidationReport) -> Self {
        Self {
            valid: report.is_valid(),
            stack: stack.clone(),
            errors: report.error_messages(),
            warnings: report.warnings.clone(),
            suggestions: BTreeMap::new(),
            required_packages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffSummary {
    pub project: String,
    pub current: Stack,
    pub proposed: Stack,
    pub diff: StackDiff,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn render<T: Serialize>(&self, value: &T, what: &str, human: impl FnOnce(&T) -> String) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
            }
            OutputFormat::Human => Ok(human(value)),
        }
    }

    pub fn format_generation(&self, summary: &GenerationSummary) -> Result<String> {
        self.render(summary, "generation summary", |s| {
            let mut out = String::new();
            if s.component_errors.is_empty() {
                let _ = writeln!(out, "\u{2713} Generated {}", s.project);
            } else {
                let _ = writeln!(out, "\u{26A0} Generated {} (partial)", s.project);
            }
            let _ = writeln!(out, "{}\n", RULE);
            let _ = writeln!(out, "Directory:  {}", s.output_dir.display());
            if let Some(archive) = &s.archive {
                let _ = writeln!(out, "Archive:    {}", archive.display());
            }
            let _ = writeln!(out, "Files:      {}", s.files.len());
            let _ = writeln!(out, "\nComponents (in dependency order):");
            write_tree(&mut out, &s.order);
            write_list(&mut out, "\n\u{2717} Failed components:", &s.component_errors);
            write_list(&mut out, "\n\u{26A0} Warnings:", &s.warnings);
            out
        })
    }

    pub fn format_failure(&self, failure: &GenerationFailure) -> Result<String> {
        self.render(&FailureSummary::from(failure), "failure", |s| {
            let mut out = String::new();
            let _ = writeln!(out, "\u{2717} Generation failed");
            let _ = writeln!(out, "{}\n", RULE);
            for error in &s.errors {
                let _ = writeln!(out, "  - [{}] {}", error.kind, error.message);
            }
            write_list(&mut out, "\n\u{26A0} Warnings:", &s.warnings);
            out
        })
    }

    pub fn format_validation(&self, summary: &ValidationSummary) -> Result<String> {
        self.render(summary, "validation report", |s| {
            let mut out = String::new();
            if s.valid {
                let _ = writeln!(out, "\u{2713} Stack is valid");
            } else {
                let _ = writeln!(out, "\u{2717} Stack is invalid");
            }
            let _ = writeln!(out, "{}\n", RULE);
            let _ = writeln!(out, "Stack: {}", s.stack);
            write_list(&mut out, "\nErrors:", &s.errors);
            write_list(&mut out, "\n\u{26A0} Warnings:", &s.warnings);
            if !s.suggestions.is_empty() {
                let _ = writeln!(out, "\nSuggestions:");
                for (category, provider) in &s.suggestions {
                    let _ = writeln!(out, "  - {}={}", category, provider);
                }
            }
            write_list(&mut out, "\nRequired packages:", &s.required_packages);
            out
        })
    }

    pub fn format_providers(&self, providers: &BTreeMap<Category, Vec<String>>) -> Result<String> {
        self.render(providers, "provider list", |p| {
            let mut out = String::new();
            let _ = writeln!(out, "Available providers");
            let _ = writeln!(out, "{}\n", RULE);
            for (category, names) in p {
                let _ = writeln!(out, "{}:", category);
                write_tree(&mut out, names);
            }
            out
        })
    }

    pub fn format_profiles(&self, profiles: &[StackProfile]) -> Result<String> {
        self.render(&profiles, "profiles", |p| {
            let mut out = String::new();
            let _ = writeln!(out, "Profiles");
            let _ = writeln!(out, "{}\n", RULE);
            for profile in p.iter() {
                let _ = write!(out, "{:<20} {}", profile.name, profile.description);
                if !profile.tags.is_empty() {
                    let _ = write!(out, " [{}]", profile.tags.join(", "));
                }
                out.push('\n');
            }
            out
        })
    }

    pub fn format_profile(&self, profile: &StackProfile) -> Result<String> {
        self.render(profile, "profile", |p| {
            let mut out = String::new();
            let _ = writeln!(out, "Profile: {}", p.name);
            let _ = writeln!(out, "{}\n", RULE);
            if !p.description.is_empty() {
                let _ = writeln!(out, "{}\n", p.description);
            }
            for (category, provider) in p.stack.iter() {
                let _ = writeln!(out, "  {:<16} {}", category, provider);
            }
            if let Some(author) = &p.author {
                let _ = writeln!(out, "\nAuthor: {}", author);
            }
            if !p.tags.is_empty() {
                let _ = writeln!(out, "Tags:   {}", p.tags.join(", "));
            }
            out
        })
    }

    pub fn format_diff(&self, summary: &DiffSummary) -> Result<String> {
        self.render(summary, "stack diff", |s| {
            let mut out = String::new();
            let _ = writeln!(out, "Stack changes for {}", s.project);
            let _ = writeln!(out, "{}\n", RULE);
            if s.diff.is_empty() {
                let _ = writeln!(out, "No changes");
                return out;
            }
            for (category, provider) in &s.diff.added {
                let _ = writeln!(out, "  + {}={}", category, provider);
            }
            for (category, provider) in &s.diff.removed {
                let _ = writeln!(out, "  - {}={}", category, provider);
            }
            for change in &s.diff.changed {
                let _ = writeln!(out, "  ~ {}: {} -> {}", change.category, change.from, change.to);
            }
            out
        })
    }
}

fn write_tree(out: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        let connector = if i + 1 == items.len() { "\u{2514}" } else { "\u{251C}" };
        let _ = writeln!(out, "{}\u{2500} {}", connector, item);
    }
}

fn write_list<T: std::fmt::Display>(out: &mut String, heading: &str, items: &[T]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}", heading);
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}
