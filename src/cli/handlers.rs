//! Command handlers. Each returns the process exit code.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::commands::{
    DiffArgs, GenerateArgs, ProfileAction, ProfilesArgs, ProvidersArgs, StackSelection,
    ValidateArgs,
};
use super::output::{
    DiffSummary, GenerationSummary, OutputFormat, OutputFormatter, ValidationSummary,
};
use crate::config::{validate_project_name, GeneratorConfig};
use crate::output::{MetadataError, RunMetadata, StackDiff};
use crate::pipeline::{GenerationOrchestrator, GenerationRequest};
use crate::profiles::{ProfileStore, StackProfile};
use crate::progress::LoggingHandler;
use crate::stack::{Category, ProviderRegistry, Stack};
use crate::validation::{recommend, stack_required_packages, validate_stack, StackError};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_PARTIAL: i32 = 2;

fn report_error(e: anyhow::Error) -> i32 {
    error!("{:#}", e);
    eprintln!("Error: {:#}", e);
    EXIT_FAILED
}

fn print(formatter: &OutputFormatter, rendered: Result<String>) -> Result<()> {
    let text = rendered?;
    if formatter.format() == OutputFormat::Human {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
    Ok(())
}

/// Profile first, then explicit pairs on top.
pub fn resolve_stack(selection: &StackSelection, store: &ProfileStore) -> Result<Stack> {
    let mut stack = match &selection.profile {
        Some(name) => {
            let profile = store
                .load(name)
                .with_context(|| format!("Failed to load profile '{}'", name))?;
            debug!(profile = %name, stack = %profile.stack, "Loaded profile");
            profile.stack
        }
        None => Stack::new(),
    };

    for spec in &selection.stack {
        let overrides: Stack = spec
            .parse()
            .with_context(|| format!("Invalid stack selection '{}'", spec))?;
        for (category, provider) in overrides.iter() {
            stack.set(category, provider);
        }
    }
    Ok(stack)
}

fn require_selection(selection: &StackSelection) -> Result<()> {
    if selection.is_empty() {
        bail!("No stack given. Use --stack category=Provider or --profile NAME");
    }
    Ok(())
}

fn read_previous(dir: &Path) -> Option<RunMetadata> {
    match RunMetadata::read_from(dir) {
        Ok(metadata) => {
            info!(dir = %dir.display(), "Updating existing project");
            Some(metadata)
        }
        Err(MetadataError::NotFound(_)) => None,
        Err(e) => {
            warn!("Ignoring existing metadata: {}", e);
            None
        }
    }
}

pub fn handle_generate(args: &GenerateArgs, config: &GeneratorConfig) -> i32 {
    match run_generate(args, config) {
        Ok(code) => code,
        Err(e) => report_error(e),
    }
}

fn run_generate(args: &GenerateArgs, config: &GeneratorConfig) -> Result<i32> {
    validate_project_name(&args.name)?;
    require_selection(&args.selection)?;
    let store = ProfileStore::new(&config.profiles_dir);
    let stack = resolve_stack(&args.selection, &store)?;
    let formatter = OutputFormatter::new(args.format.into());

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.project_dir(&args.name));

    let mut request = GenerationRequest::new(&args.name, stack.clone());
    if let Some(previous) = read_previous(&output_dir) {
        request = request.updating(previous);
    }

    let registry = ProviderRegistry::with_defaults();
    let orchestrator = GenerationOrchestrator::new(&registry)
        .with_network(&config.network)
        .with_progress(Arc::new(LoggingHandler));

    let outcome = match orchestrator.generate(request) {
        Ok(outcome) => outcome,
        Err(failure) => {
            print(&formatter, formatter.format_failure(&failure))?;
            return Ok(EXIT_FAILED);
        }
    };

    outcome
        .output
        .write_to_dir(&output_dir)
        .with_context(|| format!("Failed to write project to {}", output_dir.display()))?;

    let archive = match (&args.archive, config.archive) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_archive_path(&output_dir, &args.name)),
        (None, false) => None,
    };
    if let Some(path) = &archive {
        outcome.output.write_archive(&args.name, path)?;
    }

    let mut summary = GenerationSummary::new(&args.name, &stack, output_dir, &outcome);
    summary.archive = archive;
    print(&formatter, formatter.format_generation(&summary))?;

    Ok(if outcome.is_partial() {
        EXIT_PARTIAL
    } else {
        EXIT_OK
    })
}

fn default_archive_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join(format!("{}.tar.gz", name))
}

pub fn handle_validate(args: &ValidateArgs, config: &GeneratorConfig) -> i32 {
    match run_validate(args, config) {
        Ok(code) => code,
        Err(e) => report_error(e),
    }
}

fn run_validate(args: &ValidateArgs, config: &GeneratorConfig) -> Result<i32> {
    require_selection(&args.selection)?;
    let store = ProfileStore::new(&config.profiles_dir);
    let stack = resolve_stack(&args.selection, &store)?;

    let report = validate_stack(&stack);
    let mut summary = ValidationSummary::new(&stack, &report);
    for error in &report.errors {
        if let StackError::MissingRequiredCategory { category, .. } = error {
            if let Some(provider) = recommend(*category, &stack) {
                summary.suggestions.insert(*category, provider.to_string());
            }
        }
    }
    summary.required_packages = stack_required_packages(&stack);

    let formatter = OutputFormatter::new(args.format.into());
    print(&formatter, formatter.format_validation(&summary))?;

    Ok(if report.is_valid() { EXIT_OK } else { EXIT_FAILED })
}

pub fn handle_providers(args: &ProvidersArgs) -> i32 {
    match run_providers(args) {
        Ok(code) => code,
        Err(e) => report_error(e),
    }
}

fn run_providers(args: &ProvidersArgs) -> Result<i32> {
    let registry = ProviderRegistry::with_defaults();
    let mut providers = registry.list();
    if let Some(name) = &args.category {
        let category: Category = name.parse()?;
        providers.retain(|c, _| *c == category);
    }

    let formatter = OutputFormatter::new(args.format.into());
    print(&formatter, formatter.format_providers(&providers))?;
    Ok(EXIT_OK)
}

pub fn handle_profiles(args: &ProfilesArgs, config: &GeneratorConfig) -> i32 {
    match run_profiles(args, config) {
        Ok(code) => code,
        Err(e) => report_error(e),
    }
}

fn run_profiles(args: &ProfilesArgs, config: &GeneratorConfig) -> Result<i32> {
    let store = ProfileStore::new(&config.profiles_dir);
    let formatter = OutputFormatter::new(args.format.into());

    match &args.action {
        None => {
            let profiles = store.list_detailed()?;
            print(&formatter, formatter.format_profiles(&profiles))?;
        }
        Some(ProfileAction::List { query, tags }) => {
            let profiles = store.search(query.as_deref().unwrap_or(""), tags)?;
            print(&formatter, formatter.format_profiles(&profiles))?;
        }
        Some(ProfileAction::Show { name }) => {
            let profile = store.load(name)?;
            print(&formatter, formatter.format_profile(&profile))?;
        }
        Some(ProfileAction::Save {
            name,
            selection,
            description,
            tags,
            overwrite,
        }) => {
            require_selection(selection)?;
            let stack = resolve_stack(selection, &store)?;
            let profile = StackProfile::new(name, stack)
                .with_description(description.clone().unwrap_or_default())
                .with_tags(tags.iter().cloned());
            let saved = store.save(profile, *overwrite)?;
            info!(profile = %saved.name, "Profile saved");
            print(&formatter, formatter.format_profile(&saved))?;
        }
        Some(ProfileAction::Delete { name }) => {
            if !store.delete(name)? {
                bail!("Profile '{}' not found", name);
            }
            info!(profile = %name, "Profile deleted");
        }
    }
    Ok(EXIT_OK)
}

pub fn handle_diff(args: &DiffArgs, config: &GeneratorConfig) -> i32 {
    match run_diff(args, config) {
        Ok(code) => code,
        Err(e) => report_error(e),
    }
}

fn run_diff(args: &DiffArgs, config: &GeneratorConfig) -> Result<i32> {
    require_selection(&args.selection)?;
    let metadata = RunMetadata::read_from(&args.project_dir)?;
    let store = ProfileStore::new(&config.profiles_dir);
    let proposed = resolve_stack(&args.selection, &store)?;

    let summary = DiffSummary {
        project: metadata.project.name.clone(),
        diff: StackDiff::between(&metadata.project.stack, &proposed),
        current: metadata.project.stack,
        proposed,
    };

    let formatter = OutputFormatter::new(args.format.into());
    print(&formatter, formatter.format_diff(&summary))?;
    Ok(EXIT_OK)
}
