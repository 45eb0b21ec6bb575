//! antigravity - composes data-platform providers into a runnable project
//!
//! A user picks at most one provider per category (ingestion, storage,
//! transformation, orchestration, visualization, quality, monitoring,
//! infrastructure). The engine checks the selection against compatibility
//! rules, lets every provider register the services it exposes, orders the
//! providers by their dependencies, hands each one its wiring and collects
//! the files they generate into one project with a shared docker-compose
//! network, environment files and run metadata.
//!
//! # Example Usage
//!
//! ```no_run
//! use antigravity::pipeline::{GenerationOrchestrator, GenerationRequest};
//! use antigravity::stack::{Category, ProviderRegistry, Stack};
//! use std::path::Path;
//!
//! let registry = ProviderRegistry::with_defaults();
//! let stack = Stack::new()
//!     .with(Category::Storage, "PostgreSQL")
//!     .with(Category::Transformation, "dbt")
//!     .with(Category::Orchestration, "Airflow");
//!
//! match GenerationOrchestrator::new(&registry).generate(GenerationRequest::new("acme", stack)) {
//!     Ok(outcome) => {
//!         outcome.output.write_to_dir(Path::new("./acme")).unwrap();
//!         for failed in &outcome.component_errors {
//!             eprintln!("{}", failed);
//!         }
//!     }
//!     Err(failure) => {
//!         for message in failure.messages() {
//!             eprintln!("{}", message);
//!         }
//!     }
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`stack`]: stack model, provider trait, registry and built-in providers
//! - [`validation`]: compatibility table and stack rules
//! - [`secrets`]: shared secret catalog and generation
//! - [`pipeline`]: the phase engine, dependency resolver and auto-wiring
//! - [`output`]: generated file tree, compose file, env files and metadata
//! - [`profiles`]: saved and built-in stack profiles

pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod profiles;
pub mod progress;
pub mod secrets;
pub mod stack;
pub mod util;
pub mod validation;

pub use config::{ConfigError, GeneratorConfig};
pub use output::{ComposeFile, OutputContainer, RunMetadata};
pub use pipeline::{
    ComponentError, FatalError, GenerationFailure, GenerationOrchestrator, GenerationOutcome,
    GenerationRequest,
};
pub use profiles::{ProfileError, ProfileStore, StackProfile};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use stack::{Category, ComponentId, ProjectContext, Provider, ProviderRegistry, Stack};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use validation::{validate_stack, StackError, ValidationReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");
