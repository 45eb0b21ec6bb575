//! Stack model and provider plugins.
//!
//! A [`Stack`] maps each [`Category`] to the name of the selected provider.
//! Providers are looked up in a [`ProviderRegistry`] by `(category, name)`
//! and instantiated fresh for every run.
//!
//! # Example
//!
//! ```
//! use antigravity::stack::{Category, ProviderRegistry, Stack};
//!
//! let registry = ProviderRegistry::with_defaults();
//! let stack = Stack::new()
//!     .with(Category::Storage, "PostgreSQL")
//!     .with(Category::Transformation, "dbt");
//!
//! for (category, name) in stack.selected() {
//!     assert!(registry.contains(category, name));
//! }
//! ```

#[macro_use]
pub mod id_enum_macro;

pub mod context;
pub mod ids;
pub mod provider;
pub mod providers;
pub mod registry;

pub use context::{ContextError, DataSource, ProjectContext, ServiceConnection};
pub use ids::{Capability, Category, ComponentId, DependencySpec, Stack};
pub use provider::{GenerationContext, NoOpProvider, Provider, ServiceScope};
pub use registry::{ProviderFactory, ProviderRegistry, RegistryError};
