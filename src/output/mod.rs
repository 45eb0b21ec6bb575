//! Generated project artifacts
//!
//! Components write into an [`OutputContainer`]; the engine adds the
//! cross-cutting files (compose file, env files, Makefile, metadata) at the end of a
//! run.

pub mod architecture;
pub mod compose;
pub mod container;
pub mod devtools;
pub mod env_files;
pub mod metadata;

pub use compose::{
    ComposeFile, ComposeService, Healthcheck, NetworkSpec, VolumeSpec, COMPONENT_LABEL,
    COMPOSE_VERSION,
};
pub use container::OutputContainer;
pub use devtools::{DEVCONTAINER_PATH, MAKEFILE};
pub use env_files::{env_files, Environment, GITIGNORE, SWITCH_ENV_SCRIPT};
pub use metadata::{ChangedProvider, MetadataError, RunMetadata, StackDiff, METADATA_FILE};

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const ARCHITECTURE_FILE: &str = "ARCHITECTURE.md";
pub const SWITCH_ENV_PATH: &str = "scripts/switch-env.sh";
