//! Secret catalog and per-run secret derivation

mod registry;
mod source;

pub use registry::{
    connection_string, placeholder, SecretDefinition, SecretError, SecretRegistry, SecretValue,
    SECRETS,
};
pub use source::{RngSecretSource, SecretSource, PASSWORD_ALPHABET};
