pub mod compatibility;
pub mod report;
pub mod rules;
pub mod validator;

pub use compatibility::{
    check_pair, compatible_providers, profile, recommend, required_packages,
    stack_required_packages, CompatibilityLevel, PairCheck, ProviderProfile, PROFILES,
};
pub use report::{StackError, ValidationReport};
pub use rules::{PairRule, ValidationRule};
pub use validator::{validate_stack, Validator};
