pub mod applicator;
pub mod errors;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_mods, check_mods, resolver_for, ApplicationError, ModResult, PlannedWrite,
};
pub use errors::ConfigError;
pub use loader::{load_from_path, load_from_str};
pub use schema::{
    CombineDefinition, Metadata, ModDefinition, RecipeConfig, Step, ValidationError,
    ValidationIssue,
};
