//! Loading component files from layered directories and placing their
//! rewritten templates in an output directory.

pub mod errors;
pub mod file;
pub mod resolver;

pub use errors::ComponentError;
pub use file::ComponentFile;
pub use resolver::{pascal_case, ComponentResolver, DEFAULT_EXTENSION};
