use crate::config::schema::ValidationError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read recipe {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid TOML: {source}", origin(.path))]
    Syntax {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    /// One `[[mods]]` or `[[combines]]` table failed to deserialize.
    #[error(
        "{}: {section} entry {}: {source}",
        origin(.path),
        entry_label(.index, .id)
    )]
    Entry {
        path: Option<PathBuf>,
        section: &'static str,
        /// Zero-based position within its section
        index: usize,
        id: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: invalid recipe:\n{source}", origin(.path))]
    Invalid {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// Recipe file the error came from, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } => Some(path),
            ConfigError::Syntax { path, .. }
            | ConfigError::Entry { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_deref(),
        }
    }
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "recipe".to_string(),
    }
}

fn entry_label(index: &usize, id: &Option<String>) -> String {
    match id {
        Some(id) => format!("#{} ('{id}')", index + 1),
        None => format!("#{}", index + 1),
    }
}
