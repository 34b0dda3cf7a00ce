use crate::edit::EditError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("{name} not found in {}{}", format_dirs(.searched), format_suggestion(.suggestion))]
    NotFound {
        name: String,
        searched: Vec<PathBuf>,
        suggestion: Option<String>,
    },

    #[error("no <template> section in {}", .path.display())]
    MissingTemplate { path: PathBuf },

    #[error("set a new template before adding template comments")]
    TemplateNotSet,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edit error: {0}")]
    Edit(#[from] EditError),
}

fn format_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_suggestion(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean {name}?)"),
        None => String::new(),
    }
}
