//! Recipe loading.
//!
//! Recipes are read in two passes: the TOML document first, then each
//! `[[mods]]` and `[[combines]]` table on its own, so a malformed step is
//! reported against the entry that carries it rather than the whole file.

use crate::config::errors::ConfigError;
use crate::config::schema::{CombineDefinition, Metadata, ModDefinition, RecipeConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Recipe with its entry tables still undecoded.
#[derive(Deserialize)]
struct RawRecipe {
    #[serde(default)]
    meta: Metadata,
    #[serde(default)]
    mods: Vec<Value>,
    #[serde(default)]
    combines: Vec<Value>,
}

/// Parse and validate a recipe. Every validation issue is reported at once.
pub fn load_from_str(input: &str) -> Result<RecipeConfig, ConfigError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RecipeConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Some(path))
}

fn parse(input: &str, path: Option<&Path>) -> Result<RecipeConfig, ConfigError> {
    let raw: RawRecipe = toml_edit::de::from_str(input).map_err(|source| ConfigError::Syntax {
        path: path.map(Path::to_path_buf),
        source,
    })?;

    let config = RecipeConfig {
        meta: raw.meta,
        mods: decode_entries::<ModDefinition>("mods", raw.mods, path)?,
        combines: decode_entries::<CombineDefinition>("combines", raw.combines, path)?,
    };
    config.validate().map_err(|source| ConfigError::Invalid {
        path: path.map(Path::to_path_buf),
        source,
    })?;
    tracing::debug!(
        mods = config.mods.len(),
        combines = config.combines.len(),
        "loaded recipe"
    );
    Ok(config)
}

fn decode_entries<T: DeserializeOwned>(
    section: &'static str,
    entries: Vec<Value>,
    path: Option<&Path>,
) -> Result<Vec<T>, ConfigError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = entry.get("id").and_then(Value::as_str).map(str::to_string);
            serde_json::from_value(entry).map_err(|source| ConfigError::Entry {
                path: path.map(Path::to_path_buf),
                section,
                index,
                id,
                source,
            })
        })
        .collect()
}
