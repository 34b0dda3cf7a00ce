use crate::combine::DEFAULT_TAGS;
use crate::component::DEFAULT_EXTENSION;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct RecipeConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub mods: Vec<ModDefinition>,
    #[serde(default)]
    pub combines: Vec<CombineDefinition>,
}

impl RecipeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.mods.is_empty() && self.combines.is_empty() {
            issues.push(ValidationIssue::EmptyRecipe);
        }

        if !self.mods.is_empty() && self.meta.directories.is_empty() {
            issues.push(ValidationIssue::MissingField {
                entry_id: None,
                field: "meta.directories",
            });
        } else if !self.meta.directories.is_empty() {
            validate_directories(&self.meta.directories, &mut issues);
        }

        for entry in &self.mods {
            let id = entry_id(&entry.id);
            if entry.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: None,
                    field: "id",
                });
            }

            match (&entry.component, &entry.file) {
                (Some(_), Some(_)) => issues.push(ValidationIssue::InvalidCombo {
                    entry_id: id.clone(),
                    message: "component and file are mutually exclusive".to_string(),
                }),
                (None, None) => issues.push(ValidationIssue::MissingField {
                    entry_id: id.clone(),
                    field: "component",
                }),
                (Some(name), None) | (None, Some(name)) if name.trim().is_empty() => {
                    issues.push(ValidationIssue::MissingField {
                        entry_id: id.clone(),
                        field: if entry.component.is_some() {
                            "component"
                        } else {
                            "file"
                        },
                    });
                }
                _ => {}
            }

            if entry.steps.is_empty() {
                issues.push(ValidationIssue::InvalidCombo {
                    entry_id: id.clone(),
                    message: "mod has no steps".to_string(),
                });
            }

            for step in &entry.steps {
                step.validate(&id, &mut issues);
            }
        }

        for entry in &self.combines {
            let id = entry_id(&entry.id);
            if entry.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: None,
                    field: "id",
                });
            }
            if entry.source.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: id.clone(),
                    field: "source",
                });
            }
            if entry.overlay.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: id.clone(),
                    field: "override",
                });
            }
            if entry.tags.iter().any(|t| t.trim().is_empty()) {
                issues.push(ValidationIssue::MissingField {
                    entry_id: id.clone(),
                    field: "tags",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// The first directory is regenerated on every run, so it must be a plain
/// relative path that neither contains nor sits inside a source directory.
fn validate_directories(directories: &[String], issues: &mut Vec<ValidationIssue>) {
    let invalid = |message: String| ValidationIssue::InvalidCombo {
        entry_id: None,
        message,
    };

    let output = Path::new(&directories[0]);
    let plain = output.components().next().is_some()
        && output
            .components()
            .all(|part| matches!(part, Component::Normal(_)));
    if !plain {
        issues.push(invalid(format!(
            "output directory '{}' must be a relative path below the recipe root",
            directories[0]
        )));
    }

    if directories.len() < 2 {
        issues.push(invalid(
            "meta.directories needs the output directory followed by at least one source directory"
                .to_string(),
        ));
    }

    for source in &directories[1..] {
        let source_path: PathBuf = Path::new(source)
            .components()
            .filter(|part| !matches!(part, Component::CurDir))
            .collect();
        if source_path.starts_with(output) || output.starts_with(&source_path) {
            issues.push(invalid(format!(
                "output directory '{}' overlaps source directory '{source}'",
                directories[0]
            )));
        }
    }
}

fn entry_id(id: &str) -> Option<String> {
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Search order for components. The first entry is the output directory:
    /// it is rebuilt from the remaining ones on every run.
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            directories: Vec::new(),
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModDefinition {
    pub id: String,
    /// Component name, matched against file stems (kebab-case or PascalCase)
    #[serde(default)]
    pub component: Option<String>,
    /// Explicit `/`-separated path relative to the search directories
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Step {
    FindByTag {
        name: String,
    },
    FindByAttribute {
        name: String,
    },
    FindByAttributeValue {
        name: String,
        value: String,
    },
    FindFirst,
    SetAttribute {
        name: String,
        value: String,
    },
    RemoveAttribute {
        name: String,
    },
    ReduceAttribute {
        name: String,
        value: String,
    },
    ExtendAttribute {
        name: String,
        value: String,
        #[serde(default)]
        glue: Option<String>,
    },
    RegexpAttribute {
        name: String,
        pattern: String,
        replacement: String,
    },
    RemoveElement,
    RenameElement {
        name: String,
    },
    InsertBefore {
        html: String,
    },
    InsertAfter {
        html: String,
    },
    InsertInside {
        html: String,
    },
    Unwrap,
}

impl Step {
    /// Kebab-case name as written in recipes.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::FindByTag { .. } => "find-by-tag",
            Step::FindByAttribute { .. } => "find-by-attribute",
            Step::FindByAttributeValue { .. } => "find-by-attribute-value",
            Step::FindFirst => "find-first",
            Step::SetAttribute { .. } => "set-attribute",
            Step::RemoveAttribute { .. } => "remove-attribute",
            Step::ReduceAttribute { .. } => "reduce-attribute",
            Step::ExtendAttribute { .. } => "extend-attribute",
            Step::RegexpAttribute { .. } => "regexp-attribute",
            Step::RemoveElement => "remove-element",
            Step::RenameElement { .. } => "rename-element",
            Step::InsertBefore { .. } => "insert-before",
            Step::InsertAfter { .. } => "insert-after",
            Step::InsertInside { .. } => "insert-inside",
            Step::Unwrap => "unwrap",
        }
    }

    pub fn is_selector(&self) -> bool {
        matches!(
            self,
            Step::FindByTag { .. }
                | Step::FindByAttribute { .. }
                | Step::FindByAttributeValue { .. }
                | Step::FindFirst
        )
    }

    fn validate(&self, entry_id: &Option<String>, issues: &mut Vec<ValidationIssue>) {
        let missing = |value: &str, field: &'static str| {
            value.trim().is_empty().then(|| ValidationIssue::MissingField {
                entry_id: entry_id.clone(),
                field,
            })
        };

        match self {
            Step::FindByTag { name }
            | Step::FindByAttribute { name }
            | Step::RemoveAttribute { name }
            | Step::RenameElement { name } => issues.extend(missing(name, "steps.name")),
            Step::SetAttribute { name, .. } => issues.extend(missing(name, "steps.name")),
            Step::FindByAttributeValue { name, value }
            | Step::ReduceAttribute { name, value }
            | Step::ExtendAttribute { name, value, .. } => {
                issues.extend(missing(name, "steps.name"));
                issues.extend(missing(value, "steps.value"));
            }
            Step::RegexpAttribute { name, pattern, .. } => {
                issues.extend(missing(name, "steps.name"));
                issues.extend(missing(pattern, "steps.pattern"));
                if let Err(error) = Regex::new(pattern) {
                    issues.push(ValidationIssue::InvalidPattern {
                        entry_id: entry_id.clone(),
                        message: error.to_string(),
                    });
                }
            }
            Step::InsertBefore { html } | Step::InsertAfter { html } | Step::InsertInside { html } => {
                issues.extend(missing(html, "steps.html"))
            }
            Step::FindFirst | Step::RemoveElement | Step::Unwrap => {}
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CombineDefinition {
    pub id: String,
    pub source: String,
    #[serde(rename = "override")]
    pub overlay: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRecipe,
    MissingField {
        entry_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        entry_id: Option<String>,
        message: String,
    },
    InvalidPattern {
        entry_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRecipe => write!(f, "recipe contains no mods or combines"),
            ValidationIssue::MissingField { entry_id, field } => match entry_id {
                Some(id) => write!(f, "'{id}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { entry_id, message } => match entry_id {
                Some(id) => write!(f, "'{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid recipe configuration: {message}"),
            },
            ValidationIssue::InvalidPattern { entry_id, message } => match entry_id {
                Some(id) => write!(f, "'{id}' has an invalid regular expression: {message}"),
                None => write!(f, "invalid regular expression: {message}"),
            },
        }
    }
}
