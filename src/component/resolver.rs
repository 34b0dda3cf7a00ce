use crate::component::errors::ComponentError;
use crate::component::file::ComponentFile;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSION: &str = "vue";

/// Minimum normalized similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Finds component files across an ordered list of directories.
///
/// Earlier directories take precedence: a project directory listed before a
/// parent theme directory shadows the parent's copy of the same file.
/// Loaded files are rewritten into the output directory, which defaults to
/// the first search directory.
#[derive(Debug, Clone)]
pub struct ComponentResolver {
    directories: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    extension: String,
}

impl ComponentResolver {
    pub fn new<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            output_dir: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Send output to `dir` instead of the first search directory. `dir` is
    /// not searched.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir
            .as_deref()
            .or_else(|| self.directories.first().map(PathBuf::as_path))
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve a `/`-separated path relative to the search directories.
    pub fn resolve_file(&self, relative: &str) -> Result<(PathBuf, PathBuf), ComponentError> {
        let relative_path: PathBuf = relative.split('/').filter(|p| !p.is_empty()).collect();
        for dir in &self.directories {
            let candidate = dir.join(&relative_path);
            if candidate.is_file() {
                tracing::debug!(file = %candidate.display(), "resolved file");
                return Ok((candidate, relative_path));
            }
        }

        let known: Vec<String> = self
            .component_files()
            .filter_map(|(dir, path)| {
                path.strip_prefix(&dir)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        Err(self.not_found(relative, known))
    }

    pub fn load_file(&self, relative: &str) -> Result<ComponentFile, ComponentError> {
        let (path, relative_path) = self.resolve_file(relative)?;
        self.read(path, relative_path)
    }

    /// Resolve a component by name, accepting kebab-case for PascalCase files
    /// (`title-card` finds `TitleCard.vue`). The first directory holding a
    /// match wins; within a directory, paths are visited in sorted order.
    pub fn resolve_component(&self, name: &str) -> Result<(PathBuf, PathBuf), ComponentError> {
        let pascal = pascal_case(name);
        let mut known = Vec::new();

        for dir in &self.directories {
            for (root, path) in self.files_in(dir) {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if stem == name || stem == pascal {
                    let relative = path.strip_prefix(&root).unwrap_or(&path).to_path_buf();
                    tracing::debug!(component = name, file = %path.display(), "resolved component");
                    return Ok((path, relative));
                }
                known.push(stem.to_string());
            }
        }

        Err(self.not_found(name, known))
    }

    pub fn load_component(&self, name: &str) -> Result<ComponentFile, ComponentError> {
        let (path, relative) = self.resolve_component(name)?;
        self.read(path, relative)
    }

    fn read(&self, path: PathBuf, relative: PathBuf) -> Result<ComponentFile, ComponentError> {
        let content = fs::read_to_string(&path).map_err(|source| ComponentError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(ComponentFile::new(
            path,
            relative,
            self.output_dir().map(Path::to_path_buf),
            content,
        ))
    }

    fn files_in(&self, dir: &Path) -> impl Iterator<Item = (PathBuf, PathBuf)> + '_ {
        let root = dir.to_path_buf();
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == self.extension.as_str())
            })
            .map(move |entry| (root.clone(), entry.into_path()))
    }

    fn component_files(&self) -> impl Iterator<Item = (PathBuf, PathBuf)> + '_ {
        self.directories.iter().flat_map(|dir| self.files_in(dir))
    }

    fn not_found(&self, name: &str, known: Vec<String>) -> ComponentError {
        ComponentError::NotFound {
            name: name.to_string(),
            searched: self.directories.clone(),
            suggestion: closest_match(name, known),
        }
    }
}

/// `title-cased-component` -> `TitleCasedComponent`.
pub fn pascal_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn closest_match(name: &str, candidates: Vec<String>) -> Option<String> {
    let pascal = pascal_case(name);
    candidates
        .into_iter()
        .map(|candidate| {
            let score = strsim::normalized_levenshtein(name, &candidate)
                .max(strsim::normalized_levenshtein(&pascal, &candidate));
            (score, candidate)
        })
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate)
}
